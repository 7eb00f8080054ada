// Matrix data structures and operations

pub mod config;
pub mod conversion;
pub mod csr;
pub mod multiply;
pub mod reference;
pub mod symbolic;

pub use config::{EngineConfig, SystemParameters};
pub use csr::CsrMatrix;
pub use multiply::{dense_multiply, merge_multiply, multiply_cpu, CpuStrategy};
pub use reference::reference_multiply;
pub use symbolic::{symbolic_count, symbolic_row_counts};
