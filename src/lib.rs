//! # hetspgemm: heterogeneous sparse matrix multiplication
//!
//! Multiplies two CSR matrices either on the host or on a compute device,
//! choosing per call between three strategies.
//!
//! ## Overview
//!
//! - **CPU**: merge-join of each row of A with each row of Bᵗ, parallel over
//!   rows with rayon. Used when the device is disabled.
//! - **Device, dense output**: one work item per output cell writing into a
//!   full `rows × cols` buffer.
//! - **Device, COO output**: non-zero cells append `(row, col, value)`
//!   triples through an atomic counter.
//!
//! A symbolic NNZ pass (on the device or on the host) feeds a simple cost
//! model: COO is chosen when the dense buffer would have more than
//! `nnz_weight` cells per output non-zero. Binary operands (all stored values
//! equal to 1) use kernel variants that skip the value buffers.
//!
//! Device resources live in a [`DeviceSession`] that releases them in a fixed
//! order on every exit path.
//!
//! ## Usage
//!
//! ```
//! use hetspgemm::{CsrMatrix, EngineConfig, HostDevice, SpGemmEngine};
//!
//! let a = CsrMatrix::from_flat_array(&[1.0, 0.0, 0.0, 2.0], 2).unwrap();
//! let b = CsrMatrix::identity(2);
//!
//! let engine = SpGemmEngine::new(HostDevice::new(), EngineConfig::default()).unwrap();
//! let c = engine.multiply(&a, &b).unwrap();
//! assert_eq!(c.to_dense(), vec![1.0, 0.0, 0.0, 2.0]);
//! ```
//!
//! Host-only multiplication needs no engine:
//!
//! ```
//! use hetspgemm::{multiply, CsrMatrix};
//!
//! let a = CsrMatrix::identity(3);
//! let c = multiply(&a, &a).unwrap();
//! assert_eq!(c, a);
//! ```

pub mod constants;
pub mod device;
pub mod engine;
pub mod error;
pub mod matrix;
pub mod utils;

// Re-export primary components
pub use device::{
    good_single_size, good_sizes, ComputeContext, ComputeDevice, DeviceSession, HostDevice, LaunchShape,
};
#[cfg(feature = "opencl")]
pub use device::OpenClDevice;
pub use engine::{choose_strategy, SpGemmEngine, Strategy};
pub use error::{NoSuitableSize, Result, SpGemmError};
pub use matrix::config::{EngineConfig, SystemParameters};
pub use matrix::{
    dense_multiply, merge_multiply, multiply_cpu, reference_multiply, symbolic_count, CpuStrategy, CsrMatrix,
};
pub use utils::{from_ndarray, from_sprs_csr, to_ndarray, to_sprs_csr};

/// Multiplies `a × b` on the host with the default merge-join strategy
///
/// # Errors
///
/// `DimensionMismatch` when `a.n_cols() != b.n_rows()`.
pub fn multiply(a: &CsrMatrix, b: &CsrMatrix) -> Result<CsrMatrix> {
    multiply_cpu(a, b, CpuStrategy::default())
}

/// Version information for the hetspgemm library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
