//! Compute device layer
//!
//! Backends implement [`ComputeDevice`]/[`ComputeContext`]. The host
//! emulation is always built; the OpenCL backend needs the `opencl` feature.

pub mod backend;
pub mod factor;
pub mod host;
pub mod kernel;
#[cfg(feature = "opencl")]
pub mod opencl;
pub mod session;
pub mod work_size;

pub use backend::{BufferUsage, ComputeContext, ComputeDevice, ElementKind, HostData};
pub use host::{HostDevice, HostDeviceBuilder, LedgerEvent, ResourceLedger};
pub use kernel::{KernelKind, KernelParams, KernelSpec};
#[cfg(feature = "opencl")]
pub use opencl::OpenClDevice;
pub use session::{DeviceSession, ReleaseSummary};
pub use work_size::{good_single_size, good_sizes, launch_shape, LaunchShape};
