//! Error types for hetspgemm

use thiserror::Error;

/// Result type alias using hetspgemm's error
pub type Result<T> = std::result::Result<T, SpGemmError>;

/// The work-group estimator ran out of candidates
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot find a size >= {bound} with two divisors below {max_bound} in {attempts} attempts")]
pub struct NoSuitableSize {
    /// First candidate tried
    pub bound: usize,
    /// Exclusive upper limit for accepted divisors
    pub max_bound: usize,
    /// Number of candidates tried
    pub attempts: usize,
}

/// Errors that can terminate a multiply call
///
/// None of these are retried. Every device-side variant is raised only after
/// the session that produced it has released what it acquired.
#[derive(Error, Debug)]
pub enum SpGemmError {
    /// Operand shapes are incompatible for multiplication
    #[error("dimension mismatch: left operand has {left_cols} columns, right operand has {right_rows} rows")]
    DimensionMismatch {
        /// Column count of the left operand
        left_cols: usize,
        /// Row count of the right operand
        right_rows: usize,
    },

    /// Input arrays violate the CSR invariants
    #[error("invalid CSR matrix: {0}")]
    InvalidMatrix(String),

    /// No usable compute context
    #[error("compute device unavailable: {0}")]
    DeviceUnavailable(String),

    /// A device buffer could not be created
    #[error("allocation of buffer '{name}' failed: {reason}")]
    AllocationFailure {
        /// Symbolic buffer name
        name: String,
        /// Driver message
        reason: String,
    },

    /// No legal 2-D launch shape was found
    #[error("launch sizing failed: {0}")]
    LaunchSizingFailure(#[from] NoSuitableSize),

    /// Kernel template validation or device compilation failed
    #[error("kernel build failed: {0}")]
    KernelBuild(String),

    /// Kernel enqueue, wait or read-back failed
    #[error("kernel dispatch failed: {0}")]
    Dispatch(String),

    /// An index or count does not fit the device's 32-bit integers
    #[error("value {value} does not fit a 32-bit device integer")]
    IndexOverflow {
        /// The offending value
        value: usize,
    },

    /// The session has no buffer registered under this name
    #[error("no buffer named '{0}' in the session")]
    UnknownBuffer(String),

    /// Engine configuration rejected
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SpGemmError {
    /// Whether this error came from the compute device rather than the caller's input
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            SpGemmError::DeviceUnavailable(_)
                | SpGemmError::AllocationFailure { .. }
                | SpGemmError::LaunchSizingFailure(_)
                | SpGemmError::KernelBuild(_)
                | SpGemmError::Dispatch(_)
        )
    }
}
