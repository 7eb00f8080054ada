//! Centralized constants for the hetspgemm library
//!
//! Tuning knobs, kernel entry points and the symbolic buffer names shared by
//! the session, the kernel argument layouts and the engine live here.

// ============================================================================
// STRATEGY SELECTION
// ============================================================================

/// Default weight applied to the NNZ estimate when comparing against the dense cell count
pub const DEFAULT_NNZ_WEIGHT: usize = 3;

// ============================================================================
// WORK-GROUP SIZING
// ============================================================================

/// Candidates tried by the single-dimension size search before giving up
pub const MAX_SIZE_ATTEMPTS: usize = 20;

/// Divisors (strictly between 1 and the local bound) a candidate needs to be accepted
pub const MIN_DIVISORS: usize = 2;

/// Work-group bound assumed by the host device when none is configured
pub const HOST_MAX_WORK_GROUP_SIZE: usize = 256;

// ============================================================================
// HOST STAGING
// ============================================================================

/// Alignment of host staging blocks, in bytes
pub const STAGING_ALIGNMENT: usize = 64;

// ============================================================================
// KERNEL ENTRY POINTS
// ============================================================================

/// Symbolic NNZ count
pub const KERNEL_NNZ_FUN: &str = "nnz_calc_kernel";

/// Dense output, valued operands
pub const KERNEL_DENSE_FUN_FULL: &str = "spmm_kernel_naive";

/// Dense output, binary operands
pub const KERNEL_DENSE_FUN_SHORT: &str = "spmm_binary_kernel_naive";

/// COO output, valued operands
pub const KERNEL_COO_FUN_FULL: &str = "spmm_coo_kernel_naive";

/// COO output, binary operands
pub const KERNEL_COO_FUN_SHORT: &str = "spmm_coo_binary_kernel_naive";

// ============================================================================
// SESSION BUFFER NAMES
// ============================================================================

pub const BUF_COUNTER: &str = "counter";
pub const BUF_A_ROWPTR: &str = "matA_rowptr";
pub const BUF_A_COLIDX: &str = "matA_colindices";
pub const BUF_A_DATA: &str = "matA_data";
pub const BUF_B_ROWPTR: &str = "matB_rowptr";
pub const BUF_B_COLIDX: &str = "matB_colindices";
pub const BUF_B_DATA: &str = "matB_data";
pub const BUF_OUT_DENSE: &str = "output_data";
pub const BUF_OUT_ROW: &str = "output_row";
pub const BUF_OUT_COL: &str = "output_col";
pub const BUF_OUT_VALUE: &str = "output_value";
