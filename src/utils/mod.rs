//! Utility functions and helpers

pub mod formats;

pub use formats::{from_ndarray, from_sprs_csr, to_ndarray, to_sprs_csr};

/// Computes an exclusive prefix sum (scan) for a vector
///
/// The result has one more element than the input and starts at 0, which is
/// exactly a CSR row pointer built from per-row counts.
pub fn exclusive_scan(input: &[usize]) -> Vec<usize> {
    let mut result = Vec::with_capacity(input.len() + 1);
    let mut sum = 0;

    result.push(0);

    for &val in input {
        sum += val;
        result.push(sum);
    }

    result
}
