//! Symbolic phase: output sparsity without computing values
//!
//! Each output row i is the union of the rows of B selected by the column
//! indices of row i of A. A marker array stamped with the current row number
//! counts every output column exactly once, no matter how many paths reach it.

use rayon::prelude::*;

use crate::error::{Result, SpGemmError};
use crate::matrix::CsrMatrix;

/// Checks that `a * b` is defined
pub fn check_dimensions(a: &CsrMatrix, b: &CsrMatrix) -> Result<()> {
    if a.n_cols() != b.n_rows() {
        return Err(SpGemmError::DimensionMismatch {
            left_cols: a.n_cols(),
            right_rows: b.n_rows(),
        });
    }
    Ok(())
}

/// Exact number of structural non-zeros in `a * b`
///
/// Numerical cancellation is not considered: a cell reached by at least one
/// product counts even if the products sum to zero.
pub fn symbolic_count(a: &CsrMatrix, b: &CsrMatrix) -> Result<usize> {
    Ok(symbolic_row_counts(a, b)?.into_iter().sum())
}

/// Structural non-zeros of every row of `a * b`
pub fn symbolic_row_counts(a: &CsrMatrix, b: &CsrMatrix) -> Result<Vec<usize>> {
    check_dimensions(a, b)?;

    let n_out_cols = b.n_cols();
    let counts = (0..a.n_rows())
        .into_par_iter()
        .map_init(
            || vec![usize::MAX; n_out_cols],
            |marker, i| count_row(a, b, i, marker),
        )
        .collect();

    Ok(counts)
}

fn count_row(a: &CsrMatrix, b: &CsrMatrix, i: usize, marker: &mut [usize]) -> usize {
    let b_row_ptr = b.row_ptr();
    let b_col_idx = b.col_idx();
    let mut count = 0;

    for &k in a.row(i).0 {
        for &j in &b_col_idx[b_row_ptr[k]..b_row_ptr[k + 1]] {
            if marker[j] != i {
                marker[j] = i;
                count += 1;
            }
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlapping_rows_counted_once() {
        // Row 0 of A reaches B rows 0 and 1, which share column 1
        let a = CsrMatrix::new_binary(1, 2, vec![0, 2], vec![0, 1]).unwrap();
        let b = CsrMatrix::new_binary(2, 3, vec![0, 2, 4], vec![0, 1, 1, 2]).unwrap();

        assert_eq!(symbolic_row_counts(&a, &b).unwrap(), vec![3]);
        assert_eq!(symbolic_count(&a, &b).unwrap(), 3);
    }

    #[test]
    fn test_marker_reset_between_rows() {
        // Both rows reach the same column; each must count it
        let a = CsrMatrix::new_binary(2, 1, vec![0, 1, 2], vec![0, 0]).unwrap();
        let b = CsrMatrix::new_binary(1, 1, vec![0, 1], vec![0]).unwrap();

        assert_eq!(symbolic_row_counts(&a, &b).unwrap(), vec![1, 1]);
    }

    #[test]
    fn test_zero_matrix() {
        let a = CsrMatrix::zeros(3, 3);
        let b = CsrMatrix::identity(3);
        assert_eq!(symbolic_count(&a, &b).unwrap(), 0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = CsrMatrix::zeros(2, 4);
        let b = CsrMatrix::zeros(5, 2);
        assert!(matches!(
            symbolic_count(&a, &b),
            Err(SpGemmError::DimensionMismatch { left_cols: 4, right_rows: 5 })
        ));
    }
}
