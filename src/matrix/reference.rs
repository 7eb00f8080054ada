//! Row-at-a-time (Gustavson) multiply
//!
//! Scatters the scaled rows of B selected by each row of A into a dense
//! accumulator, then gathers the touched columns in order. It does not share
//! code with the merge-join path, which makes it a useful independent oracle.

use rayon::prelude::*;

use crate::error::Result;
use crate::matrix::multiply::assemble_rows;
use crate::matrix::symbolic::check_dimensions;
use crate::matrix::CsrMatrix;

/// Dense accumulator for a single output row
struct RowAccumulator {
    values: Vec<f32>,
    occupied: Vec<bool>,
    touched: Vec<usize>,
}

impl RowAccumulator {
    fn new(n_cols: usize) -> Self {
        Self {
            values: vec![0.0; n_cols],
            occupied: vec![false; n_cols],
            touched: Vec::new(),
        }
    }

    fn accumulate(&mut self, col: usize, val: f32) {
        if !self.occupied[col] {
            self.occupied[col] = true;
            self.touched.push(col);
            self.values[col] = val;
        } else {
            self.values[col] += val;
        }
    }

    /// Sorted non-zero entries; leaves the accumulator empty for the next row
    fn drain(&mut self) -> (Vec<usize>, Vec<f32>) {
        self.touched.sort_unstable();

        let mut cols = Vec::with_capacity(self.touched.len());
        let mut vals = Vec::with_capacity(self.touched.len());
        for &col in &self.touched {
            self.occupied[col] = false;
            let v = self.values[col];
            if v != 0.0 {
                cols.push(col);
                vals.push(v);
            }
        }
        self.touched.clear();

        (cols, vals)
    }
}

/// Performs sparse matrix multiplication with a per-row dense accumulator
pub fn reference_multiply(a: &CsrMatrix, b: &CsrMatrix) -> Result<CsrMatrix> {
    check_dimensions(a, b)?;

    let n_rows = a.n_rows();
    let n_cols = b.n_cols();

    let row_results: Vec<(Vec<usize>, Vec<f32>)> = (0..n_rows)
        .into_par_iter()
        .map_init(
            || RowAccumulator::new(n_cols),
            |acc, i| {
                for (k, a_val) in a.row_iter(i) {
                    for (j, b_val) in b.row_iter(k) {
                        acc.accumulate(j, a_val * b_val);
                    }
                }
                acc.drain()
            },
        )
        .collect();

    Ok(assemble_rows(n_rows, n_cols, row_results))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_multiplication() {
        // A = [1 2; 0 3], B = [4 5; 6 7]
        let a = CsrMatrix::new(2, 2, vec![0, 2, 3], vec![0, 1, 1], vec![1.0, 2.0, 3.0]).unwrap();
        let b = CsrMatrix::new(2, 2, vec![0, 2, 4], vec![0, 1, 0, 1], vec![4.0, 5.0, 6.0, 7.0])
            .unwrap();

        let result = reference_multiply(&a, &b).unwrap();

        assert_eq!(result.nnz(), 4);
        assert_eq!(result.to_dense(), vec![16.0, 19.0, 18.0, 21.0]);
    }

    #[test]
    fn test_identity_multiplication() {
        let identity = CsrMatrix::identity(3);
        let diagonal =
            CsrMatrix::new(3, 3, vec![0, 1, 2, 3], vec![0, 1, 2], vec![5.0, 6.0, 7.0]).unwrap();

        let result = reference_multiply(&identity, &diagonal).unwrap();
        assert_eq!(result, diagonal);
    }

    #[test]
    fn test_accumulator_reuse_across_rows() {
        let mut acc = RowAccumulator::new(4);
        acc.accumulate(3, 1.0);
        acc.accumulate(1, 2.0);
        acc.accumulate(3, 1.0);
        assert_eq!(acc.drain(), (vec![1, 3], vec![2.0, 2.0]));

        acc.accumulate(0, 5.0);
        assert_eq!(acc.drain(), (vec![0], vec![5.0]));
    }
}
