//! Numeric CPU multiply
//!
//! Both strategies transpose B once and then evaluate every output cell (i, j)
//! as a merge-join of row i of A with row j of Bᵗ: two cursors walk the sorted
//! column runs, equal indices multiply-accumulate and advance both, otherwise
//! the smaller side advances.

use rayon::prelude::*;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SpGemmError};
use crate::matrix::reference::reference_multiply;
use crate::matrix::symbolic::check_dimensions;
use crate::matrix::CsrMatrix;

/// Host algorithm used when the compute device is bypassed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CpuStrategy {
    /// Merge-join per cell, sparse output
    #[default]
    Merge,
    /// Merge-join per cell into a full dense buffer
    Dense,
    /// Row-at-a-time accumulation (Gustavson)
    RowAccumulate,
}

impl fmt::Display for CpuStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CpuStrategy::Merge => "merge",
            CpuStrategy::Dense => "dense",
            CpuStrategy::RowAccumulate => "row-accumulate",
        };
        f.write_str(name)
    }
}

impl FromStr for CpuStrategy {
    type Err = SpGemmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(CpuStrategy::Merge),
            "dense" => Ok(CpuStrategy::Dense),
            "row-accumulate" | "gustavson" => Ok(CpuStrategy::RowAccumulate),
            other => Err(SpGemmError::InvalidConfig(format!("unknown CPU strategy '{}'", other))),
        }
    }
}

/// Multiplies on the host with the given strategy
pub fn multiply_cpu(a: &CsrMatrix, b: &CsrMatrix, strategy: CpuStrategy) -> Result<CsrMatrix> {
    match strategy {
        CpuStrategy::Merge => merge_multiply(a, b),
        CpuStrategy::Dense => {
            let dense = dense_multiply(a, b)?;
            csr_from_dense_output(&dense, a.n_rows(), b.n_cols())
        }
        CpuStrategy::RowAccumulate => reference_multiply(a, b),
    }
}

/// Sparse dot product of two sorted runs
#[inline]
pub(crate) fn merge_dot(a_cols: &[usize], a_vals: &[f32], b_cols: &[usize], b_vals: &[f32]) -> f32 {
    let (mut pa, mut pb) = (0, 0);
    let mut sum = 0.0f32;

    while pa < a_cols.len() && pb < b_cols.len() {
        let (ca, cb) = (a_cols[pa], b_cols[pb]);
        if ca == cb {
            sum += a_vals[pa] * b_vals[pb];
            pa += 1;
            pb += 1;
        } else if ca < cb {
            pa += 1;
        } else {
            pb += 1;
        }
    }

    sum
}

/// `a * b` with sparse output; cells whose sum is zero are not stored
///
/// Cost is O(rows(A) · cols(B) · average row length), which suits the moderate
/// sizes this engine targets.
pub fn merge_multiply(a: &CsrMatrix, b: &CsrMatrix) -> Result<CsrMatrix> {
    check_dimensions(a, b)?;

    let bt = b.transpose();
    let n_rows = a.n_rows();
    let n_cols = b.n_cols();

    let row_results: Vec<(Vec<usize>, Vec<f32>)> = (0..n_rows)
        .into_par_iter()
        .map(|i| {
            let (a_cols, a_vals) = a.row(i);
            let mut cols = Vec::new();
            let mut vals = Vec::new();

            if a_cols.is_empty() {
                return (cols, vals);
            }

            for j in 0..bt.n_rows() {
                let (b_cols, b_vals) = bt.row(j);
                let sum = merge_dot(a_cols, a_vals, b_cols, b_vals);
                if sum != 0.0 {
                    cols.push(j);
                    vals.push(sum);
                }
            }

            (cols, vals)
        })
        .collect();

    Ok(assemble_rows(n_rows, n_cols, row_results))
}

/// `a * b` into a dense row-major buffer of `rows(A) * cols(B)` cells
///
/// The buffer is always allocated at full size regardless of sparsity and
/// holds explicit zeros.
pub fn dense_multiply(a: &CsrMatrix, b: &CsrMatrix) -> Result<Vec<f32>> {
    check_dimensions(a, b)?;

    let bt = b.transpose();
    let n_cols = b.n_cols();
    let mut dense = vec![0.0f32; a.n_rows() * n_cols];

    if n_cols == 0 {
        return Ok(dense);
    }

    dense
        .par_chunks_mut(n_cols)
        .enumerate()
        .for_each(|(i, out_row)| {
            let (a_cols, a_vals) = a.row(i);
            if a_cols.is_empty() {
                return;
            }
            for (j, cell) in out_row.iter_mut().enumerate() {
                let (b_cols, b_vals) = bt.row(j);
                *cell = merge_dot(a_cols, a_vals, b_cols, b_vals);
            }
        });

    Ok(dense)
}

/// CSR view of a dense product buffer, keeping the row count when there are no columns
pub fn csr_from_dense_output(dense: &[f32], n_rows: usize, n_cols: usize) -> Result<CsrMatrix> {
    if n_cols == 0 || n_rows == 0 {
        return Ok(CsrMatrix::zeros(n_rows, n_cols));
    }
    if dense.len() != n_rows * n_cols {
        return Err(SpGemmError::InvalidMatrix(format!(
            "dense output has {} cells, expected {} × {}",
            dense.len(),
            n_rows,
            n_cols
        )));
    }
    CsrMatrix::from_flat_array(dense, n_cols)
}

/// Concatenates per-row results into a CSR matrix
pub(crate) fn assemble_rows(
    n_rows: usize,
    n_cols: usize,
    row_results: Vec<(Vec<usize>, Vec<f32>)>,
) -> CsrMatrix {
    let mut row_ptr = Vec::with_capacity(n_rows + 1);
    row_ptr.push(0);

    let mut running_nnz = 0;
    for (cols, _) in &row_results {
        running_nnz += cols.len();
        row_ptr.push(running_nnz);
    }

    let mut col_idx = Vec::with_capacity(running_nnz);
    let mut values = Vec::with_capacity(running_nnz);

    for (cols, vals) in row_results {
        col_idx.extend(cols);
        values.extend(vals);
    }

    CsrMatrix::from_parts(n_rows, n_cols, row_ptr, col_idx, values)
}
