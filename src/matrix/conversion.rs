//! Conversion functions between matrix layouts

use std::collections::BTreeMap;

use crate::error::{Result, SpGemmError};
use crate::matrix::CsrMatrix;
use crate::utils::exclusive_scan;

impl CsrMatrix {
    /// Returns the transpose as a new CSR matrix
    ///
    /// Counting sort over the column indices: histogram, prefix sum into the new
    /// row pointer, then a row-major scatter through a write cursor per column.
    /// Because the source is scanned row by row, each transposed row receives its
    /// column indices in increasing order.
    pub fn transpose(&self) -> CsrMatrix {
        let n_rows = self.n_rows();
        let n_cols = self.n_cols();
        let row_ptr = self.row_ptr();
        let col_idx = self.col_idx();
        let values = self.values();

        // Count non-zeros per column
        let mut col_counts = vec![0usize; n_cols];
        for &col in col_idx {
            col_counts[col] += 1;
        }

        let new_ptr = exclusive_scan(&col_counts);

        let nnz = self.nnz();
        let mut new_col = vec![0usize; nnz];
        let mut new_values = vec![0.0f32; nnz];

        // Write cursors start at each destination row
        let mut cursor = new_ptr[..n_cols].to_vec();

        for i in 0..n_rows {
            for idx in row_ptr[i]..row_ptr[i + 1] {
                let col = col_idx[idx];
                let pos = cursor[col];

                new_col[pos] = i;
                new_values[pos] = values[idx];

                cursor[col] += 1;
            }
        }

        CsrMatrix::from_parts(n_cols, n_rows, new_ptr, new_col, new_values)
    }

    /// Builds a matrix from a dense row-major array with `n_cols` columns
    ///
    /// Zero cells are dropped; every other cell becomes a stored entry.
    /// With `n_cols == 0` the row count cannot be recovered from the array,
    /// so the result is always 0 × 0.
    pub fn from_flat_array(input: &[f32], n_cols: usize) -> Result<CsrMatrix> {
        if n_cols == 0 {
            if !input.is_empty() {
                return Err(SpGemmError::InvalidMatrix(
                    "non-empty dense array with zero columns".to_string(),
                ));
            }
            return Ok(CsrMatrix::zeros(0, 0));
        }
        if input.len() % n_cols != 0 {
            return Err(SpGemmError::InvalidMatrix(format!(
                "dense array of length {} is not a multiple of {} columns",
                input.len(),
                n_cols
            )));
        }

        let n_rows = input.len() / n_cols;
        let mut row_ptr = Vec::with_capacity(n_rows + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();

        row_ptr.push(0);
        for row in input.chunks_exact(n_cols) {
            for (col, &v) in row.iter().enumerate() {
                if v != 0.0 {
                    col_idx.push(col);
                    values.push(v);
                }
            }
            row_ptr.push(col_idx.len());
        }

        Ok(CsrMatrix::from_parts(n_rows, n_cols, row_ptr, col_idx, values))
    }

    /// Dense row-major rendering, `n_rows * n_cols` cells
    pub fn to_dense(&self) -> Vec<f32> {
        let n_cols = self.n_cols();
        let mut dense = vec![0.0f32; self.dense_cells()];

        for i in 0..self.n_rows() {
            for (j, v) in self.row_iter(i) {
                dense[i * n_cols + j] = v;
            }
        }

        dense
    }

    /// Builds a matrix from (row, col, value) triples in any order
    ///
    /// Triples are gathered into one ordered map per row and flattened, so the
    /// result has sorted column indices. Repeated coordinates are summed.
    pub fn from_coo(triples: &[(usize, usize, f32)], n_rows: usize, n_cols: usize) -> Result<CsrMatrix> {
        let mut rows: Vec<BTreeMap<usize, f32>> = vec![BTreeMap::new(); n_rows];

        for &(r, c, v) in triples {
            if r >= n_rows || c >= n_cols {
                return Err(SpGemmError::InvalidMatrix(format!(
                    "COO entry ({}, {}) outside a {} × {} matrix",
                    r, c, n_rows, n_cols
                )));
            }
            *rows[r].entry(c).or_insert(0.0) += v;
        }

        let mut row_ptr = Vec::with_capacity(n_rows + 1);
        let mut col_idx = Vec::with_capacity(triples.len());
        let mut values = Vec::with_capacity(triples.len());

        row_ptr.push(0);
        for row in rows {
            for (c, v) in row {
                col_idx.push(c);
                values.push(v);
            }
            row_ptr.push(col_idx.len());
        }

        Ok(CsrMatrix::from_parts(n_rows, n_cols, row_ptr, col_idx, values))
    }

    /// Stored entries as (row, col, value) triples in row-major order
    pub fn to_coo_triples(&self) -> Vec<(usize, usize, f32)> {
        let mut triples = Vec::with_capacity(self.nnz());
        for i in 0..self.n_rows() {
            triples.extend(self.row_iter(i).map(|(j, v)| (i, j, v)));
        }
        triples
    }
}
