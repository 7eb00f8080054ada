//! Utilities for converting between our matrix format and external libraries

use ndarray::{Array2, ArrayView2};
use sprs::CsMat;

use crate::error::Result;
use crate::matrix::CsrMatrix;

/// Converts our CSR matrix to an sprs `CsMat` in CSR storage
pub fn to_sprs_csr(matrix: &CsrMatrix) -> CsMat<f32> {
    CsMat::new(
        (matrix.n_rows(), matrix.n_cols()),
        matrix.row_ptr().to_vec(),
        matrix.col_idx().to_vec(),
        matrix.values().to_vec(),
    )
}

/// Converts an sprs matrix (CSR or CSC) to our CSR format
pub fn from_sprs_csr(matrix: CsMat<f32>) -> Result<CsrMatrix> {
    // Ensure matrix is in CSR format
    let matrix = if matrix.is_csr() { matrix } else { matrix.to_csr() };

    let (n_rows, n_cols) = matrix.shape();
    let (indptr, indices, data) = matrix.into_raw_storage();

    CsrMatrix::new(n_rows, n_cols, indptr, indices, data)
}

/// Dense `ndarray` copy, zeros filled in
pub fn to_ndarray(matrix: &CsrMatrix) -> Array2<f32> {
    let mut dense = Array2::zeros((matrix.n_rows(), matrix.n_cols()));
    for i in 0..matrix.n_rows() {
        for (j, v) in matrix.row_iter(i) {
            dense[[i, j]] = v;
        }
    }
    dense
}

/// CSR copy of a dense array, dropping zero cells
pub fn from_ndarray(dense: ArrayView2<'_, f32>) -> Result<CsrMatrix> {
    let (n_rows, n_cols) = dense.dim();
    if n_rows == 0 || n_cols == 0 {
        return Ok(CsrMatrix::zeros(n_rows, n_cols));
    }

    // Logical iteration order is row-major whatever the memory layout
    let flat: Vec<f32> = dense.iter().copied().collect();
    CsrMatrix::from_flat_array(&flat, n_cols)
}
