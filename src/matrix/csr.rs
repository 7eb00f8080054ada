//! Compressed Sparse Row (CSR) matrix format implementation

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SpGemmError};

/// A sparse matrix in Compressed Sparse Row (CSR) format
///
/// The CSR format stores a sparse matrix using three arrays:
/// - row_ptr: Array of size n_rows + 1 containing indices into col_idx and values arrays
/// - col_idx: Array of size nnz containing column indices of non-zero elements
/// - values: Array of size nnz containing the non-zero values
///
/// Within each row the column indices are strictly increasing. Every merge-based
/// routine in this crate relies on that, so it is checked at construction and the
/// matrix is immutable afterwards. Derived matrices (transpose, products) are new
/// instances.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CsrWire", into = "CsrWire")]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f32>,
}

impl CsrMatrix {
    /// Creates a new CSR matrix with the given dimensions and data
    ///
    /// # Arguments
    ///
    /// * `n_rows` - Number of rows
    /// * `n_cols` - Number of columns
    /// * `row_ptr` - Row pointers
    /// * `col_idx` - Column indices
    /// * `values` - Non-zero values
    ///
    /// # Errors
    ///
    /// Returns [`SpGemmError::InvalidMatrix`] if the input arrays are inconsistent:
    /// - row_ptr.len() must be n_rows + 1, start at 0 and never decrease
    /// - row_ptr[n_rows] must equal col_idx.len() and values.len()
    /// - column indices must lie in [0, n_cols) and increase strictly within a row
    pub fn new(
        n_rows: usize,
        n_cols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<f32>,
    ) -> Result<Self> {
        validate(n_rows, n_cols, &row_ptr, &col_idx, &values)?;
        Ok(Self {
            n_rows,
            n_cols,
            row_ptr,
            col_idx,
            values,
        })
    }

    /// Creates a binary matrix: every stored entry is 1
    pub fn new_binary(
        n_rows: usize,
        n_cols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
    ) -> Result<Self> {
        let values = vec![1.0; col_idx.len()];
        Self::new(n_rows, n_cols, row_ptr, col_idx, values)
    }

    /// Builds a matrix from arrays the caller already produced in canonical order
    pub(crate) fn from_parts(
        n_rows: usize,
        n_cols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<f32>,
    ) -> Self {
        debug_assert!(validate(n_rows, n_cols, &row_ptr, &col_idx, &values).is_ok());
        Self {
            n_rows,
            n_cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Creates an empty matrix with the given dimensions
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            row_ptr: vec![0; n_rows + 1],
            col_idx: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Creates an identity matrix of the given size
    pub fn identity(n: usize) -> Self {
        Self {
            n_rows: n,
            n_cols: n,
            row_ptr: (0..=n).collect(),
            col_idx: (0..n).collect(),
            values: vec![1.0; n],
        }
    }

    /// Number of rows
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Row pointers (size: n_rows + 1)
    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    /// Column indices (size: nnz)
    pub fn col_idx(&self) -> &[usize] {
        &self.col_idx
    }

    /// Stored values (size: nnz)
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Returns the number of stored elements in the matrix
    pub fn nnz(&self) -> usize {
        self.col_idx.len()
    }

    /// Number of cells a dense rendering of this matrix would hold
    pub fn dense_cells(&self) -> usize {
        self.n_rows * self.n_cols
    }

    /// Column indices and values of row i
    pub fn row(&self, i: usize) -> (&[usize], &[f32]) {
        let range = self.row_ptr[i]..self.row_ptr[i + 1];
        (&self.col_idx[range.clone()], &self.values[range])
    }

    /// Returns an iterator over the non-zero elements in row i
    ///
    /// Each item is a tuple (col_idx, value) representing a non-zero element
    pub fn row_iter(&self, i: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        assert!(i < self.n_rows, "Row index out of bounds");
        let (cols, vals) = self.row(i);
        cols.iter().copied().zip(vals.iter().copied())
    }

    /// True iff every stored value is exactly 1
    ///
    /// Binary operands let the device kernels skip the value buffers entirely.
    /// An explicitly stored zero makes the matrix non-binary.
    pub fn is_binary(&self) -> bool {
        self.values.iter().all(|&v| v == 1.0)
    }
}

fn validate(
    n_rows: usize,
    n_cols: usize,
    row_ptr: &[usize],
    col_idx: &[usize],
    values: &[f32],
) -> Result<()> {
    let invalid = |msg: String| Err(SpGemmError::InvalidMatrix(msg));

    // Checked so a huge n_rows from external input cannot wrap
    if row_ptr.len().checked_sub(1) != Some(n_rows) {
        return invalid(format!(
            "row_ptr.len() must be n_rows + 1 (got {}, n_rows = {})",
            row_ptr.len(),
            n_rows
        ));
    }
    if row_ptr[0] != 0 {
        return invalid(format!("row_ptr[0] must be 0 (got {})", row_ptr[0]));
    }
    if col_idx.len() != values.len() {
        return invalid(format!(
            "col_idx.len() must equal values.len() ({} != {})",
            col_idx.len(),
            values.len()
        ));
    }
    if row_ptr[n_rows] != col_idx.len() {
        return invalid(format!(
            "row_ptr[n_rows] must equal col_idx.len() ({} != {})",
            row_ptr[n_rows],
            col_idx.len()
        ));
    }

    for i in 0..n_rows {
        let (start, end) = (row_ptr[i], row_ptr[i + 1]);
        if start > end || end > col_idx.len() {
            return invalid(format!("row_ptr decreases at row {}", i));
        }
        let cols = &col_idx[start..end];
        if let Some(&last) = cols.last() {
            if last >= n_cols {
                return invalid(format!(
                    "column index {} out of bounds in row {} (n_cols = {})",
                    last, i, n_cols
                ));
            }
        }
        if cols.windows(2).any(|w| w[0] >= w[1]) {
            return invalid(format!("column indices of row {} are not strictly increasing", i));
        }
    }

    Ok(())
}

/// Wire schema of the multiply service
#[derive(Serialize, Deserialize)]
struct CsrWire {
    #[serde(rename = "ROW")]
    row: Vec<usize>,
    #[serde(rename = "COL")]
    col: Vec<usize>,
    #[serde(rename = "DATA", default, skip_serializing_if = "Option::is_none")]
    data: Option<Vec<f32>>,
    #[serde(rename = "ROWCOUNT")]
    row_count: usize,
    #[serde(rename = "COLCOUNT")]
    col_count: usize,
}

impl TryFrom<CsrWire> for CsrMatrix {
    type Error = SpGemmError;

    fn try_from(wire: CsrWire) -> Result<Self> {
        match wire.data {
            Some(data) => CsrMatrix::new(wire.row_count, wire.col_count, wire.row, wire.col, data),
            None => CsrMatrix::new_binary(wire.row_count, wire.col_count, wire.row, wire.col),
        }
    }
}

impl From<CsrMatrix> for CsrWire {
    fn from(m: CsrMatrix) -> Self {
        CsrWire {
            row: m.row_ptr,
            col: m.col_idx,
            data: Some(m.values),
            row_count: m.n_rows,
            col_count: m.n_cols,
        }
    }
}

impl fmt::Debug for CsrMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CsrMatrix {{")?;
        writeln!(f, "  dimensions: {} × {}", self.n_rows, self.n_cols)?;
        writeln!(f, "  nnz: {}", self.nnz())?;

        let max_rows_to_print = 5.min(self.n_rows);

        if max_rows_to_print > 0 {
            writeln!(f, "  content sample:")?;

            for i in 0..max_rows_to_print {
                write!(f, "    row {}: ", i)?;
                let start = self.row_ptr[i];
                let end = self.row_ptr[i + 1];

                if start == end {
                    writeln!(f, "(empty)")?;
                } else {
                    let max_elements = 5.min(end - start);

                    for j in start..(start + max_elements) {
                        write!(f, "({}, {:?}) ", self.col_idx[j], self.values[j])?;
                    }

                    if end - start > max_elements {
                        write!(f, "... ({} more)", end - start - max_elements)?;
                    }

                    writeln!(f)?;
                }
            }

            if self.n_rows > max_rows_to_print {
                writeln!(f, "    ... ({} more rows)", self.n_rows - max_rows_to_print)?;
            }
        }

        write!(f, "}}")
    }
}
