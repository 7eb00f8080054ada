//! Kernel contracts shared by every compute backend
//!
//! Each kernel is described by a [`KernelSpec`]: which computation, whether
//! the operands are binary, the entry point to launch and the ordered list of
//! session buffers bound as its arguments. The OpenCL C sources are embedded
//! and specialised at build time through [`KernelParams`].

use std::fmt;

use crate::constants::*;
use crate::error::{Result, SpGemmError};

const NNZ_COUNT_SOURCE: &str = include_str!("kernels/nnz_count.cl");
const DENSE_MULTIPLY_SOURCE: &str = include_str!("kernels/dense_multiply.cl");
const COO_MULTIPLY_SOURCE: &str = include_str!("kernels/coo_multiply.cl");

/// The three device computations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelKind {
    /// Structural non-zero count into a single counter
    NnzCount,
    /// Row-major dense output
    DenseMultiply,
    /// Counter-indexed COO triples
    CooMultiply,
}

/// A kernel variant together with its argument layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelSpec {
    pub kind: KernelKind,
    /// Binary variants take no value buffers and treat every stored entry as 1
    pub binary: bool,
}

impl KernelSpec {
    pub fn nnz_count() -> Self {
        Self {
            kind: KernelKind::NnzCount,
            binary: true,
        }
    }

    pub fn dense(binary: bool) -> Self {
        Self {
            kind: KernelKind::DenseMultiply,
            binary,
        }
    }

    pub fn coo(binary: bool) -> Self {
        Self {
            kind: KernelKind::CooMultiply,
            binary,
        }
    }

    /// Function name inside the program source
    pub fn entry_point(&self) -> &'static str {
        match (self.kind, self.binary) {
            (KernelKind::NnzCount, _) => KERNEL_NNZ_FUN,
            (KernelKind::DenseMultiply, false) => KERNEL_DENSE_FUN_FULL,
            (KernelKind::DenseMultiply, true) => KERNEL_DENSE_FUN_SHORT,
            (KernelKind::CooMultiply, false) => KERNEL_COO_FUN_FULL,
            (KernelKind::CooMultiply, true) => KERNEL_COO_FUN_SHORT,
        }
    }

    /// OpenCL C program containing the entry point
    pub fn source(&self) -> &'static str {
        match self.kind {
            KernelKind::NnzCount => NNZ_COUNT_SOURCE,
            KernelKind::DenseMultiply => DENSE_MULTIPLY_SOURCE,
            KernelKind::CooMultiply => COO_MULTIPLY_SOURCE,
        }
    }

    /// Session buffer names in kernel argument order
    pub fn arg_names(&self) -> Vec<&'static str> {
        let mut args = vec![BUF_A_ROWPTR, BUF_A_COLIDX];
        if self.has_values() {
            args.push(BUF_A_DATA);
        }
        args.extend([BUF_B_ROWPTR, BUF_B_COLIDX]);
        if self.has_values() {
            args.push(BUF_B_DATA);
        }

        match self.kind {
            KernelKind::NnzCount => args.push(BUF_COUNTER),
            KernelKind::DenseMultiply => args.push(BUF_OUT_DENSE),
            KernelKind::CooMultiply => {
                args.extend([BUF_COUNTER, BUF_OUT_ROW, BUF_OUT_COL, BUF_OUT_VALUE])
            }
        }
        args
    }

    /// Whether the operand value buffers are bound
    pub fn has_values(&self) -> bool {
        self.kind != KernelKind::NnzCount && !self.binary
    }
}

impl fmt::Display for KernelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entry_point())
    }
}

/// Compile-time constants substituted into the kernel sources
///
/// `a_rows` and `b_rows` bound the real output grid; work items past them
/// are launch padding and exit without touching memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelParams {
    a_rows: usize,
    b_rows: usize,
}

impl KernelParams {
    /// Validates both extents against the device's `int`
    pub fn new(a_rows: usize, b_rows: usize) -> Result<Self> {
        for (name, value) in [("A_ROWS", a_rows), ("B_ROWS", b_rows)] {
            if value == 0 {
                return Err(SpGemmError::KernelBuild(format!("{} must be positive", name)));
            }
            if i32::try_from(value).is_err() {
                return Err(SpGemmError::IndexOverflow { value });
            }
        }
        Ok(Self { a_rows, b_rows })
    }

    pub fn a_rows(&self) -> usize {
        self.a_rows
    }

    pub fn b_rows(&self) -> usize {
        self.b_rows
    }

    /// Preprocessor definitions passed to the program build
    pub fn build_options(&self) -> String {
        format!("-D A_ROWS={} -D B_ROWS={}", self.a_rows, self.b_rows)
    }
}
