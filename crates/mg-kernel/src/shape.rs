use crate::error::{KernelError, Result};
use std::fmt;

/// Size in bytes of one stored element.
pub const ELEMENT_BYTES: usize = std::mem::size_of::<f32>();

/// Extent of a single row-major matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatrixDims {
    pub rows: usize,
    pub cols: usize,
}

impl MatrixDims {
    pub fn new(rows: usize, cols: usize) -> Self {
        MatrixDims { rows, cols }
    }

    /// Total number of elements (`rows * cols`).
    ///
    /// # Errors
    /// Returns `SizeOverflow` if the product does not fit in `usize`.
    pub fn numel(&self) -> Result<usize> {
        self.rows
            .checked_mul(self.cols)
            .ok_or(KernelError::SizeOverflow {
                rows: self.rows,
                cols: self.cols,
            })
    }

    /// Exact byte length of the backing file for this matrix.
    pub fn byte_len(&self) -> Result<usize> {
        self.numel()?
            .checked_mul(ELEMENT_BYTES)
            .ok_or(KernelError::SizeOverflow {
                rows: self.rows,
                cols: self.cols,
            })
    }
}

impl fmt::Display for MatrixDims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

impl From<(usize, usize)> for MatrixDims {
    fn from((rows, cols): (usize, usize)) -> Self {
        MatrixDims::new(rows, cols)
    }
}

/// Shape descriptor for `C[n, m] = A[n, k] @ B[k, m]`.
///
/// A `MatmulShape` can only be built through [`MatmulShape::new`] or
/// [`MatmulShape::from_operands`], both of which reject zero dimensions and
/// sizes whose byte length would overflow. The element-count accessors are
/// therefore infallible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatmulShape {
    n: usize,
    k: usize,
    m: usize,
}

impl MatmulShape {
    /// Create a shape from the three product dimensions.
    pub fn new(n: usize, k: usize, m: usize) -> Result<Self> {
        if n == 0 || k == 0 || m == 0 {
            return Err(KernelError::EmptyDimension { n, k, m });
        }
        MatrixDims::new(n, k).byte_len()?;
        MatrixDims::new(k, m).byte_len()?;
        MatrixDims::new(n, m).byte_len()?;
        Ok(MatmulShape { n, k, m })
    }

    /// Build the product shape from the declared operand extents.
    ///
    /// The inner dimensions are compared before anything else so a mismatch
    /// is always reported as `ShapeMismatch`, even for degenerate sizes.
    pub fn from_operands(a: MatrixDims, b: MatrixDims) -> Result<Self> {
        if a.cols != b.rows {
            return Err(KernelError::ShapeMismatch {
                n: a.rows,
                k: a.cols,
                k2: b.rows,
                m: b.cols,
            });
        }
        MatmulShape::new(a.rows, a.cols, b.cols)
    }

    /// Rows of A and C.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Shared (reduction) dimension.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Columns of B and C.
    pub fn m(&self) -> usize {
        self.m
    }

    pub fn a_dims(&self) -> MatrixDims {
        MatrixDims::new(self.n, self.k)
    }

    pub fn b_dims(&self) -> MatrixDims {
        MatrixDims::new(self.k, self.m)
    }

    pub fn c_dims(&self) -> MatrixDims {
        MatrixDims::new(self.n, self.m)
    }

    pub fn a_len(&self) -> usize {
        self.n * self.k
    }

    pub fn b_len(&self) -> usize {
        self.k * self.m
    }

    pub fn c_len(&self) -> usize {
        self.n * self.m
    }

    /// Byte length of the output file.
    pub fn c_bytes(&self) -> usize {
        self.c_len() * ELEMENT_BYTES
    }
}

impl fmt::Display for MatmulShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}x{}] @ [{}x{}]", self.n, self.k, self.k, self.m)
    }
}
