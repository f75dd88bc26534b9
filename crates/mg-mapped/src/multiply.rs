use std::path::{Path, PathBuf};

use mg_kernel::{BlockedKernel, CancelToken, KernelConfig, MatmulKernel, MatmulShape, MatrixDims};
use tracing::{debug, info, instrument, warn};

use crate::destination::{Destination, OutputFile};
use crate::error::Result;
use crate::operand::MappedOperand;

/// An operand file together with its declared extent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperandFile {
    pub path: PathBuf,
    pub dims: MatrixDims,
}

impl OperandFile {
    pub fn new(path: impl Into<PathBuf>, rows: usize, cols: usize) -> Self {
        OperandFile {
            path: path.into(),
            dims: MatrixDims::new(rows, cols),
        }
    }
}

/// Multiplies file-backed matrices and writes the product to a new file.
///
/// Every call runs the same fixed sequence: validate the shapes, create
/// and map the destination, map both operands, run the kernel, flush and
/// release. Handles and mappings are owned by RAII wrappers, so whichever
/// step fails, everything acquired before it is released on return.
#[derive(Debug, Clone, Default)]
pub struct FileMultiplier<K: MatmulKernel = BlockedKernel> {
    kernel: K,
    destination: Destination,
}

impl FileMultiplier<BlockedKernel> {
    /// A multiplier using the blocked kernel with `config`.
    pub fn new(config: KernelConfig) -> Result<Self> {
        Ok(FileMultiplier {
            kernel: BlockedKernel::new(config)?,
            destination: Destination::default(),
        })
    }

    /// Abort the kernel between blocks once `token` is cancelled.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.kernel = self.kernel.with_cancel_token(token);
        self
    }
}

impl<K: MatmulKernel> FileMultiplier<K> {
    /// A multiplier driving an arbitrary kernel.
    pub fn with_kernel(kernel: K) -> Self {
        FileMultiplier {
            kernel,
            destination: Destination::default(),
        }
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn set_destination(&mut self, destination: Destination) {
        self.destination = destination;
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Compute `a @ b` and return the path of the result file.
    ///
    /// The result is a headerless `a.rows x b.cols` f32 matrix. On error no
    /// path is returned; a unique destination is removed, an explicit
    /// destination path may be left empty or partially written. An explicit
    /// destination that is the same file as either operand is refused with
    /// `Storage` before anything is written.
    #[instrument(
        skip_all,
        fields(kernel = self.kernel.name(), a = %a.path.display(), b = %b.path.display())
    )]
    pub fn multiply(&self, a: &OperandFile, b: &OperandFile) -> Result<PathBuf> {
        match self.try_multiply(a, b) {
            Ok((path, shape)) => {
                info!(shape = %shape, path = %path.display(), "matrix product written");
                Ok(path)
            }
            Err(e) => {
                warn!(step = e.step(), error = %e, "matrix multiplication failed");
                Err(e)
            }
        }
    }

    fn try_multiply(&self, a: &OperandFile, b: &OperandFile) -> Result<(PathBuf, MatmulShape)> {
        let shape = MatmulShape::from_operands(a.dims, b.dims)?;
        self.destination
            .ensure_distinct(&[a.path.as_path(), b.path.as_path()])?;

        let mut output = OutputFile::create(&self.destination, shape.c_dims())?;
        debug!(path = %output.path().display(), bytes = shape.c_bytes(), "destination mapped");

        let lhs = MappedOperand::open(&a.path, a.dims)?;
        let rhs = MappedOperand::open(&b.path, b.dims)?;
        debug!("operands mapped");

        self.kernel
            .accumulate(lhs.as_slice(), rhs.as_slice(), output.as_mut_slice(), shape)?;
        drop(lhs);
        drop(rhs);

        let path = output.finish()?;
        Ok((path, shape))
    }
}

/// Multiply an `n x k` matrix stored at `a_path` by a `k x m` matrix stored
/// at `b_path` using the default kernel configuration.
///
/// The product is written to a uniquely named file in the system temporary
/// directory and that file's path is returned.
pub fn compute(
    a_path: impl AsRef<Path>,
    b_path: impl AsRef<Path>,
    n: usize,
    k: usize,
    m: usize,
) -> Result<PathBuf> {
    FileMultiplier::<BlockedKernel>::default().multiply(
        &OperandFile::new(a_path.as_ref(), n, k),
        &OperandFile::new(b_path.as_ref(), k, m),
    )
}
