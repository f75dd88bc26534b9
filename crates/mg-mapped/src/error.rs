use std::io;
use std::path::PathBuf;

use mg_kernel::KernelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatmulError {
    #[error("matrix dimensions are not compatible: A has {a_cols} columns but B has {b_rows} rows")]
    ShapeMismatch { a_cols: usize, b_rows: usize },
    #[error("invalid matrix shape: {0}")]
    InvalidShape(KernelError),
    #[error("failed to create or size destination {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to map destination {}: {source}", path.display())]
    Mapping {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to access operand {}: {source}", path.display())]
    InputAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("kernel error: {0}")]
    Kernel(KernelError),
}

impl MatmulError {
    /// Short name of the pipeline step that failed.
    pub fn step(&self) -> &'static str {
        match self {
            MatmulError::ShapeMismatch { .. } | MatmulError::InvalidShape(_) => "validate shape",
            MatmulError::Storage { .. } => "create destination",
            MatmulError::Mapping { .. } => "map destination",
            MatmulError::InputAccess { .. } => "map operand",
            MatmulError::Kernel(_) => "compute",
        }
    }
}

impl From<KernelError> for MatmulError {
    fn from(e: KernelError) -> Self {
        match e {
            KernelError::ShapeMismatch { k, k2, .. } => MatmulError::ShapeMismatch {
                a_cols: k,
                b_rows: k2,
            },
            KernelError::EmptyDimension { .. } | KernelError::SizeOverflow { .. } => {
                MatmulError::InvalidShape(e)
            }
            other => MatmulError::Kernel(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, MatmulError>;
