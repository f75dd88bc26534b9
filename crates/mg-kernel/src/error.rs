use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    #[error("matmul dimension mismatch: [{n}x{k}] @ [{k2}x{m}]")]
    ShapeMismatch {
        n: usize,
        k: usize,
        k2: usize,
        m: usize,
    },
    #[error("matmul dimensions must be non-zero: n={n}, k={k}, m={m}")]
    EmptyDimension { n: usize, k: usize, m: usize },
    #[error("matrix of {rows}x{cols} f32 values overflows the address space")]
    SizeOverflow { rows: usize, cols: usize },
    #[error("{operand} buffer holds {got} values, expected {expected}")]
    BufferLength {
        operand: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("invalid kernel configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
    #[error("multiplication cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, KernelError>;
