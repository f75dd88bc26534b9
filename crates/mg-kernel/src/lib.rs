//! `mg-kernel` - Blocked, lane-vectorized f32 matrix multiplication for mapped-gemm.
//!
//! This crate provides:
//! - `MatmulShape` / `MatrixDims` shape descriptors with checked sizing
//! - A `MatmulKernel` trait for kernels that accumulate into caller-owned output
//! - `BlockedKernel`: cache-blocked, statically partitioned, parallel kernel
//! - `NaiveKernel`: triple-loop reference implementation
//! - Static partitioning of the output block grid across workers
//!
//! The crate performs no I/O; callers hand it slices, which may be backed
//! by the heap or by memory-mapped files.

pub mod backend;
pub mod cancel;
pub mod config;
pub mod cpu;
pub mod error;
pub mod output;
pub mod partition;
pub mod shape;

// Re-export primary types at the crate root for convenience.
pub use backend::MatmulKernel;
pub use cancel::CancelToken;
pub use config::{KernelConfig, LaneWidth, DEFAULT_BLOCK_SIZE};
pub use cpu::{BlockedKernel, NaiveKernel};
pub use error::{KernelError, Result};
pub use partition::{Block, BlockGrid, StaticPartition, WorkerAssignment};
pub use shape::{MatmulShape, MatrixDims, ELEMENT_BYTES};
