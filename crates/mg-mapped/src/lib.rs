//! `mg-mapped` - Memory-mapped file pipeline for mapped-gemm.
//!
//! Operands and the result are raw, headerless files of host-endian f32
//! values in row-major order. Operands are mapped read-only, the result is
//! created at its exact size and mapped writable, and the kernel from
//! `mg-kernel` accumulates straight into the mapping.

pub mod destination;
pub mod error;
pub mod multiply;
pub mod operand;

pub use destination::{Destination, OutputFile, RESULT_PREFIX, RESULT_SUFFIX};
pub use error::{MatmulError, Result};
pub use multiply::{compute, FileMultiplier, OperandFile};
pub use operand::MappedOperand;
