use std::fmt::Debug;

use crate::error::{KernelError, Result};
use crate::shape::MatmulShape;

/// Trait for pluggable matrix multiplication kernels.
///
/// Kernels accumulate into a caller-provided output so the same code path
/// serves heap buffers and memory-mapped files alike. An output that
/// starts zero-filled ends up holding exactly `A @ B`.
pub trait MatmulKernel: Send + Sync + Debug {
    /// Returns the name of this kernel (e.g., "blocked", "naive").
    fn name(&self) -> &str;

    /// Accumulate `A @ B` into `c`: `c[i*m + j] += Σ_t a[i*k + t] * b[t*m + j]`.
    ///
    /// - `a`: row-major data of shape [n, k]
    /// - `b`: row-major data of shape [k, m]
    /// - `c`: row-major data of shape [n, m]
    fn accumulate(&self, a: &[f32], b: &[f32], c: &mut [f32], shape: MatmulShape) -> Result<()>;

    /// Matrix multiplication into a fresh zero-filled buffer.
    fn matmul(&self, a: &[f32], b: &[f32], shape: MatmulShape) -> Result<Vec<f32>> {
        let mut c = vec![0.0f32; shape.c_len()];
        self.accumulate(a, b, &mut c, shape)?;
        Ok(c)
    }
}

/// Verify that the three buffers match `shape` exactly.
pub fn check_buffers(a: &[f32], b: &[f32], c: &[f32], shape: MatmulShape) -> Result<()> {
    for (operand, expected, got) in [
        ("A", shape.a_len(), a.len()),
        ("B", shape.b_len(), b.len()),
        ("C", shape.c_len(), c.len()),
    ] {
        if expected != got {
            return Err(KernelError::BufferLength {
                operand,
                expected,
                got,
            });
        }
    }
    Ok(())
}
