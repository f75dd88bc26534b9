// Per-block accumulation and the naive reference product.
use crate::cpu::lanes::LanePath;
use crate::output::SharedOutput;
use crate::partition::Block;
use crate::shape::MatmulShape;

/// Accumulate `A[block.rows, :] @ B[:, block.cols]` into the block of C.
///
/// For every output row in the block and every shared index `t`, the scalar
/// `A[row][t]` is broadcast across the block's slice of `B[t]` and added
/// into the same slice of `C[row]`. Each output element therefore sees its
/// products in ascending `t` order regardless of block size or worker
/// count.
///
/// # Safety
/// The caller must own `block` exclusively: no other thread may access
/// any element of `out` inside `block` while this runs.
pub unsafe fn accumulate_block(
    a: &[f32],
    b: &[f32],
    out: &SharedOutput<'_>,
    shape: MatmulShape,
    block: &Block,
    path: LanePath,
) {
    let k = shape.k();
    let m = shape.m();
    let cols = block.cols.clone();

    for row in block.rows.clone() {
        let c_row = unsafe { out.segment_mut(row, cols.clone()) };
        let a_row = &a[row * k..(row + 1) * k];
        for (t, &a_val) in a_row.iter().enumerate() {
            let b_seg = &b[t * m + cols.start..t * m + cols.end];
            path.axpy(a_val, b_seg, c_row);
        }
    }
}

/// Straightforward triple loop: `c[i][j] += Σ_t a[i][t] * b[t][j]`.
pub fn naive_accumulate(a: &[f32], b: &[f32], c: &mut [f32], shape: MatmulShape) {
    let (n, k, m) = (shape.n(), shape.k(), shape.m());
    for i in 0..n {
        for j in 0..m {
            let mut sum = 0.0f32;
            for p in 0..k {
                sum += a[i * k + p] * b[p * m + j];
            }
            c[i * m + j] += sum;
        }
    }
}
