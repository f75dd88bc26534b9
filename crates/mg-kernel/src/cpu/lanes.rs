//! Lane kernels for the inner accumulate step `c[j] += a * b[j]`.
//!
//! The portable kernel is written over fixed-size chunks so LLVM can map
//! each chunk onto one vector register. On x86_64 an explicit AVX2/FMA
//! kernel is used for 8-lane configurations when the CPU supports it.
//! Both kernels finish columns past the last full chunk with a scalar tail.

use crate::config::LaneWidth;

/// Lane kernel chosen for one multiplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanePath {
    /// Fixed-width chunks in plain Rust (unfused multiply then add).
    Portable(LaneWidth),
    /// `_mm256_fmadd_ps` over 8 lanes.
    #[cfg(target_arch = "x86_64")]
    Avx2Fma,
}

impl LanePath {
    /// Pick the fastest available kernel for `lanes` on this CPU.
    pub fn select(lanes: LaneWidth) -> LanePath {
        #[cfg(target_arch = "x86_64")]
        {
            if lanes == LaneWidth::X8
                && is_x86_feature_detected!("avx2")
                && is_x86_feature_detected!("fma")
            {
                return LanePath::Avx2Fma;
            }
        }
        LanePath::Portable(lanes)
    }

    /// `c[j] += a * b[j]` for every `j`.
    ///
    /// # Panics
    /// Panics if `b` and `c` have different lengths.
    #[inline]
    pub fn axpy(self, a: f32, b: &[f32], c: &mut [f32]) {
        assert_eq!(b.len(), c.len(), "lane operands differ in length");
        match self {
            LanePath::Portable(LaneWidth::X4) => axpy_portable::<4>(a, b, c),
            LanePath::Portable(LaneWidth::X8) => axpy_portable::<8>(a, b, c),
            LanePath::Portable(LaneWidth::X16) => axpy_portable::<16>(a, b, c),
            // SAFETY: only selected after runtime detection of avx2 and fma.
            #[cfg(target_arch = "x86_64")]
            LanePath::Avx2Fma => unsafe { axpy_avx2_fma(a, b, c) },
        }
    }
}

#[inline(always)]
fn axpy_portable<const L: usize>(a: f32, b: &[f32], c: &mut [f32]) {
    let mut c_chunks = c.chunks_exact_mut(L);
    let mut b_chunks = b.chunks_exact(L);
    for (cv, bv) in (&mut c_chunks).zip(&mut b_chunks) {
        for l in 0..L {
            cv[l] += a * bv[l];
        }
    }
    for (cv, bv) in c_chunks
        .into_remainder()
        .iter_mut()
        .zip(b_chunks.remainder())
    {
        *cv += a * bv;
    }
}

/// # Safety
/// Caller must ensure the CPU supports AVX2 and FMA, and that
/// `b.len() == c.len()`.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2,fma")]
unsafe fn axpy_avx2_fma(a: f32, b: &[f32], c: &mut [f32]) {
    use std::arch::x86_64::*;

    let len = c.len();
    let main = len - len % 8;
    let av = _mm256_set1_ps(a);

    let mut j = 0;
    while j < main {
        let bv = _mm256_loadu_ps(b.as_ptr().add(j));
        let cv = _mm256_loadu_ps(c.as_ptr().add(j));
        _mm256_storeu_ps(c.as_mut_ptr().add(j), _mm256_fmadd_ps(av, bv, cv));
        j += 8;
    }

    for j in main..len {
        c[j] = a.mul_add(b[j], c[j]);
    }
}
