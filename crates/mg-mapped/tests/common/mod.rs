#![allow(dead_code)]

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Write `values` as a raw host-endian f32 file.
pub fn write_matrix(dir: &Path, name: &str, values: &[f32]) -> PathBuf {
    let path = dir.join(name);
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Read a raw host-endian f32 file.
pub fn read_matrix(path: &Path) -> Vec<f32> {
    let bytes = std::fs::read(path).unwrap();
    assert_eq!(bytes.len() % 4, 0, "file length not a multiple of 4");
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

pub fn random_matrix(seed: u64, len: usize) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
}

/// Naive triple-loop product of row-major `a` (n x k) and `b` (k x m).
pub fn reference(a: &[f32], b: &[f32], n: usize, k: usize, m: usize) -> Vec<f32> {
    let mut c = vec![0.0f32; n * m];
    for i in 0..n {
        for j in 0..m {
            let mut sum = 0.0f32;
            for p in 0..k {
                sum += a[i * k + p] * b[p * m + j];
            }
            c[i * m + j] = sum;
        }
    }
    c
}

pub fn assert_matrices_close(expected: &[f32], actual: &[f32], name: &str) {
    assert_eq!(expected.len(), actual.len(), "{}: length mismatch", name);
    for (i, (e, a)) in expected.iter().zip(actual).enumerate() {
        assert!(
            approx::relative_eq!(*e, *a, epsilon = 1e-4, max_relative = 1e-4),
            "{}: mismatch at index {}: expected {}, got {}",
            name,
            i,
            e,
            a
        );
    }
}

/// Number of entries in a directory.
pub fn dir_len(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
