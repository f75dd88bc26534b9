pub mod lanes;
pub mod matmul;

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::backend::{check_buffers, MatmulKernel};
use crate::cancel::CancelToken;
use crate::config::KernelConfig;
use crate::error::{KernelError, Result};
use crate::output::SharedOutput;
use crate::partition::{BlockGrid, StaticPartition};
use crate::shape::MatmulShape;

use self::lanes::LanePath;

/// Reference kernel: a single-threaded triple loop.
///
/// Used to validate the blocked kernel; not intended for large inputs.
#[derive(Debug, Clone, Default)]
pub struct NaiveKernel;

impl NaiveKernel {
    pub fn new() -> Self {
        NaiveKernel
    }
}

impl MatmulKernel for NaiveKernel {
    fn name(&self) -> &str {
        "naive"
    }

    fn accumulate(&self, a: &[f32], b: &[f32], c: &mut [f32], shape: MatmulShape) -> Result<()> {
        check_buffers(a, b, c, shape)?;
        matmul::naive_accumulate(a, b, c, shape);
        Ok(())
    }
}

/// Cache-blocked, lane-vectorized, statically partitioned parallel kernel.
///
/// The output is tiled into `block_size` squares. The tiles are divided
/// among the workers before compute starts and every tile is processed by
/// exactly one worker, so the output needs no locking.
///
/// With `threads` set, the kernel owns a dedicated rayon pool of that size
/// for its whole lifetime; clones share it. Otherwise work runs on rayon's
/// global pool.
#[derive(Debug, Clone, Default)]
pub struct BlockedKernel {
    config: KernelConfig,
    pool: Option<Arc<rayon::ThreadPool>>,
    cancel: Option<CancelToken>,
}

impl BlockedKernel {
    /// Create a kernel with a validated configuration.
    ///
    /// # Errors
    /// `InvalidConfig` for a bad configuration, `ThreadPool` if the
    /// dedicated worker pool cannot be started.
    pub fn new(config: KernelConfig) -> Result<Self> {
        config.validate()?;
        let pool = match config.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("mg-worker-{}", i))
                    .build()
                    .map_err(|e| KernelError::ThreadPool(e.to_string()))?;
                debug!(threads, "started dedicated worker pool");
                Some(Arc::new(pool))
            }
            None => None,
        };
        Ok(BlockedKernel {
            config,
            pool,
            cancel: None,
        })
    }

    /// Attach a token that aborts the computation between blocks.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Number of workers the output is split across.
    pub fn workers(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    fn run(
        &self,
        a: &[f32],
        b: &[f32],
        c: &mut [f32],
        shape: MatmulShape,
        workers: usize,
    ) -> Result<()> {
        let path = LanePath::select(self.config.lanes);
        let grid = BlockGrid::new(shape.n(), shape.m(), self.config.block_size);
        let partition = StaticPartition::new(grid, workers);
        debug!(
            blocks = grid.len(),
            row_blocks = grid.row_blocks(),
            col_blocks = grid.col_blocks(),
            workers = partition.workers(),
            ?path,
            "partitioned output"
        );

        let out = SharedOutput::new(c, shape.n(), shape.m());
        partition
            .assignments()
            .par_iter()
            .try_for_each(|assignment| {
                for block in partition.blocks(assignment) {
                    if self.is_cancelled() {
                        return Err(KernelError::Cancelled);
                    }
                    // SAFETY: the static partition assigns each block to
                    // exactly one assignment, and each assignment runs on
                    // one thread.
                    unsafe { matmul::accumulate_block(a, b, &out, shape, &block, path) };
                }
                Ok(())
            })
    }
}

impl MatmulKernel for BlockedKernel {
    fn name(&self) -> &str {
        "blocked"
    }

    #[instrument(
        name = "blocked_accumulate",
        skip_all,
        fields(shape = %shape, block = self.config.block_size, lanes = %self.config.lanes)
    )]
    fn accumulate(&self, a: &[f32], b: &[f32], c: &mut [f32], shape: MatmulShape) -> Result<()> {
        check_buffers(a, b, c, shape)?;
        if self.is_cancelled() {
            return Err(KernelError::Cancelled);
        }

        let workers = self.workers();
        match &self.pool {
            Some(pool) => pool.install(|| self.run(a, b, c, shape, workers)),
            None => self.run(a, b, c, shape, workers),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LaneWidth;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_matrix(rng: &mut StdRng, len: usize) -> Vec<f32> {
        (0..len).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
    }

    fn assert_close(expected: &[f32], actual: &[f32]) {
        assert_eq!(expected.len(), actual.len());
        for (e, a) in expected.iter().zip(actual) {
            assert_relative_eq!(*e, *a, epsilon = 1e-4, max_relative = 1e-4);
        }
    }

    #[test]
    fn test_matmul_basic() {
        let kernel = BlockedKernel::default();
        let shape = MatmulShape::new(2, 2, 2).unwrap();
        let c = kernel
            .matmul(&[1.0, 2.0, 3.0, 4.0], &[5.0, 6.0, 7.0, 8.0], shape)
            .unwrap();
        assert_eq!(c, vec![19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_matmul_scalar() {
        let kernel = BlockedKernel::default();
        let shape = MatmulShape::new(1, 1, 1).unwrap();
        assert_eq!(kernel.matmul(&[2.0], &[3.0], shape).unwrap(), vec![6.0]);
    }

    #[test]
    fn test_matches_naive_on_odd_shapes() {
        let mut rng = StdRng::seed_from_u64(7);
        let naive = NaiveKernel::new();
        for &(n, k, m) in &[(1, 3, 5), (3, 1, 2), (7, 9, 13), (67, 13, 71), (65, 64, 129)] {
            let shape = MatmulShape::new(n, k, m).unwrap();
            let a = random_matrix(&mut rng, n * k);
            let b = random_matrix(&mut rng, k * m);
            let expected = naive.matmul(&a, &b, shape).unwrap();
            for lanes in [LaneWidth::X4, LaneWidth::X8, LaneWidth::X16] {
                for block in [1, 5, 64] {
                    let kernel = BlockedKernel::new(
                        KernelConfig::default()
                            .with_block_size(block)
                            .with_lanes(lanes),
                    )
                    .unwrap();
                    assert_close(&expected, &kernel.matmul(&a, &b, shape).unwrap());
                }
            }
        }
    }

    #[test]
    fn test_worker_count_does_not_change_bits() {
        let mut rng = StdRng::seed_from_u64(11);
        let shape = MatmulShape::new(50, 33, 47).unwrap();
        let a = random_matrix(&mut rng, shape.a_len());
        let b = random_matrix(&mut rng, shape.b_len());

        let base = BlockedKernel::new(KernelConfig::default().with_block_size(8).with_threads(1))
            .unwrap()
            .matmul(&a, &b, shape)
            .unwrap();
        for threads in [2, 3, 7] {
            for block in [8, 16, 64] {
                let kernel = BlockedKernel::new(
                    KernelConfig::default()
                        .with_block_size(block)
                        .with_threads(threads),
                )
                .unwrap();
                assert_eq!(base, kernel.matmul(&a, &b, shape).unwrap());
            }
        }
    }

    #[test]
    fn test_accumulates_into_existing_output() {
        let kernel = BlockedKernel::default();
        let shape = MatmulShape::new(1, 2, 2).unwrap();
        let mut c = vec![1.0, 1.0];
        kernel
            .accumulate(&[1.0, 1.0], &[1.0, 2.0, 3.0, 4.0], &mut c, shape)
            .unwrap();
        assert_eq!(c, vec![5.0, 7.0]);
    }

    #[test]
    fn test_buffer_length_rejected() {
        let kernel = BlockedKernel::default();
        let shape = MatmulShape::new(2, 2, 2).unwrap();
        let err = kernel.matmul(&[1.0; 3], &[1.0; 4], shape).unwrap_err();
        assert!(matches!(err, KernelError::BufferLength { operand: "A", .. }));
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            BlockedKernel::new(KernelConfig::default().with_block_size(0)),
            Err(KernelError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancelToken::new();
        token.cancel();
        let kernel = BlockedKernel::default().with_cancel_token(token.clone());
        let shape = MatmulShape::new(4, 4, 4).unwrap();
        let mut c = vec![0.0; 16];
        let err = kernel
            .accumulate(&[1.0; 16], &[1.0; 16], &mut c, shape)
            .unwrap_err();
        assert_eq!(err, KernelError::Cancelled);
        assert!(c.iter().all(|&v| v == 0.0));

        token.reset();
        kernel
            .accumulate(&[1.0; 16], &[1.0; 16], &mut c, shape)
            .unwrap();
        assert!(c.iter().all(|&v| v == 4.0));
    }

    #[test]
    fn test_dedicated_pool_is_built_once_and_shared() {
        let kernel = BlockedKernel::new(KernelConfig::default().with_threads(3)).unwrap();
        assert_eq!(kernel.workers(), 3);

        let clone = kernel.clone();
        let (Some(p1), Some(p2)) = (&kernel.pool, &clone.pool) else {
            panic!("threads set but no dedicated pool");
        };
        assert!(Arc::ptr_eq(p1, p2));

        let shape = MatmulShape::new(2, 2, 2).unwrap();
        for _ in 0..3 {
            let c = clone
                .matmul(&[1.0, 2.0, 3.0, 4.0], &[5.0, 6.0, 7.0, 8.0], shape)
                .unwrap();
            assert_eq!(c, vec![19.0, 22.0, 43.0, 50.0]);
        }
        assert!(Arc::ptr_eq(p1, clone.pool.as_ref().unwrap()));
    }

    #[test]
    fn test_global_pool_without_threads() {
        let kernel = BlockedKernel::default();
        assert!(kernel.pool.is_none());
        assert_eq!(kernel.workers(), rayon::current_num_threads());
    }

    #[test]
    fn test_kernel_names() {
        assert_eq!(BlockedKernel::default().name(), "blocked");
        assert_eq!(NaiveKernel::new().name(), "naive");
    }
}
