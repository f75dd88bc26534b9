//! Static partitioning of the output block grid.
//!
//! The output matrix is tiled into square blocks of `block_size` edge
//! length (clipped at the right and bottom edges). Blocks are numbered
//! row-block-major and the resulting index space is split into one
//! contiguous range per worker before any compute starts. Ranges never
//! overlap, so every output element belongs to exactly one worker.

use std::ops::Range;

/// A rectangular sub-range of output indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub rows: Range<usize>,
    pub cols: Range<usize>,
}

impl Block {
    pub fn width(&self) -> usize {
        self.cols.len()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }
}

/// Square tiling of a `rows x cols` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGrid {
    rows: usize,
    cols: usize,
    block_size: usize,
    row_blocks: usize,
    col_blocks: usize,
}

impl BlockGrid {
    /// Tile a `rows x cols` output with blocks of edge `block_size`.
    ///
    /// A `block_size` of zero is treated as one.
    pub fn new(rows: usize, cols: usize, block_size: usize) -> Self {
        let block_size = block_size.max(1);
        BlockGrid {
            rows,
            cols,
            block_size,
            row_blocks: rows.div_ceil(block_size),
            col_blocks: cols.div_ceil(block_size),
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn row_blocks(&self) -> usize {
        self.row_blocks
    }

    pub fn col_blocks(&self) -> usize {
        self.col_blocks
    }

    /// Total number of blocks.
    pub fn len(&self) -> usize {
        self.row_blocks * self.col_blocks
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the block with linear index `index`, clipped to the grid.
    ///
    /// # Panics
    /// Panics if `index >= len()`.
    pub fn block(&self, index: usize) -> Block {
        assert!(
            index < self.len(),
            "block index {} out of range for {} blocks",
            index,
            self.len()
        );
        let rb = index / self.col_blocks;
        let cb = index % self.col_blocks;

        let r0 = rb * self.block_size;
        let c0 = cb * self.block_size;
        Block {
            rows: r0..(r0 + self.block_size).min(self.rows),
            cols: c0..(c0 + self.block_size).min(self.cols),
        }
    }
}

/// The contiguous range of block indices owned by one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerAssignment {
    pub worker: usize,
    pub blocks: Range<usize>,
}

/// A fixed assignment of grid blocks to workers.
#[derive(Debug, Clone)]
pub struct StaticPartition {
    grid: BlockGrid,
    assignments: Vec<WorkerAssignment>,
}

impl StaticPartition {
    /// Split `grid` across at most `workers` workers.
    ///
    /// Each worker gets `len / workers` blocks and the first
    /// `len % workers` workers get one extra. Worker count is clamped to
    /// `1..=len` so no assignment is empty.
    pub fn new(grid: BlockGrid, workers: usize) -> Self {
        let total = grid.len();
        let workers = workers.clamp(1, total.max(1));
        let base = total / workers;
        let extra = total % workers;

        let mut assignments = Vec::with_capacity(workers);
        let mut start = 0;
        for worker in 0..workers {
            let len = base + usize::from(worker < extra);
            assignments.push(WorkerAssignment {
                worker,
                blocks: start..start + len,
            });
            start += len;
        }
        debug_assert_eq!(start, total);

        StaticPartition { grid, assignments }
    }

    pub fn grid(&self) -> &BlockGrid {
        &self.grid
    }

    pub fn assignments(&self) -> &[WorkerAssignment] {
        &self.assignments
    }

    pub fn workers(&self) -> usize {
        self.assignments.len()
    }

    /// Blocks owned by `assignment`, in execution order.
    pub fn blocks<'a>(
        &'a self,
        assignment: &'a WorkerAssignment,
    ) -> impl Iterator<Item = Block> + 'a {
        assignment.blocks.clone().map(|i| self.grid.block(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Count how many times each output element is covered.
    fn coverage(p: &StaticPartition, rows: usize, cols: usize) -> Vec<usize> {
        let mut hits = vec![0usize; rows * cols];
        for a in p.assignments() {
            for b in p.blocks(a) {
                for r in b.rows.clone() {
                    for c in b.cols.clone() {
                        hits[r * cols + c] += 1;
                    }
                }
            }
        }
        hits
    }

    #[test]
    fn test_grid_dimensions() {
        let g = BlockGrid::new(130, 64, 64);
        assert_eq!(g.row_blocks(), 3);
        assert_eq!(g.col_blocks(), 1);
        assert_eq!(g.len(), 3);
        assert!(!g.is_empty());
    }

    #[test]
    fn test_block_clipping() {
        let g = BlockGrid::new(5, 7, 4);
        assert_eq!(g.len(), 4);
        let last = g.block(3);
        assert_eq!(last.rows, 4..5);
        assert_eq!(last.cols, 4..7);
        assert_eq!(last.height(), 1);
        assert_eq!(last.width(), 3);
    }

    #[test]
    fn test_single_block_smaller_than_edge() {
        let g = BlockGrid::new(1, 5, 64);
        assert_eq!(g.len(), 1);
        assert_eq!(g.block(0), Block { rows: 0..1, cols: 0..5 });
    }

    #[test]
    #[should_panic]
    fn test_block_out_of_range() {
        BlockGrid::new(4, 4, 2).block(4);
    }

    #[test]
    fn test_partition_covers_every_element_once() {
        for &(rows, cols, bs) in &[(1, 1, 64), (67, 71, 8), (128, 64, 64), (9, 200, 7)] {
            for workers in [1, 2, 3, 5, 8, 64, 1000] {
                let p = StaticPartition::new(BlockGrid::new(rows, cols, bs), workers);
                assert!(
                    coverage(&p, rows, cols).iter().all(|&h| h == 1),
                    "rows={} cols={} bs={} workers={}",
                    rows,
                    cols,
                    bs,
                    workers
                );
            }
        }
    }

    #[test]
    fn test_partition_is_balanced_and_contiguous() {
        let p = StaticPartition::new(BlockGrid::new(40, 40, 4), 3);
        let lens: Vec<usize> = p.assignments().iter().map(|a| a.blocks.len()).collect();
        assert_eq!(lens, vec![34, 33, 33]);
        for pair in p.assignments().windows(2) {
            assert_eq!(pair[0].blocks.end, pair[1].blocks.start);
        }
    }

    #[test]
    fn test_workers_clamped() {
        let p = StaticPartition::new(BlockGrid::new(2, 2, 64), 16);
        assert_eq!(p.workers(), 1);

        let p = StaticPartition::new(BlockGrid::new(8, 8, 4), 0);
        assert_eq!(p.workers(), 1);
        assert_eq!(p.assignments()[0].blocks, 0..4);
    }
}
