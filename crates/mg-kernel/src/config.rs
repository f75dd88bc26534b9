use std::fmt;

use crate::error::{KernelError, Result};

/// Default edge length of a square output block.
pub const DEFAULT_BLOCK_SIZE: usize = 64;

/// Number of f32 values processed together by one lane step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LaneWidth {
    /// 128-bit registers (SSE, NEON).
    X4,
    /// 256-bit registers (AVX2).
    #[default]
    X8,
    /// 512-bit registers (AVX-512).
    X16,
}

impl LaneWidth {
    /// Number of f32 lanes.
    pub fn lanes(&self) -> usize {
        match self {
            LaneWidth::X4 => 4,
            LaneWidth::X8 => 8,
            LaneWidth::X16 => 16,
        }
    }

    /// Converts a lane count to a `LaneWidth`.
    pub fn from_lanes(lanes: usize) -> Option<LaneWidth> {
        match lanes {
            4 => Some(LaneWidth::X4),
            8 => Some(LaneWidth::X8),
            16 => Some(LaneWidth::X16),
            _ => None,
        }
    }
}

impl fmt::Display for LaneWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f32x{}", self.lanes())
    }
}

/// Tuning parameters for the blocked kernel.
///
/// None of these affect the computed values beyond floating-point
/// accumulation order, which is fixed per element for a given lane path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelConfig {
    /// Edge length of the square output blocks handed to workers.
    pub block_size: usize,
    /// Vector width of the inner accumulate step.
    pub lanes: LaneWidth,
    /// Worker count. `None` uses rayon's global pool, which is sized by the
    /// available hardware parallelism.
    pub threads: Option<usize>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        KernelConfig {
            block_size: DEFAULT_BLOCK_SIZE,
            lanes: LaneWidth::default(),
            threads: None,
        }
    }
}

impl KernelConfig {
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_lanes(mut self, lanes: LaneWidth) -> Self {
        self.lanes = lanes;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Check that the configuration can drive the kernel.
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(KernelError::InvalidConfig(
                "block_size must be > 0".to_string(),
            ));
        }
        if self.threads == Some(0) {
            return Err(KernelError::InvalidConfig(
                "threads must be > 0 when set".to_string(),
            ));
        }
        Ok(())
    }
}
