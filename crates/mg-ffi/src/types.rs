use mg_kernel::{KernelConfig, KernelError, LaneWidth};
use mg_mapped::MatmulError;

/// Status codes returned by all FFI functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MGStatus {
    Ok = 0,
    ErrorInvalidArgument = 1,
    ErrorShapeMismatch = 2,
    ErrorStorage = 3,
    ErrorMapping = 4,
    ErrorInputAccess = 5,
    ErrorCancelled = 6,
    ErrorInternal = 7,
}

impl From<&MatmulError> for MGStatus {
    fn from(e: &MatmulError) -> Self {
        match e {
            MatmulError::ShapeMismatch { .. } | MatmulError::InvalidShape(_) => {
                MGStatus::ErrorShapeMismatch
            }
            MatmulError::Storage { .. } => MGStatus::ErrorStorage,
            MatmulError::Mapping { .. } => MGStatus::ErrorMapping,
            MatmulError::InputAccess { .. } => MGStatus::ErrorInputAccess,
            MatmulError::Kernel(KernelError::Cancelled) => MGStatus::ErrorCancelled,
            MatmulError::Kernel(KernelError::InvalidConfig(_)) => MGStatus::ErrorInvalidArgument,
            MatmulError::Kernel(_) => MGStatus::ErrorInternal,
        }
    }
}

/// Kernel tuning parameters.
#[repr(C)]
#[derive(Debug, Clone)]
pub struct MGKernelParams {
    /// Edge length of output blocks; must be > 0.
    pub block_size: u32,
    /// Vector lanes per step: 4, 8 or 16.
    pub lanes: u32,
    /// Worker threads; 0 uses one per available CPU.
    pub threads: u32,
}

impl Default for MGKernelParams {
    fn default() -> Self {
        Self {
            block_size: 64,
            lanes: 8,
            threads: 0,
        }
    }
}

impl MGKernelParams {
    /// Convert to a validated kernel configuration.
    pub fn to_config(&self) -> Result<KernelConfig, String> {
        let lanes = LaneWidth::from_lanes(self.lanes as usize)
            .ok_or_else(|| format!("unsupported lane width {}", self.lanes))?;
        let mut config = KernelConfig::default()
            .with_block_size(self.block_size as usize)
            .with_lanes(lanes);
        if self.threads > 0 {
            config = config.with_threads(self.threads as usize);
        }
        config.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }
}
