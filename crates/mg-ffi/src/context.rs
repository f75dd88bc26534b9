use std::path::PathBuf;

use mg_kernel::{CancelToken, KernelConfig};
use mg_mapped::{Destination, FileMultiplier, Result};

/// Opaque context handle that owns the kernel configuration, the output
/// location and the cancellation flag.
pub struct MGContext {
    pub multiplier: FileMultiplier,
    pub cancel: CancelToken,
}

impl MGContext {
    pub fn new(config: KernelConfig) -> Result<Self> {
        let cancel = CancelToken::new();
        let multiplier = FileMultiplier::new(config)?.with_cancel_token(cancel.clone());
        Ok(Self { multiplier, cancel })
    }

    /// Write future results as unique files inside `dir`.
    pub fn set_output_dir(&mut self, dir: PathBuf) {
        self.multiplier.set_destination(Destination::UniqueIn(dir));
    }
}
