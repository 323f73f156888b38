//! Block-map assisted image flashing trait.

use crate::HalResult;
use std::path::Path;

/// Options for destructive flash operations.
#[derive(Debug, Clone)]
pub struct FlashOptions {
    pub dry_run: bool,
    pub confirmed: bool,
}

impl FlashOptions {
    pub fn new(dry_run: bool, confirmed: bool) -> Self {
        Self { dry_run, confirmed }
    }
}

/// Trait for writing a compressed image to a block device.
pub trait FlashOps {
    /// Write `image` to `device`, using `bmap` to skip unmapped ranges.
    ///
    /// The flashing tool verifies the written data against the block map; its
    /// output is passed through to the terminal.
    ///
    /// # Arguments
    /// * `image` - Compressed image (e.g., `core-image.wic.xz`)
    /// * `bmap` - Block map sidecar for `image`
    /// * `device` - Target block device path (e.g., `/dev/sdb`)
    fn bmap_copy(
        &self,
        image: &Path,
        bmap: &Path,
        device: &str,
        opts: &FlashOptions,
    ) -> HalResult<()>;
}
