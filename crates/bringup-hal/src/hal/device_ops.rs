//! Block device inventory trait.

use crate::{BlockDevice, HalResult};

/// Trait for enumerating whole block devices.
pub trait DeviceOps {
    /// List block devices currently attached, in system enumeration order.
    ///
    /// # Arguments
    /// * `exclude_virtual` - Drop loop/ram/dm/md/optical devices
    fn list_block_devices(&self, exclude_virtual: bool) -> HalResult<Vec<BlockDevice>>;
}
