//! Block device inventory types.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

/// Mounted sources keyed by device path (`/dev/sdb1` -> `/media/boot`).
///
/// A device absent from the table is considered unmounted.
pub type MountTable = BTreeMap<String, PathBuf>;

/// A whole block device as reported by the inventory query.
///
/// Identity is the device path alone; the remaining fields are only there to
/// make the selection menu readable.
#[derive(Debug, Clone, Default)]
pub struct BlockDevice {
    pub path: String,
    pub size_bytes: u64,
    pub model: Option<String>,
    pub transport: Option<String>,
    pub removable: bool,
}

impl BlockDevice {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// True for loop, ram, device-mapper, md and optical devices.
    pub fn is_virtual(&self) -> bool {
        is_virtual_name(self.name())
    }
}

impl PartialEq for BlockDevice {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for BlockDevice {}

impl Hash for BlockDevice {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

pub(crate) fn is_virtual_name(name: &str) -> bool {
    name.starts_with("loop")
        || name.starts_with("ram")
        || name.starts_with("zram")
        || name.starts_with("dm-")
        || name.starts_with("md")
        || name.starts_with("sr")
}
