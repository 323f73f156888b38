//! Mount table and unmount operations trait.

use crate::{HalResult, MountTable};

/// Trait for observing the mount table and unmounting partitions.
pub trait MountOps {
    /// Snapshot of mounted devices at call time.
    fn mount_table(&self) -> HalResult<MountTable>;

    /// Unmount every mount point backed by `partition`.
    ///
    /// Idempotent: a partition that is not mounted is not an error.
    ///
    /// # Arguments
    /// * `partition` - Device path (e.g., `/dev/sdb1`)
    /// * `dry_run` - If true, log the operation but don't execute it
    fn unmount_partition(&self, partition: &str, dry_run: bool) -> HalResult<()>;
}
