//! Fake HAL implementation for testing.
//!
//! This implementation records all operations without executing them,
//! allowing for CI-safe testing without root privileges or real hardware.
//! Devices, mounts, remote files and failures are seeded with the `with_*`
//! builders.

use super::{DeviceOps, FlashOps, FlashOptions, MountOps, RemoteOps};
use crate::{BlockDevice, HalError, HalResult, MountTable};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Operation records for testing and verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    ListDevices {
        exclude_virtual: bool,
    },
    MountTable,
    Unmount {
        partition: String,
    },
    BmapCopy {
        image: PathBuf,
        bmap: PathBuf,
        device: String,
    },
    RemoteSize {
        host: String,
        path: String,
    },
    RemoteCopy {
        host: String,
        source: String,
        destination: PathBuf,
    },
}

/// Shared state for FakeHal operations.
#[derive(Debug, Clone, Default)]
struct FakeHalState {
    /// All operations that were recorded
    operations: Vec<Operation>,
    devices: Vec<BlockDevice>,
    mounts: MountTable,
    /// Partitions whose unmount fails, with the reported reason
    failing_unmounts: HashMap<String, String>,
    /// Partitions that report a successful unmount but stay mounted
    sticky_mounts: HashSet<String>,
    device_error: Option<String>,
    mount_table_error: Option<String>,
    flash_error: Option<String>,
    remote_files: HashMap<String, Vec<u8>>,
}

/// Fake HAL implementation that records operations without executing them.
#[derive(Debug, Clone, Default)]
pub struct FakeHal {
    state: Arc<Mutex<FakeHalState>>,
}

impl FakeHal {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeHalState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_devices(self, paths: &[&str]) -> Self {
        self.state()
            .devices
            .extend(paths.iter().map(|p| BlockDevice::new(*p)));
        self
    }

    pub fn with_mount(self, partition: &str, mount_point: &str) -> Self {
        self.state()
            .mounts
            .insert(partition.to_string(), PathBuf::from(mount_point));
        self
    }

    pub fn with_failing_unmount(self, partition: &str, reason: &str) -> Self {
        self.state()
            .failing_unmounts
            .insert(partition.to_string(), reason.to_string());
        self
    }

    pub fn with_sticky_mount(self, partition: &str) -> Self {
        self.state().sticky_mounts.insert(partition.to_string());
        self
    }

    pub fn with_device_error(self, msg: &str) -> Self {
        self.state().device_error = Some(msg.to_string());
        self
    }

    pub fn with_mount_table_error(self, msg: &str) -> Self {
        self.state().mount_table_error = Some(msg.to_string());
        self
    }

    pub fn with_flash_error(self, stderr: &str) -> Self {
        self.state().flash_error = Some(stderr.to_string());
        self
    }

    pub fn with_remote_file(self, path: &str, content: &[u8]) -> Self {
        self.state()
            .remote_files
            .insert(path.to_string(), content.to_vec());
        self
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<Operation> {
        self.state().operations.clone()
    }

    /// Get the number of operations recorded.
    pub fn operation_count(&self) -> usize {
        self.state().operations.len()
    }

    /// Check if a specific operation was recorded.
    pub fn has_operation(&self, check: impl Fn(&Operation) -> bool) -> bool {
        self.state().operations.iter().any(check)
    }

    /// Number of unmount attempts for `partition`.
    pub fn unmount_attempts(&self, partition: &str) -> usize {
        self.state()
            .operations
            .iter()
            .filter(|op| matches!(op, Operation::Unmount { partition: p } if p == partition))
            .count()
    }

    pub fn flashed(&self) -> bool {
        self.has_operation(|op| matches!(op, Operation::BmapCopy { .. }))
    }

    pub fn is_mounted(&self, partition: &str) -> bool {
        self.state().mounts.contains_key(partition)
    }

    fn record_operation(&self, op: Operation) {
        self.state().operations.push(op);
    }
}

impl DeviceOps for FakeHal {
    fn list_block_devices(&self, exclude_virtual: bool) -> HalResult<Vec<BlockDevice>> {
        self.record_operation(Operation::ListDevices { exclude_virtual });
        let state = self.state();
        if let Some(msg) = &state.device_error {
            return Err(HalError::CommandNotFound(msg.clone()));
        }
        Ok(state
            .devices
            .iter()
            .filter(|d| !exclude_virtual || !d.is_virtual())
            .cloned()
            .collect())
    }
}

impl MountOps for FakeHal {
    fn mount_table(&self) -> HalResult<MountTable> {
        self.record_operation(Operation::MountTable);
        let state = self.state();
        if let Some(msg) = &state.mount_table_error {
            return Err(HalError::Other(msg.clone()));
        }
        Ok(state.mounts.clone())
    }

    fn unmount_partition(&self, partition: &str, dry_run: bool) -> HalResult<()> {
        if dry_run {
            log::info!("FAKE HAL DRY RUN: unmount {}", partition);
            return Ok(());
        }

        log::info!("FAKE HAL: unmount {}", partition);
        self.record_operation(Operation::Unmount {
            partition: partition.to_string(),
        });

        let mut state = self.state();
        if let Some(reason) = state.failing_unmounts.get(partition) {
            return Err(HalError::Other(reason.clone()));
        }
        if !state.sticky_mounts.contains(partition) {
            state.mounts.remove(partition);
        }
        Ok(())
    }
}

impl FlashOps for FakeHal {
    fn bmap_copy(
        &self,
        image: &Path,
        bmap: &Path,
        device: &str,
        opts: &FlashOptions,
    ) -> HalResult<()> {
        if !opts.dry_run && !opts.confirmed {
            return Err(HalError::SafetyLock);
        }

        if opts.dry_run {
            log::info!("FAKE HAL DRY RUN: flash {} -> {}", image.display(), device);
            return Ok(());
        }

        log::info!("FAKE HAL: flash {} -> {}", image.display(), device);
        self.record_operation(Operation::BmapCopy {
            image: image.to_path_buf(),
            bmap: bmap.to_path_buf(),
            device: device.to_string(),
        });

        if let Some(stderr) = self.state().flash_error.clone() {
            return Err(HalError::CommandFailed {
                program: "bmaptool".to_string(),
                code: Some(1),
                stderr,
            });
        }
        Ok(())
    }
}

impl RemoteOps for FakeHal {
    fn remote_file_size(&self, host: &str, path: &str) -> HalResult<Option<u64>> {
        self.record_operation(Operation::RemoteSize {
            host: host.to_string(),
            path: path.to_string(),
        });
        Ok(self
            .state()
            .remote_files
            .get(path)
            .map(|content| content.len() as u64))
    }

    /// Writes the seeded content to `destination`; unknown sources fail like scp.
    fn remote_copy(&self, host: &str, source: &str, destination: &Path) -> HalResult<()> {
        self.record_operation(Operation::RemoteCopy {
            host: host.to_string(),
            source: source.to_string(),
            destination: destination.to_path_buf(),
        });
        let content = self.state().remote_files.get(source).cloned();
        match content {
            Some(bytes) => {
                fs::write(destination, bytes)?;
                Ok(())
            }
            None => Err(HalError::CommandFailed {
                program: "scp".to_string(),
                code: Some(1),
                stderr: format!("scp: {}: No such file or directory", source),
            }),
        }
    }
}
