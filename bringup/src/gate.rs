//! Device safety gate.
//!
//! Nothing is written to a block device unless every partition belonging to
//! it has been unmounted first. The pure decision helpers ([`annotate_device`],
//! [`unsafe_partitions`]) are kept apart from [`DeviceSafetyGate`], which
//! performs the inventory queries, the unmount pass and the flash through the
//! HAL.

use crate::images::ImagePair;
use crate::ui::cancel::CancelToken;
use bringup_error::{GateError, GateResult, HalError, UnmountFailure};
use bringup_hal::{BlockDevice, DeviceNaming, FlashOptions, MountTable, SystemHal};
use log::{info, warn};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Mount state of one device, for display and decisions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceAnnotation {
    pub is_mounted: bool,
    pub partitions: Vec<(String, PathBuf)>,
}

/// Outcome of an unmount pass. The two sets never overlap.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnmountReport {
    pub unmounted: BTreeSet<String>,
    pub failures: Vec<UnmountFailure>,
}

impl UnmountReport {
    pub fn failed(&self) -> BTreeSet<String> {
        self.failures.iter().map(|f| f.partition.clone()).collect()
    }
}

/// The device and image pair chosen for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashTarget {
    pub device: BlockDevice,
    pub image: ImagePair,
}

/// Proof that the safety check passed for a device.
///
/// Only [`DeviceSafetyGate::check_safe`] can create one, and
/// [`DeviceSafetyGate::confirm_and_flash`] requires it.
#[derive(Debug)]
pub struct FlashClearance {
    device: String,
}

impl FlashClearance {
    pub fn device(&self) -> &str {
        &self.device
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateOptions {
    pub naming: DeviceNaming,
    pub exclude_virtual: bool,
    pub dry_run: bool,
}

impl Default for GateOptions {
    fn default() -> Self {
        Self {
            naming: DeviceNaming::Prefix,
            exclude_virtual: true,
            dry_run: false,
        }
    }
}

/// Partitions in `mounts` that belong to `device`, with their mount points.
pub fn annotate_device(device: &str, mounts: &MountTable, naming: DeviceNaming) -> DeviceAnnotation {
    let partitions: Vec<(String, PathBuf)> = mounts
        .iter()
        .filter(|(part, _)| naming.is_partition_of(part, device))
        .map(|(part, mnt)| (part.clone(), mnt.clone()))
        .collect();
    DeviceAnnotation {
        is_mounted: !partitions.is_empty(),
        partitions,
    }
}

/// Partitions of `device` that block a flash: every failed unmount, plus any
/// partition still present in the freshly captured mount table.
pub fn unsafe_partitions(
    device: &str,
    report: &UnmountReport,
    mounts_after: Option<&MountTable>,
    naming: DeviceNaming,
) -> Vec<String> {
    let mut blocking = report.failed();
    if let Some(mounts) = mounts_after {
        blocking.extend(
            annotate_device(device, mounts, naming)
                .partitions
                .into_iter()
                .map(|(part, _)| part),
        );
    }
    blocking.into_iter().collect()
}

pub struct DeviceSafetyGate<'a, H: SystemHal + ?Sized> {
    hal: &'a H,
    opts: GateOptions,
}

impl<'a, H: SystemHal + ?Sized> DeviceSafetyGate<'a, H> {
    pub fn new(hal: &'a H, opts: GateOptions) -> Self {
        Self { hal, opts }
    }

    pub fn list_devices(&self) -> GateResult<Vec<BlockDevice>> {
        self.hal
            .list_block_devices(self.opts.exclude_virtual)
            .map_err(|e| GateError::enumeration("block devices", e))
    }

    pub fn list_mounted_partitions(&self) -> GateResult<MountTable> {
        self.hal
            .mount_table()
            .map_err(|e| GateError::enumeration("mount table", e))
    }

    pub fn annotate(&self, device: &str, mounts: &MountTable) -> DeviceAnnotation {
        annotate_device(device, mounts, self.opts.naming)
    }

    /// Attempt to unmount every partition of `device` found in `mounts`.
    ///
    /// Each partition is tried exactly once; a failure is recorded and the
    /// pass continues with the next partition.
    pub fn unmount_partitions(&self, device: &str, mounts: &MountTable) -> UnmountReport {
        let mut report = UnmountReport::default();
        for (partition, mount_point) in self.annotate(device, mounts).partitions {
            info!("🧹 Unmounting {} from {}", partition, mount_point.display());
            match self.hal.unmount_partition(&partition, self.opts.dry_run) {
                Ok(()) => {
                    report.unmounted.insert(partition);
                }
                Err(err) => {
                    let failure = UnmountFailure {
                        partition,
                        reason: err.to_string(),
                    };
                    warn!("{}", GateError::UnmountFailure(failure.clone()));
                    report.failures.push(failure);
                }
            }
        }
        report
    }

    /// Clear `device` for flashing, or report what is still mounted.
    ///
    /// Outside dry-run the mount table is captured again so partitions that
    /// reported success but are still mounted also block the flash.
    pub fn check_safe(&self, device: &str, report: &UnmountReport) -> GateResult<FlashClearance> {
        let mounts_after = if self.opts.dry_run {
            None
        } else {
            Some(self.list_mounted_partitions()?)
        };
        let blocking = unsafe_partitions(device, report, mounts_after.as_ref(), self.opts.naming);
        if !blocking.is_empty() {
            return Err(GateError::UnsafeToFlash {
                partitions: blocking,
            });
        }
        Ok(FlashClearance {
            device: device.to_string(),
        })
    }

    /// Recapture the mount table, unmount everything under `device` and run
    /// the safety check. Ctrl+C during the pass aborts before any flash.
    pub fn prepare(&self, device: &str, cancel: &CancelToken) -> GateResult<FlashClearance> {
        let mounts = self.list_mounted_partitions()?;
        let report = self.unmount_partitions(device, &mounts);
        cancel.checkpoint()?;
        if !report.unmounted.is_empty() {
            info!(
                "✅ Unmounted: {}",
                report.unmounted.iter().cloned().collect::<Vec<_>>().join(", ")
            );
        }
        self.check_safe(device, &report)
    }

    /// Hand the image to the flashing tool.
    ///
    /// A pending interrupt stops the flash before it starts. An interrupt
    /// while the tool runs is never reported as success; the partially
    /// written device is left as-is.
    pub fn confirm_and_flash(
        &self,
        target: &FlashTarget,
        clearance: FlashClearance,
        cancel: &CancelToken,
    ) -> GateResult<()> {
        if clearance.device() != target.device.path {
            return Err(GateError::InvalidTarget(format!(
                "clearance was issued for {}, not {}",
                clearance.device(),
                target.device.path
            )));
        }

        cancel.checkpoint()?;
        let opts = FlashOptions::new(self.opts.dry_run, true);
        let result = self.hal.bmap_copy(
            &target.image.image,
            &target.image.bmap,
            &target.device.path,
            &opts,
        );
        cancel.checkpoint()?;

        result.map_err(|err| match err {
            HalError::Interrupted(_) => GateError::Interrupted,
            HalError::CommandFailed { stderr, code, .. } if stderr.trim().is_empty() => {
                GateError::FlashFailure {
                    reason: format!("flashing tool exited with status {:?}", code),
                }
            }
            HalError::CommandFailed { stderr, .. } => GateError::FlashFailure { reason: stderr },
            other => GateError::FlashFailure {
                reason: other.to_string(),
            },
        })
    }
}
