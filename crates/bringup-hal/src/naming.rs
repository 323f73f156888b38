//! Parent-device relation between partitions and whole devices.

use std::fmt;
use std::str::FromStr;

/// Kernel device families whose partitions carry a `p` separator
/// (`nvme0n1p2`, `mmcblk0p1`).
const P_SEPARATED: &[&str] = &["nvme", "mmcblk", "loop", "nbd"];

/// How a partition identifier is matched against its parent device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceNaming {
    /// Plain string prefix: `/dev/sdb1` and `/dev/sdb` both belong to `/dev/sdb`.
    #[default]
    Prefix,
    /// Kernel partition naming: `<disk><N>` or `<disk>p<N>` for disks whose
    /// names end in a digit. `/dev/sdbb1` does not belong to `/dev/sdb`.
    Kernel,
}

impl DeviceNaming {
    pub fn is_partition_of(self, partition: &str, device: &str) -> bool {
        match self {
            DeviceNaming::Prefix => partition.starts_with(device),
            DeviceNaming::Kernel => {
                partition == device || parent_device(partition).as_deref() == Some(device)
            }
        }
    }
}

impl fmt::Display for DeviceNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceNaming::Prefix => f.write_str("prefix"),
            DeviceNaming::Kernel => f.write_str("kernel"),
        }
    }
}

impl FromStr for DeviceNaming {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prefix" => Ok(DeviceNaming::Prefix),
            "kernel" => Ok(DeviceNaming::Kernel),
            other => Err(format!("unknown device naming convention: {other}")),
        }
    }
}

/// Strip the partition suffix from a `/dev/...` partition path.
///
/// Returns `None` when the path has no partition suffix (or is not under `/dev/`).
pub fn parent_device(partition: &str) -> Option<String> {
    let name = partition.strip_prefix("/dev/")?;
    let base = if P_SEPARATED.iter().any(|p| name.starts_with(p)) {
        let idx = name.rfind('p')?;
        let suffix = &name[idx + 1..];
        let disk = &name[..idx];
        if suffix.is_empty()
            || !suffix.chars().all(|c| c.is_ascii_digit())
            || !disk.ends_with(|c: char| c.is_ascii_digit())
        {
            return None;
        }
        disk
    } else {
        let trimmed = name.trim_end_matches(|c: char| c.is_ascii_digit());
        if trimmed.is_empty() || trimmed.len() == name.len() {
            return None;
        }
        trimmed
    };
    Some(format!("/dev/{}", base))
}
