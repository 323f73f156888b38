//! Parsing helpers for `/proc/self/mountinfo` (and similar mountinfo files).

use crate::block::MountTable;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    pub mount_point: PathBuf,
    pub fstype: String,
    pub source: String,
}

pub fn parse_mountinfo(content: &str) -> Vec<MountInfo> {
    content
        .lines()
        .filter_map(|line| {
            // mountinfo format:
            //   <pre fields...> <mount point> <...> - <fstype> <source> <superopts>
            let (pre, post) = line.split_once(" - ")?;
            let pre_fields: Vec<&str> = pre.split_whitespace().collect();
            if pre_fields.len() < 5 {
                return None;
            }
            let mut post_fields = post.split_whitespace();
            let fstype = post_fields.next()?.to_string();
            let source = unescape_mount_path(post_fields.next()?);
            Some(MountInfo {
                mount_point: PathBuf::from(unescape_mount_path(pre_fields[4])),
                fstype,
                source,
            })
        })
        .collect()
}

/// Build the device -> mount point table from mountinfo content.
///
/// Only `/dev/...` sources are kept. When a device is mounted more than once the
/// first mount in kernel order wins.
pub fn mount_table(content: &str) -> MountTable {
    let mut table = MountTable::new();
    for entry in parse_mountinfo(content) {
        if !entry.source.starts_with("/dev/") {
            continue;
        }
        table.entry(entry.source).or_insert(entry.mount_point);
    }
    table
}

/// Every mount point backed by `source`, deepest first.
pub fn mount_points_for_source(content: &str, source: &str) -> Vec<PathBuf> {
    let mut points: Vec<PathBuf> = parse_mountinfo(content)
        .into_iter()
        .filter(|entry| entry.source == source)
        .map(|entry| entry.mount_point)
        .collect();
    points.sort_by_key(|p| std::cmp::Reverse(p.components().count()));
    points.dedup();
    points
}

pub fn unescape_mount_path(raw: &str) -> String {
    raw.replace("\\040", " ")
        .replace("\\011", "\t")
        .replace("\\012", "\n")
        .replace("\\134", "\\")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
22 1 8:2 / / rw,relatime - ext4 /dev/sda2 rw
23 22 0:21 / /proc rw,nosuid - proc proc rw
40 22 8:17 / /media/boot rw,relatime - vfat /dev/sdb1 rw
41 22 8:18 / /media/root rw,relatime - ext4 /dev/sdb2 rw
42 22 8:17 / /mnt/again rw,relatime - vfat /dev/sdb1 rw
";

    #[test]
    fn parse_mountinfo_extracts_source_and_mountpoint() {
        let entries = parse_mountinfo(SAMPLE);
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].mount_point, PathBuf::from("/"));
        assert_eq!(entries[0].source, "/dev/sda2");
        assert_eq!(entries[0].fstype, "ext4");
    }

    #[test]
    fn mount_table_keeps_device_sources_only() {
        let table = mount_table(SAMPLE);
        assert_eq!(table.len(), 3);
        assert!(!table.contains_key("proc"));
        assert_eq!(table["/dev/sdb2"], PathBuf::from("/media/root"));
    }

    #[test]
    fn mount_table_keeps_first_mount_of_a_source() {
        let table = mount_table(SAMPLE);
        assert_eq!(table["/dev/sdb1"], PathBuf::from("/media/boot"));
    }

    #[test]
    fn mount_points_for_source_returns_all_mounts() {
        let points = mount_points_for_source(SAMPLE, "/dev/sdb1");
        assert_eq!(points.len(), 2);
        assert!(points.contains(&PathBuf::from("/media/boot")));
        assert!(points.contains(&PathBuf::from("/mnt/again")));
        assert!(mount_points_for_source(SAMPLE, "/dev/sdc1").is_empty());
    }

    #[test]
    fn mountinfo_unescapes_paths() {
        let sample = "36 28 0:31 / /media/BOOT\\040A rw,relatime - vfat /dev/sdb1 rw\n";
        let table = mount_table(sample);
        assert_eq!(table["/dev/sdb1"], PathBuf::from("/media/BOOT A"));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let sample = "garbage\n36 28 0:31 / - ext4\n";
        assert!(parse_mountinfo(sample).is_empty());
    }
}
