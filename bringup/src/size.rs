//! Human-readable byte counts.

const KB: f64 = 1024.0;
const MB: f64 = KB * 1024.0;
const GB: f64 = MB * 1024.0;

pub fn human_size(bytes: u64) -> String {
    let value = bytes as f64;
    if value >= GB {
        format!("{:.1} GiB", value / GB)
    } else if value >= MB {
        format!("{:.1} MiB", value / MB)
    } else if value >= KB {
        format!("{:.1} KiB", value / KB)
    } else {
        format!("{} B", bytes)
    }
}

/// Bytes as fractional mebibytes, for transfer reports.
pub fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / MB
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_size_formats_bytes() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(1023), "1023 B");
    }

    #[test]
    fn human_size_formats_kb() {
        assert_eq!(human_size(1024), "1.0 KiB");
        assert_eq!(human_size(1536), "1.5 KiB");
    }

    #[test]
    fn human_size_formats_mb() {
        assert_eq!(human_size(512 * 1024 * 1024), "512.0 MiB");
    }

    #[test]
    fn human_size_formats_gb() {
        assert_eq!(human_size(32 * 1024 * 1024 * 1024), "32.0 GiB");
    }

    #[test]
    fn megabytes_is_binary() {
        assert_eq!(megabytes(3 * 1024 * 1024), 3.0);
    }
}
