//! Remote host access (ssh/scp).

use crate::HalResult;
use std::path::Path;

/// Trait for querying and copying files on a remote build host.
pub trait RemoteOps {
    /// Size in bytes of `path` on `host`, following symlinks.
    ///
    /// `Ok(None)` means the remote side answered but the size is unknown.
    fn remote_file_size(&self, host: &str, path: &str) -> HalResult<Option<u64>>;

    /// Copy `host:source` to the local `destination`.
    fn remote_copy(&self, host: &str, source: &str, destination: &Path) -> HalResult<()>;
}

/// Quote `s` for a POSIX shell on the remote side.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_quote_wraps_and_escapes() {
        assert_eq!(shell_quote("/srv/images/a.wic"), "'/srv/images/a.wic'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }
}
