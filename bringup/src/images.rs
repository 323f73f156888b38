//! Image/block-map pairs found in the image directories.

use crate::size::human_size;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const BMAP_SUFFIX: &str = ".bmap";
const IMAGE_SUFFIX: &str = ".xz";

/// A compressed image and its block-map sidecar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePair {
    pub image: PathBuf,
    pub bmap: PathBuf,
}

impl ImagePair {
    pub fn from_bmap(bmap: impl Into<PathBuf>) -> Self {
        let bmap = bmap.into();
        Self {
            image: image_for_bmap(&bmap),
            bmap,
        }
    }

    pub fn image_name(&self) -> String {
        self.image
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.image.display().to_string())
    }

    /// Size of the compressed image, or `None` when it is missing.
    pub fn image_size(&self) -> Option<u64> {
        fs::metadata(&self.image)
            .ok()
            .filter(|m| m.is_file())
            .map(|m| m.len())
    }

    pub fn image_size_label(&self) -> String {
        self.image_size()
            .map(human_size)
            .unwrap_or_else(|| "Unknown size".to_string())
    }
}

/// `core-image.wic.bmap` -> `core-image.wic.xz`.
pub fn image_for_bmap(bmap: &Path) -> PathBuf {
    let name = bmap.to_string_lossy();
    let stem = name.strip_suffix(BMAP_SUFFIX).unwrap_or(&name);
    PathBuf::from(format!("{}{}", stem, IMAGE_SUFFIX))
}

/// Block-map files directly inside `dir`, sorted by name.
pub fn list_bmap_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .is_some_and(|n| n.to_string_lossy().ends_with(BMAP_SUFFIX))
        })
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn image_for_bmap_swaps_suffix() {
        assert_eq!(
            image_for_bmap(Path::new("/srv/img/core-image.wic.bmap")),
            PathBuf::from("/srv/img/core-image.wic.xz")
        );
        assert_eq!(
            image_for_bmap(Path::new("/srv/img.bmap.d/core.wic.bmap")),
            PathBuf::from("/srv/img.bmap.d/core.wic.xz")
        );
    }

    #[test]
    fn list_bmap_files_filters_and_sorts() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.wic.bmap"), "").unwrap();
        fs::write(dir.path().join("a.wic.bmap"), "").unwrap();
        fs::write(dir.path().join("a.wic.xz"), "").unwrap();
        fs::create_dir(dir.path().join("nested.bmap")).unwrap();

        let files = list_bmap_files(dir.path()).unwrap();

        assert_eq!(
            files,
            vec![dir.path().join("a.wic.bmap"), dir.path().join("b.wic.bmap")]
        );
    }

    #[test]
    fn missing_image_has_unknown_size() {
        let dir = tempdir().unwrap();
        let pair = ImagePair::from_bmap(dir.path().join("core.wic.bmap"));
        assert_eq!(pair.image_size_label(), "Unknown size");

        fs::write(&pair.image, vec![0u8; 2048]).unwrap();
        assert_eq!(pair.image_size_label(), "2.0 KiB");
        assert_eq!(pair.image_name(), "core.wic.xz");
    }
}
