//! Input validation guard rails for the flash target.

use crate::images::ImagePair;
use std::path::Path;

pub fn validate_device_path(device: &str) -> Result<(), String> {
    let trimmed = device.trim();
    if trimmed.is_empty() {
        return Err("Device path is required.".to_string());
    }
    if !trimmed.starts_with("/dev/") {
        return Err(format!("Device must start with /dev/: {}", trimmed));
    }
    if trimmed.chars().any(|c| c.is_whitespace()) {
        return Err("Device path must not contain whitespace.".to_string());
    }
    Ok(())
}

pub fn validate_image_path(path: &Path) -> Result<(), String> {
    if path.as_os_str().is_empty() {
        return Err("Image path is required.".to_string());
    }
    if !path.exists() {
        return Err(format!("Image file not found: {}", path.display()));
    }
    if !path.is_file() {
        return Err(format!("Image path is not a file: {}", path.display()));
    }
    Ok(())
}

/// Both halves of the pair must be present before anything is unmounted.
pub fn validate_image_pair(pair: &ImagePair) -> Result<(), String> {
    validate_image_path(&pair.image)?;
    validate_image_path(&pair.bmap)
        .map_err(|e| format!("{} (block map for {})", e, pair.image.display()))
}
