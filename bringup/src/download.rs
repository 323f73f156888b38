//! Interactive download session: copy an image set from the build host.
//!
//! Every file goes over scp on its own. A failed transfer is reported and
//! the session moves on; Ctrl+C removes the partial file and stops.

use crate::config::{DownloaderConfig, ImageConfig};
use crate::size::megabytes;
use crate::ui::cancel::CancelToken;
use crate::ui::prompt::{Operator, Selection};
use crate::ui::style::{self, emoji};
use anyhow::{Context, Result};
use bringup_error::{GateError, HalError};
use bringup_hal::RemoteOps;
use log::{debug, error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// A file that arrived intact.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub source: String,
    pub destination: PathBuf,
    pub size: u64,
    pub elapsed: Duration,
}

impl Transfer {
    pub fn megabytes_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            megabytes(self.size) / secs
        } else {
            0.0
        }
    }
}

#[derive(Debug, Default)]
pub struct DownloadSummary {
    pub completed: Vec<Transfer>,
    /// Remote source and the reason it failed.
    pub failed: Vec<(String, String)>,
    /// Transfers only logged because of dry-run.
    pub skipped: usize,
}

impl DownloadSummary {
    pub fn total_bytes(&self) -> u64 {
        self.completed.iter().map(|t| t.size).sum()
    }
}

/// `<base>-<suffix>.<ext>`, or `<base>.<ext>` when the suffix is blank.
pub fn destination_filename(base: &str, suffix: &str, extension: &str) -> String {
    let suffix = suffix.trim();
    if suffix.is_empty() {
        format!("{}.{}", base, extension)
    } else {
        format!("{}-{}.{}", base, suffix, extension)
    }
}

pub fn remote_source(source_dir: &str, file: &str) -> String {
    format!("{}/{}", source_dir.trim_end_matches('/'), file)
}

/// Create the TFTP directory if needed and open it up to everyone.
pub fn ensure_tftp_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create TFTP directory {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o777))
            .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
    }
    Ok(())
}

fn remove_partial(path: &Path) {
    if path.exists() {
        match fs::remove_file(path) {
            Ok(()) => info!(
                "{}",
                style::with(emoji::CLEANUP, &format!("Removed partial file {}", path.display()))
            ),
            Err(e) => warn!("Could not remove partial file {}: {}", path.display(), e),
        }
    }
}

/// Copy one file from `host`, verifying it arrived non-empty.
///
/// Returns [`GateError::Interrupted`] (inside the `anyhow::Error`) when the
/// copy was cut short by Ctrl+C; the partial file is removed first.
pub fn copy_file<R: RemoteOps + ?Sized>(
    remote: &R,
    host: &str,
    source: &str,
    destination: &Path,
    cancel: &CancelToken,
) -> Result<Transfer> {
    let expected = match remote.remote_file_size(host, source) {
        Ok(size) => size.unwrap_or(0),
        Err(e) => {
            debug!("Size query for {}:{} failed: {}", host, source, e);
            0
        }
    };
    if expected > 0 {
        info!(
            "{}",
            style::with(
                emoji::DOWNLOAD,
                &format!("Copying {} ({:.2} MB)", source, megabytes(expected))
            )
        );
    } else {
        info!(
            "{}",
            style::with(emoji::DOWNLOAD, &format!("Copying {} (size unknown)", source))
        );
    }

    let started = Instant::now();
    let result = remote.remote_copy(host, source, destination);
    let elapsed = started.elapsed();

    if cancel.is_cancelled() || matches!(result, Err(HalError::Interrupted(_))) {
        remove_partial(destination);
        return Err(GateError::Interrupted.into());
    }
    if let Err(err) = result {
        let detail = match err {
            HalError::CommandFailed { stderr, code, .. } if !stderr.trim().is_empty() => {
                format!("scp exited with {:?}: {}", code, stderr.trim())
            }
            other => other.to_string(),
        };
        anyhow::bail!("Failed to copy {}: {}", source, detail);
    }

    let size = fs::metadata(destination)
        .map(|m| m.len())
        .with_context(|| format!("Copied file is missing: {}", destination.display()))?;
    if size == 0 {
        anyhow::bail!("Copied file is empty: {}", destination.display());
    }

    let transfer = Transfer {
        source: source.to_string(),
        destination: destination.to_path_buf(),
        size,
        elapsed,
    };
    info!(
        "{}",
        style::with(
            emoji::SUCCESS,
            &format!(
                "{}: {:.2} MB in {:.1}s ({:.2} MB/s)",
                destination.display(),
                megabytes(size),
                elapsed.as_secs_f64(),
                transfer.megabytes_per_second()
            )
        )
    );
    Ok(transfer)
}

/// Every (remote source, local destination) pair for one image set.
pub fn planned_transfers(
    config: &DownloaderConfig,
    image: &ImageConfig,
    suffix: &str,
) -> Vec<(String, PathBuf)> {
    let system = &config.system_config;
    let images = system.image_extensions.iter().map(|ext| {
        (
            remote_source(&image.source_path, &format!("{}.{}", image.base_filename, ext)),
            image
                .destination_path
                .join(destination_filename(&image.base_filename, suffix, ext)),
        )
    });
    let tftp = system.tftp_files.iter().map(|file| {
        (
            remote_source(&image.source_path, file),
            system.tftp_path.join(file),
        )
    });
    images.chain(tftp).collect()
}

/// Copy every file of `image`. Only an interrupt stops the loop early.
pub fn download_images<R: RemoteOps + ?Sized>(
    remote: &R,
    config: &DownloaderConfig,
    image: &ImageConfig,
    suffix: &str,
    cancel: &CancelToken,
    dry_run: bool,
) -> Result<DownloadSummary> {
    let host = &config.system_config.remote_host;
    let mut summary = DownloadSummary::default();

    for (source, destination) in planned_transfers(config, image, suffix) {
        if dry_run {
            info!(
                "DRY RUN: would copy {}:{} -> {}",
                host,
                source,
                destination.display()
            );
            summary.skipped += 1;
            continue;
        }
        cancel.checkpoint()?;
        match copy_file(remote, host, &source, &destination, cancel) {
            Ok(transfer) => summary.completed.push(transfer),
            Err(err) if matches!(err.downcast_ref::<GateError>(), Some(GateError::Interrupted)) => {
                return Err(err);
            }
            Err(err) => {
                error!("{}", style::with(emoji::ERROR, &format!("{:#}", err)));
                summary.failed.push((source, format!("{:#}", err)));
            }
        }
    }
    Ok(summary)
}

fn describe(image: &ImageConfig) -> String {
    format!(
        "{}\n   Source: {}\n   Base filename: {}\n   Destination: {}",
        image.description,
        image.source_path,
        image.base_filename,
        image.destination_path.display()
    )
}

/// Run one download session. Fails when any transfer failed.
pub fn run<R: RemoteOps + ?Sized, O: Operator + ?Sized>(
    remote: &R,
    operator: &mut O,
    config: &DownloaderConfig,
    cancel: &CancelToken,
    dry_run: bool,
) -> Result<DownloadSummary> {
    if config.image_configs.is_empty() {
        return Err(GateError::EmptySelection {
            what: "image configurations",
        }
        .into());
    }

    let menu = Selection::new(
        "Available configurations:",
        config.image_configs.iter().map(describe).collect(),
        "Select configuration number",
    );
    let image = &config.image_configs[operator.select(&menu)?];
    let suffix = operator.text("Enter a name suffix (leave empty for none)")?;

    if dry_run {
        info!(
            "DRY RUN: would create {} and {}",
            image.destination_path.display(),
            config.system_config.tftp_path.display()
        );
    } else {
        fs::create_dir_all(&image.destination_path).with_context(|| {
            format!(
                "Failed to create destination {}",
                image.destination_path.display()
            )
        })?;
        ensure_tftp_dir(&config.system_config.tftp_path)?;
    }

    cancel.arm();
    let summary = download_images(remote, config, image, &suffix, cancel, dry_run)?;

    println!("{}", style::separator());
    println!(
        "{}",
        style::with(
            emoji::SEARCH,
            &format!(
                "{} copied ({:.2} MB), {} failed, {} skipped",
                summary.completed.len(),
                megabytes(summary.total_bytes()),
                summary.failed.len(),
                summary.skipped
            )
        )
    );
    for (source, reason) in &summary.failed {
        println!("   {} {}: {}", emoji::ERROR, source, reason);
    }

    if !summary.failed.is_empty() {
        anyhow::bail!("{} of the transfers failed", summary.failed.len());
    }
    Ok(summary)
}
