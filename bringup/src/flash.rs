//! Interactive flash session: pick an image, pick a device, clear it, flash it.

use crate::config::FlashSettings;
use crate::gate::{DeviceAnnotation, DeviceSafetyGate, FlashTarget};
use crate::images::{list_bmap_files, ImagePair};
use crate::size::human_size;
use crate::ui::cancel::CancelToken;
use crate::ui::confirm::confirm_and_run_with;
use crate::ui::prompt::{Operator, Selection};
use crate::ui::style::{self, emoji};
use crate::ui::validation::{validate_device_path, validate_image_pair};
use bringup_error::{GateError, GateResult};
use bringup_hal::{BlockDevice, SystemHal};
use log::info;

/// Menu entry for a device, e.g. `/dev/sdb [29.7 GiB SD Reader] * (Mounted: /dev/sdb1:/media/boot)`.
pub fn device_menu_label(device: &BlockDevice, annotation: &DeviceAnnotation) -> String {
    let mut details = vec![human_size(device.size_bytes)];
    if let Some(model) = &device.model {
        details.push(model.clone());
    }
    let mut label = format!("{} [{}]", device.path, details.join(" "));
    if annotation.is_mounted {
        let mounts: Vec<String> = annotation
            .partitions
            .iter()
            .map(|(part, mnt)| format!("{}:{}", part, mnt.display()))
            .collect();
        label.push_str(&format!(" * (Mounted: {})", mounts.join(", ")));
    }
    label
}

pub fn image_menu_label(pair: &ImagePair) -> String {
    let name = pair
        .bmap
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| pair.bmap.display().to_string());
    format!("{} {}", name, style::size_hint(&pair.image_size_label()))
}

/// Annotated device listing, one line per device.
pub fn device_report<H: SystemHal + ?Sized>(gate: &DeviceSafetyGate<'_, H>) -> GateResult<Vec<String>> {
    let devices = gate.list_devices()?;
    let mounts = gate.list_mounted_partitions()?;
    Ok(devices
        .iter()
        .map(|device| device_menu_label(device, &gate.annotate(&device.path, &mounts)))
        .collect())
}

fn select_image<O: Operator + ?Sized>(
    operator: &mut O,
    settings: &FlashSettings,
) -> GateResult<ImagePair> {
    if settings.directories.is_empty() {
        return Err(GateError::EmptySelection {
            what: "image directories",
        });
    }
    let dir_menu = Selection::new(
        "Select a directory:",
        settings
            .directories
            .iter()
            .map(|d| d.display().to_string())
            .collect(),
        "Enter the number of the directory",
    );
    let directory = &settings.directories[operator.select(&dir_menu)?];

    let bmaps = list_bmap_files(directory).map_err(|e| {
        GateError::InvalidTarget(format!("cannot read {}: {}", directory.display(), e))
    })?;
    if bmaps.is_empty() {
        return Err(GateError::EmptySelection { what: "bmap files" });
    }
    let pairs: Vec<ImagePair> = bmaps.into_iter().map(ImagePair::from_bmap).collect();
    let image_menu = Selection::new(
        format!("Select a bmap file from {}:", directory.display()),
        pairs.iter().map(image_menu_label).collect(),
        "Enter the number of the bmap file",
    );
    let choice = operator.select(&image_menu)?;
    Ok(pairs[choice].clone())
}

fn select_device<H: SystemHal + ?Sized, O: Operator + ?Sized>(
    gate: &DeviceSafetyGate<'_, H>,
    operator: &mut O,
) -> GateResult<BlockDevice> {
    let devices = gate.list_devices()?;
    if devices.is_empty() {
        return Err(GateError::EmptySelection {
            what: "block devices",
        });
    }
    let mounts = gate.list_mounted_partitions()?;
    let menu = Selection::new(
        "Available devices:",
        devices
            .iter()
            .map(|d| device_menu_label(d, &gate.annotate(&d.path, &mounts)))
            .collect(),
        "Enter the number of the device to flash",
    );
    let choice = operator.select(&menu)?;
    Ok(devices[choice].clone())
}

/// Run one flash session and return what was flashed.
///
/// Ctrl+C before the confirmation ends the process; after it the session
/// stops at the next checkpoint with [`GateError::Interrupted`].
pub fn run<H: SystemHal + ?Sized, O: Operator + ?Sized>(
    hal: &H,
    operator: &mut O,
    settings: &FlashSettings,
    cancel: &CancelToken,
) -> GateResult<FlashTarget> {
    let gate = DeviceSafetyGate::new(hal, settings.gate);

    let image = select_image(operator, settings)?;
    let device = select_device(&gate, operator)?;

    validate_image_pair(&image).map_err(GateError::InvalidTarget)?;
    validate_device_path(&device.path).map_err(GateError::InvalidTarget)?;

    let target = FlashTarget { device, image };
    let prompt = format!(
        "You are about to flash the image: {}\nTo the device: {}\nAre you sure?",
        target.image.image_name(),
        target.device.path
    );

    confirm_and_run_with(
        &prompt,
        |p| operator.confirm(p, true),
        || {
            cancel.arm();
            info!(
                "{}",
                style::with(emoji::DISK, &format!("Preparing {}", target.device.path))
            );
            let clearance = gate.prepare(&target.device.path, cancel)?;
            info!(
                "{}",
                style::with(
                    emoji::DISK,
                    &format!(
                        "Flashing {} to {}",
                        target.image.image.display(),
                        target.device.path
                    )
                )
            );
            gate.confirm_and_flash(&target, clearance, cancel)
        },
    )?;

    if settings.gate.dry_run {
        info!("{}", style::with(emoji::SUCCESS, "Dry run complete, nothing was written"));
    } else {
        info!("{}", style::with(emoji::PARTY, "Flashing complete!"));
    }
    Ok(target)
}
