//! Board bring-up helpers.
//!
//! Two interactive sessions share this crate: `download` copies an image set
//! from the build host over scp, and `flash` writes a bmap image to a block
//! device after the [`gate::DeviceSafetyGate`] has unmounted every partition
//! of it.

pub mod cli;
pub mod config;
pub mod download;
pub mod flash;
pub mod gate;
pub mod images;
pub mod logging;
pub mod size;
pub mod ui;

use anyhow::Context;
use bringup_hal::LinuxHal;
use clap::Parser;
use cli::{Cli, Command, DeviceArgs};
use config::{DownloaderConfig, FlashSettings};
use gate::{DeviceSafetyGate, GateOptions};
use ui::cancel::{install_ctrlc_handler, CancelToken};
use ui::prompt::TerminalOperator;

fn gate_options(device: &DeviceArgs, dry_run: bool) -> GateOptions {
    GateOptions {
        naming: device.naming,
        exclude_virtual: !device.include_virtual,
        dry_run,
    }
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_with(cli.log_file.as_deref(), cli.verbose);

    let cancel = CancelToken::new();
    install_ctrlc_handler(cancel.clone())?;

    if cli.dry_run {
        log::info!("DRY RUN: no device or file will be modified");
    }

    match &cli.command {
        Command::Flash {
            directories_file,
            device,
            flash_tool,
        } => {
            ui::ensure_interactive_terminal()?;
            let path = directories_file
                .clone()
                .unwrap_or_else(config::default_directories_file);
            let settings = FlashSettings {
                directories: config::read_directories(&path)
                    .context("Failed to load image directories")?,
                gate: gate_options(device, cli.dry_run),
            };
            let hal = LinuxHal::with_flash_tool(flash_tool);
            let mut operator = TerminalOperator::new();
            flash::run(&hal, &mut operator, &settings, &cancel)?;
        }
        Command::Download { config } => {
            ui::ensure_interactive_terminal()?;
            let cfg = DownloaderConfig::load(config)?;
            let hal = LinuxHal::new();
            let mut operator = TerminalOperator::new();
            download::run(&hal, &mut operator, &cfg, &cancel, cli.dry_run)?;
        }
        Command::Devices { device } => {
            let hal = LinuxHal::new();
            let gate = DeviceSafetyGate::new(&hal, gate_options(device, cli.dry_run));
            for line in flash::device_report(&gate)? {
                println!("{}", line);
            }
        }
    }
    Ok(())
}
