//! CLI argument parsing for bringup

use bringup_hal::DeviceNaming;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bringup")]
#[command(version, about = "🛠️ Board bring-up helpers: fetch images and flash them safely")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log what would happen without unmounting, flashing or copying
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Append log output to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// How devices are chosen and matched to their partitions.
#[derive(Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Partition matching rule: `prefix` (plain name prefix) or `kernel`
    #[arg(long, default_value = "prefix")]
    pub naming: DeviceNaming,

    /// Also offer loop, ram, dm and optical devices
    #[arg(long)]
    pub include_virtual: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 💾 Flash a bmap image to a block device
    Flash {
        /// File listing image directories, one per line
        #[arg(long)]
        directories_file: Option<PathBuf>,

        #[command(flatten)]
        device: DeviceArgs,

        /// Flashing tool to invoke
        #[arg(long, default_value = "bmaptool")]
        flash_tool: PathBuf,
    },

    /// ⬇️ Copy an image set from the build host
    Download {
        /// Downloader configuration (YAML)
        #[arg(long, default_value = crate::config::DEFAULT_DOWNLOAD_CONFIG)]
        config: PathBuf,
    },

    /// 🔍 List block devices and their mounted partitions
    Devices {
        #[command(flatten)]
        device: DeviceArgs,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flash_defaults() {
        let cli = Cli::try_parse_from(["bringup", "flash"]).unwrap();
        match cli.command {
            Command::Flash {
                directories_file,
                device,
                flash_tool,
            } => {
                assert!(directories_file.is_none());
                assert_eq!(device.naming, DeviceNaming::Prefix);
                assert!(!device.include_virtual);
                assert_eq!(flash_tool, PathBuf::from("bmaptool"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(!cli.dry_run);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["bringup", "devices", "--naming", "kernel", "--dry-run", "-v"])
                .unwrap();
        assert!(cli.dry_run);
        assert!(cli.verbose);
        match cli.command {
            Command::Devices { device } => assert_eq!(device.naming, DeviceNaming::Kernel),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn bad_naming_is_rejected() {
        assert!(Cli::try_parse_from(["bringup", "devices", "--naming", "fuzzy"]).is_err());
    }

    #[test]
    fn download_config_default() {
        let cli = Cli::try_parse_from(["bringup", "download"]).unwrap();
        match cli.command {
            Command::Download { config } => {
                assert_eq!(config, PathBuf::from("phyboard_image.yaml"))
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
