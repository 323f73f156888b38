//! Hardware abstraction layer for bringup.
//!
//! Everything that touches the running system (block device inventory, the
//! mount table, unmounting, the bmap flashing tool, ssh/scp) goes through the
//! traits in [`hal`], so the safety gate and the interactive sessions can be
//! exercised against [`FakeHal`] without root privileges or real hardware.

pub mod block;
pub mod hal;
pub mod lsblk;
pub mod naming;
pub mod procfs;

pub use block::{BlockDevice, MountTable};
pub use bringup_error::{HalError, HalResult};
pub use hal::{
    DeviceOps, FakeHal, FlashOps, FlashOptions, LinuxHal, MountOps, Operation, RemoteOps,
    SystemHal,
};
pub use naming::DeviceNaming;
