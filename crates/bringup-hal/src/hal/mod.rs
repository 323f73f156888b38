//! HAL trait definitions and implementations.
//!
//! This module defines the core traits for system operations and provides
//! both real (LinuxHal) and fake (FakeHal) implementations.

pub mod device_ops;
pub mod fake_hal;
pub mod flash_ops;
pub mod linux_hal;
pub mod mount_ops;
pub mod remote_ops;

pub use device_ops::DeviceOps;
pub use fake_hal::{FakeHal, Operation};
pub use flash_ops::{FlashOps, FlashOptions};
pub use linux_hal::LinuxHal;
pub use mount_ops::MountOps;
pub use remote_ops::RemoteOps;

/// Complete HAL combining all system operation traits.
pub trait SystemHal: DeviceOps + MountOps + FlashOps + RemoteOps + Send + Sync {}

/// Automatically implement SystemHal for any type implementing all required traits.
impl<T> SystemHal for T where T: DeviceOps + MountOps + FlashOps + RemoteOps + Send + Sync {}
