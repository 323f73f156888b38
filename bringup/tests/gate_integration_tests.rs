use bringup::gate::{DeviceSafetyGate, FlashTarget, GateOptions};
use bringup::images::ImagePair;
use bringup::ui::cancel::CancelToken;
use bringup_error::GateError;
use bringup_hal::{BlockDevice, DeviceNaming, FakeHal, MountOps};

fn target(device: &str) -> FlashTarget {
    FlashTarget {
        device: BlockDevice::new(device),
        image: ImagePair::from_bmap("/srv/images/core.wic.bmap"),
    }
}

#[test]
fn prepare_and_flash_selected_device() {
    let hal = FakeHal::new()
        .with_devices(&["/dev/sda", "/dev/sdb"])
        .with_mount("/dev/sdb1", "/media/boot")
        .with_mount("/dev/sdb2", "/media/root");
    let gate = DeviceSafetyGate::new(&hal, GateOptions::default());
    let cancel = CancelToken::new();

    let clearance = gate.prepare("/dev/sdb", &cancel).expect("clearance");
    assert_eq!(clearance.device(), "/dev/sdb");
    gate.confirm_and_flash(&target("/dev/sdb"), clearance, &cancel)
        .expect("flash");

    assert!(hal.mount_table().unwrap().is_empty());
    assert!(hal.flashed());
}

#[test]
fn kernel_naming_ignores_lookalike_devices() {
    let hal = FakeHal::new()
        .with_mount("/dev/sdb1", "/media/boot")
        .with_mount("/dev/sdbb1", "/media/other");
    let gate = DeviceSafetyGate::new(
        &hal,
        GateOptions {
            naming: DeviceNaming::Kernel,
            ..GateOptions::default()
        },
    );

    gate.prepare("/dev/sdb", &CancelToken::new()).expect("clearance");

    assert_eq!(hal.unmount_attempts("/dev/sdb1"), 1);
    assert_eq!(hal.unmount_attempts("/dev/sdbb1"), 0);
    assert!(hal.is_mounted("/dev/sdbb1"));
}

#[test]
fn mount_table_failure_is_an_enumeration_error() {
    let hal = FakeHal::new().with_mount_table_error("mountinfo unreadable");
    let gate = DeviceSafetyGate::new(&hal, GateOptions::default());

    let err = gate.prepare("/dev/sdb", &CancelToken::new()).unwrap_err();

    assert!(matches!(err, GateError::Enumeration { what: "mount table", .. }));
}

#[test]
fn interrupt_before_safety_check_stops_everything() {
    let hal = FakeHal::new().with_mount("/dev/sdb1", "/media/boot");
    let gate = DeviceSafetyGate::new(&hal, GateOptions::default());
    let cancel = CancelToken::new();
    cancel.arm();
    cancel.cancel();

    let err = gate.prepare("/dev/sdb", &cancel).unwrap_err();

    assert!(matches!(err, GateError::Interrupted));
    assert!(!hal.flashed());
}
