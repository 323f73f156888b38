use bringup::config::FlashSettings;
use bringup::flash;
use bringup::gate::GateOptions;
use bringup::ui::cancel::CancelToken;
use bringup::ui::prompt::ScriptedOperator;
use bringup_error::GateError;
use bringup_hal::{FakeHal, Operation};
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn image_dir() -> TempDir {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("core.wic.bmap"), "<bmap/>").expect("bmap");
    fs::write(dir.path().join("core.wic.xz"), vec![0u8; 4096]).expect("image");
    dir
}

fn settings(dir: &Path, dry_run: bool) -> FlashSettings {
    FlashSettings {
        directories: vec![dir.to_path_buf()],
        gate: GateOptions {
            dry_run,
            ..GateOptions::default()
        },
    }
}

fn board_hal() -> FakeHal {
    FakeHal::new()
        .with_devices(&["/dev/sda", "/dev/sdb"])
        .with_mount("/dev/sda2", "/")
        .with_mount("/dev/sdb1", "/media/boot")
        .with_mount("/dev/sdb2", "/media/root")
}

#[test]
fn flashes_after_unmounting_every_partition() {
    let dir = image_dir();
    let hal = board_hal();
    let mut operator = ScriptedOperator::new(["1", "1", "2", ""]);

    let target = flash::run(&hal, &mut operator, &settings(dir.path(), false), &CancelToken::new())
        .expect("flash session");

    assert_eq!(target.device.path, "/dev/sdb");
    assert_eq!(target.image.image, dir.path().join("core.wic.xz"));
    assert!(!hal.is_mounted("/dev/sdb1"));
    assert!(!hal.is_mounted("/dev/sdb2"));
    assert!(hal.is_mounted("/dev/sda2"));

    let ops = hal.operations();
    let flash_at = ops
        .iter()
        .position(|op| matches!(op, Operation::BmapCopy { .. }))
        .expect("flash recorded");
    let last_unmount = ops
        .iter()
        .rposition(|op| matches!(op, Operation::Unmount { .. }))
        .expect("unmount recorded");
    assert!(last_unmount < flash_at);
    assert_eq!(
        ops[flash_at],
        Operation::BmapCopy {
            image: dir.path().join("core.wic.xz"),
            bmap: dir.path().join("core.wic.bmap"),
            device: "/dev/sdb".to_string(),
        }
    );
}

#[test]
fn failed_unmount_blocks_the_flash() {
    let dir = image_dir();
    let hal = board_hal().with_failing_unmount("/dev/sdb2", "target is busy");
    let mut operator = ScriptedOperator::new(["1", "1", "2", "y"]);

    let err = flash::run(&hal, &mut operator, &settings(dir.path(), false), &CancelToken::new())
        .unwrap_err();

    match err {
        GateError::UnsafeToFlash { partitions } => {
            assert_eq!(partitions, vec!["/dev/sdb2".to_string()])
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!hal.flashed());
    assert_eq!(hal.unmount_attempts("/dev/sdb1"), 1);
    assert_eq!(hal.unmount_attempts("/dev/sdb2"), 1);
}

#[test]
fn invalid_menu_choice_touches_nothing() {
    let dir = image_dir();
    let hal = board_hal();
    let mut operator = ScriptedOperator::new(["0"]);

    let err = flash::run(&hal, &mut operator, &settings(dir.path(), false), &CancelToken::new())
        .unwrap_err();

    assert!(matches!(err, GateError::OperatorInput(_)));
    assert_eq!(hal.operation_count(), 0);
}

#[test]
fn declining_confirmation_aborts_before_unmount() {
    let dir = image_dir();
    let hal = board_hal();
    let mut operator = ScriptedOperator::new(["1", "1", "2", "n"]);

    let err = flash::run(&hal, &mut operator, &settings(dir.path(), false), &CancelToken::new())
        .unwrap_err();

    assert!(matches!(err, GateError::Aborted));
    assert!(!hal.has_operation(|op| matches!(op, Operation::Unmount { .. })));
    assert!(!hal.flashed());
    assert!(hal.is_mounted("/dev/sdb1"));
}

#[test]
fn dry_run_changes_nothing() {
    let dir = image_dir();
    let hal = board_hal();
    let mut operator = ScriptedOperator::new(["1", "1", "2", ""]);

    flash::run(&hal, &mut operator, &settings(dir.path(), true), &CancelToken::new())
        .expect("dry run");

    assert!(hal.is_mounted("/dev/sdb1"));
    assert!(!hal.flashed());
}

#[test]
fn missing_image_is_rejected_before_confirmation() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("core.wic.bmap"), "<bmap/>").expect("bmap");
    let hal = board_hal();
    let mut operator = ScriptedOperator::new(["1", "1", "2"]);

    let err = flash::run(&hal, &mut operator, &settings(dir.path(), false), &CancelToken::new())
        .unwrap_err();

    assert!(matches!(err, GateError::InvalidTarget(_)));
    assert_eq!(operator.questions().len(), 3);
}

#[test]
fn empty_inputs_are_reported() {
    let hal = board_hal();
    let mut operator = ScriptedOperator::new(Vec::<String>::new());
    let empty = FlashSettings {
        directories: Vec::new(),
        gate: GateOptions::default(),
    };
    assert!(matches!(
        flash::run(&hal, &mut operator, &empty, &CancelToken::new()),
        Err(GateError::EmptySelection { .. })
    ));

    let dir = tempdir().expect("tempdir");
    let mut operator = ScriptedOperator::new(["1"]);
    assert!(matches!(
        flash::run(&hal, &mut operator, &settings(dir.path(), false), &CancelToken::new()),
        Err(GateError::EmptySelection { what: "bmap files" })
    ));

    let images = image_dir();
    let no_devices = FakeHal::new();
    let mut operator = ScriptedOperator::new(["1", "1"]);
    assert!(matches!(
        flash::run(&no_devices, &mut operator, &settings(images.path(), false), &CancelToken::new()),
        Err(GateError::EmptySelection { what: "block devices" })
    ));
}

#[test]
fn device_menu_marks_mounted_devices() {
    let dir = image_dir();
    let hal = board_hal();
    let mut operator = ScriptedOperator::new(["1", "1", "1", "n"]);

    let _ = flash::run(&hal, &mut operator, &settings(dir.path(), false), &CancelToken::new());

    let menus = operator.menus();
    assert_eq!(menus.len(), 3);
    assert_eq!(menus[0].items, vec![dir.path().display().to_string()]);
    assert!(menus[1].items[0].starts_with("core.wic.bmap"));
    assert!(menus[2].items[0].contains("* (Mounted: /dev/sda2:/)"));
    assert!(menus[2].items[1]
        .contains("* (Mounted: /dev/sdb1:/media/boot, /dev/sdb2:/media/root)"));
}

#[test]
fn unrecognised_confirmation_stops_before_unmount() {
    let dir = image_dir();
    let hal = board_hal();
    let mut operator = ScriptedOperator::new(["1", "1", "2", "maybe"]);

    let err = flash::run(&hal, &mut operator, &settings(dir.path(), false), &CancelToken::new())
        .unwrap_err();

    assert!(matches!(err, GateError::OperatorInput(_)));
    assert!(!hal.has_operation(|op| matches!(op, Operation::Unmount { .. })));
    assert!(!hal.flashed());
}
