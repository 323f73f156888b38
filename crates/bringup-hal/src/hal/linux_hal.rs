//! Linux HAL implementation using real system calls and tools.

use super::remote_ops::shell_quote;
use super::{DeviceOps, FlashOps, FlashOptions, MountOps, RemoteOps};
use crate::procfs::mountinfo;
use crate::{lsblk, BlockDevice, HalError, HalResult, MountTable};
use std::collections::VecDeque;
use std::fs;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

const MOUNTINFO: &str = "/proc/self/mountinfo";
const DEFAULT_FLASH_TOOL: &str = "bmaptool";

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const REMOTE_PROBE_TIMEOUT: Duration = Duration::from_secs(30);
const COPY_TIMEOUT: Duration = Duration::from_secs(6 * 60 * 60);
const FLASH_TIMEOUT: Duration = Duration::from_secs(4 * 60 * 60);

/// Lines of flashing tool stderr kept for the failure reason.
const STDERR_TAIL_LINES: usize = 20;

/// Real HAL implementation for Linux systems.
#[derive(Debug, Clone)]
pub struct LinuxHal {
    flash_tool: PathBuf,
}

impl Default for LinuxHal {
    fn default() -> Self {
        Self::new()
    }
}

impl LinuxHal {
    pub fn new() -> Self {
        Self {
            flash_tool: PathBuf::from(DEFAULT_FLASH_TOOL),
        }
    }

    pub fn with_flash_tool(flash_tool: impl Into<PathBuf>) -> Self {
        Self {
            flash_tool: flash_tool.into(),
        }
    }
}

fn map_command_err(program: &str, err: io::Error) -> HalError {
    if err.kind() == io::ErrorKind::NotFound {
        return HalError::CommandNotFound(program.to_string());
    }
    HalError::Io(err)
}

fn output_failed(program: &str, output: &Output) -> HalError {
    if let Some(err) = killed_by_signal(program, &output.status) {
        return err;
    }
    HalError::CommandFailed {
        program: program.to_string(),
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

#[cfg(unix)]
fn killed_by_signal(program: &str, status: &ExitStatus) -> Option<HalError> {
    use std::os::unix::process::ExitStatusExt;
    status
        .signal()
        .map(|sig| HalError::Interrupted(format!("{program} terminated by signal {sig}")))
}

#[cfg(not(unix))]
fn killed_by_signal(_program: &str, _status: &ExitStatus) -> Option<HalError> {
    None
}

fn output_with_timeout(program: &str, cmd: &mut Command, timeout: Duration) -> HalResult<Output> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    log::debug!("exec: {:?}", cmd);
    let mut child = cmd.spawn().map_err(|e| map_command_err(program, e))?;

    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();

    // Drain pipes concurrently to avoid deadlocks on large output.
    let stdout_handle = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout.take() {
            let _ = out.read_to_end(&mut buf);
        }
        buf
    });
    let stderr_handle = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr.take() {
            let _ = err.read_to_end(&mut buf);
        }
        buf
    });

    let status = match child.wait_timeout(timeout).map_err(HalError::Io)? {
        Some(status) => status,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            let _ = stdout_handle.join();
            let _ = stderr_handle.join();
            return Err(HalError::CommandTimeout {
                program: program.to_string(),
                timeout_secs: timeout.as_secs(),
            });
        }
    };

    let stdout = stdout_handle.join().unwrap_or_default();
    let stderr = stderr_handle.join().unwrap_or_default();
    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

/// Run `cmd` with stdout inherited and stderr mirrored to ours, returning the
/// last lines of stderr for error reporting.
fn passthrough_with_timeout(
    program: &str,
    cmd: &mut Command,
    timeout: Duration,
) -> HalResult<(ExitStatus, String)> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped());
    log::debug!("exec: {:?}", cmd);
    let mut child = cmd.spawn().map_err(|e| map_command_err(program, e))?;

    let stderr = child.stderr.take();
    let stderr_handle = std::thread::spawn(move || {
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES + 1);
        if let Some(err) = stderr {
            for line in BufReader::new(err).lines().map_while(Result::ok) {
                let mut console = io::stderr().lock();
                let _ = writeln!(console, "{}", line);
                tail.push_back(line);
                if tail.len() > STDERR_TAIL_LINES {
                    tail.pop_front();
                }
            }
        }
        Vec::from(tail).join("\n")
    });

    let status = match child.wait_timeout(timeout).map_err(HalError::Io)? {
        Some(status) => status,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            let _ = stderr_handle.join();
            return Err(HalError::CommandTimeout {
                program: program.to_string(),
                timeout_secs: timeout.as_secs(),
            });
        }
    };

    let tail = stderr_handle.join().unwrap_or_default();
    Ok((status, tail))
}

fn map_nix_err(err: nix::errno::Errno) -> HalError {
    use nix::errno::Errno;
    match err {
        Errno::EBUSY => HalError::DiskBusy,
        Errno::EACCES | Errno::EPERM => HalError::PermissionDenied,
        other => HalError::Nix(other),
    }
}

impl DeviceOps for LinuxHal {
    fn list_block_devices(&self, exclude_virtual: bool) -> HalResult<Vec<BlockDevice>> {
        let mut cmd = Command::new("lsblk");
        cmd.args(lsblk::lsblk_args(exclude_virtual));
        let output = output_with_timeout("lsblk", &mut cmd, PROBE_TIMEOUT)?;

        if !output.status.success() {
            return Err(output_failed("lsblk", &output));
        }

        lsblk::parse_lsblk_output(&output.stdout, exclude_virtual)
            .map_err(|e| HalError::Parse(format!("lsblk output: {e}")))
    }
}

impl MountOps for LinuxHal {
    fn mount_table(&self) -> HalResult<MountTable> {
        let content = fs::read_to_string(MOUNTINFO)?;
        Ok(mountinfo::mount_table(&content))
    }

    fn unmount_partition(&self, partition: &str, dry_run: bool) -> HalResult<()> {
        let content = fs::read_to_string(MOUNTINFO)?;
        let points = mountinfo::mount_points_for_source(&content, partition);

        if points.is_empty() {
            log::debug!("{} is not mounted", partition);
            return Ok(());
        }

        for mp in points {
            if dry_run {
                log::info!("DRY RUN: unmount {} ({})", mp.display(), partition);
                continue;
            }
            log::info!("Unmounting {} ({})", mp.display(), partition);
            match nix::mount::umount2(&mp, nix::mount::MntFlags::empty()) {
                Ok(()) => {}
                // Already gone (raced with an automounter or a stacked mount).
                Err(nix::errno::Errno::EINVAL) | Err(nix::errno::Errno::ENOENT) => {}
                Err(err) => return Err(map_nix_err(err)),
            }
        }

        Ok(())
    }
}

impl FlashOps for LinuxHal {
    fn bmap_copy(
        &self,
        image: &Path,
        bmap: &Path,
        device: &str,
        opts: &FlashOptions,
    ) -> HalResult<()> {
        let program = self.flash_tool.display().to_string();

        if opts.dry_run {
            log::info!(
                "DRY RUN: {} copy --bmap {} {} {}",
                program,
                bmap.display(),
                image.display(),
                device
            );
            return Ok(());
        }

        if !opts.confirmed {
            return Err(HalError::SafetyLock);
        }

        log::info!("💾 Flashing image {} -> {}", image.display(), device);

        let mut cmd = Command::new(&self.flash_tool);
        cmd.arg("copy").arg("--bmap").arg(bmap).arg(image).arg(device);
        let (status, stderr) = passthrough_with_timeout(&program, &mut cmd, FLASH_TIMEOUT)?;

        if let Some(err) = killed_by_signal(&program, &status) {
            return Err(err);
        }
        if !status.success() {
            return Err(HalError::CommandFailed {
                program,
                code: status.code(),
                stderr,
            });
        }

        Ok(())
    }
}

impl RemoteOps for LinuxHal {
    fn remote_file_size(&self, host: &str, path: &str) -> HalResult<Option<u64>> {
        let quoted = shell_quote(path);
        let mut cmd = Command::new("ssh");
        cmd.arg(host)
            .arg(format!("ls -L -l {} | awk '{{print $5}}'", quoted));
        let output = output_with_timeout("ssh", &mut cmd, REMOTE_PROBE_TIMEOUT)?;

        if output.status.success() {
            let size = String::from_utf8_lossy(&output.stdout).trim().to_string();
            return match size.parse::<u64>() {
                Ok(v) => Ok(Some(v)),
                Err(_) => {
                    log::debug!("could not parse remote size {:?} for {}", size, path);
                    Ok(None)
                }
            };
        }

        // Report where a dangling symlink points, then carry on without a size.
        let mut cmd = Command::new("ssh");
        cmd.arg(host).arg(format!("readlink -f {}", quoted));
        if let Ok(link) = output_with_timeout("ssh", &mut cmd, REMOTE_PROBE_TIMEOUT) {
            if link.status.success() {
                log::debug!(
                    "{} resolves to {}",
                    path,
                    String::from_utf8_lossy(&link.stdout).trim()
                );
            }
        }
        Ok(None)
    }

    fn remote_copy(&self, host: &str, source: &str, destination: &Path) -> HalResult<()> {
        let mut cmd = Command::new("scp");
        cmd.arg(format!("{}:{}", host, source)).arg(destination);
        let output = output_with_timeout("scp", &mut cmd, COPY_TIMEOUT)?;

        if !output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            if !stdout.trim().is_empty() {
                log::debug!("scp stdout: {}", stdout.trim());
            }
            return Err(output_failed("scp", &output));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bmap_copy_requires_confirmation() {
        let hal = LinuxHal::new();
        let opts = FlashOptions::new(false, false);
        let err = hal
            .bmap_copy(
                Path::new("image.wic.xz"),
                Path::new("image.wic.bmap"),
                "/dev/null",
                &opts,
            )
            .unwrap_err();
        assert!(matches!(err, HalError::SafetyLock));
    }

    #[test]
    fn bmap_copy_dry_run_does_not_spawn() {
        let hal = LinuxHal::with_flash_tool("/nonexistent/bmaptool");
        let opts = FlashOptions::new(true, false);
        hal.bmap_copy(
            Path::new("image.wic.xz"),
            Path::new("image.wic.bmap"),
            "/dev/null",
            &opts,
        )
        .unwrap();
    }

    #[test]
    fn missing_flash_tool_is_command_not_found() {
        let hal = LinuxHal::with_flash_tool("/nonexistent/bmaptool");
        let opts = FlashOptions::new(false, true);
        let err = hal
            .bmap_copy(
                Path::new("image.wic.xz"),
                Path::new("image.wic.bmap"),
                "/dev/null",
                &opts,
            )
            .unwrap_err();
        assert!(matches!(err, HalError::CommandNotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn failing_flash_tool_surfaces_exit_code_and_stderr() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("fake-bmaptool");
        fs::write(&tool, "#!/bin/sh\necho 'checksum mismatch' >&2\nexit 3\n").unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();

        let hal = LinuxHal::with_flash_tool(&tool);
        let opts = FlashOptions::new(false, true);
        let err = hal
            .bmap_copy(
                Path::new("image.wic.xz"),
                Path::new("image.wic.bmap"),
                "/dev/null",
                &opts,
            )
            .unwrap_err();
        match err {
            HalError::CommandFailed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "checksum mismatch");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn long_flash_stderr_keeps_only_the_tail() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("fake-bmaptool");
        fs::write(
            &tool,
            "#!/bin/sh\ni=1\nwhile [ $i -le 30 ]; do echo \"line $i\" >&2; i=$((i+1)); done\nexit 1\n",
        )
        .unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();

        let hal = LinuxHal::with_flash_tool(&tool);
        let err = hal
            .bmap_copy(
                Path::new("image.wic.xz"),
                Path::new("image.wic.bmap"),
                "/dev/null",
                &FlashOptions::new(false, true),
            )
            .unwrap_err();
        match err {
            HalError::CommandFailed { stderr, .. } => {
                let lines: Vec<&str> = stderr.lines().collect();
                assert_eq!(lines.len(), STDERR_TAIL_LINES);
                assert_eq!(lines.first(), Some(&"line 11"));
                assert_eq!(lines.last(), Some(&"line 30"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn unmount_of_unmounted_partition_is_ok() {
        let hal = LinuxHal::new();
        hal.unmount_partition("/dev/bringup-test-not-a-device1", false)
            .unwrap();
    }
}
