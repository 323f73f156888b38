use std::fmt;
use std::io;
use thiserror::Error;

pub type HalResult<T> = Result<T, HalError>;
pub type GateResult<T> = Result<T, GateError>;

#[derive(Error, Debug)]
pub enum HalError {
    #[error("Safety lock engaged: destructive operation was not confirmed")]
    SafetyLock,

    #[error("Device is busy (mounted or in use)")]
    DiskBusy,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Command failed: {program} (exit={code:?}): {stderr}")]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Command timed out: {program} after {timeout_secs}s")]
    CommandTimeout { program: String, timeout_secs: u64 },

    #[error("Command interrupted: {0}")]
    Interrupted(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("nix errno: {0}")]
    Nix(#[from] nix::errno::Errno),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    Other(String),
}

/// A single partition that could not be unmounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmountFailure {
    pub partition: String,
    pub reason: String,
}

impl fmt::Display for UnmountFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.partition, self.reason)
    }
}

/// Errors surfaced by the device safety gate and the interactive sessions.
#[derive(Error, Debug)]
pub enum GateError {
    #[error("Failed to query {what}: {source}")]
    Enumeration {
        what: &'static str,
        #[source]
        source: HalError,
    },

    #[error("Failed to unmount {0}")]
    UnmountFailure(UnmountFailure),

    #[error("Unsafe to flash: still mounted: {}", .partitions.join(", "))]
    UnsafeToFlash { partitions: Vec<String> },

    #[error("Flash failed: {reason}")]
    FlashFailure { reason: String },

    #[error("Invalid input: {0}")]
    OperatorInput(String),

    #[error("Nothing to select: no {what} available")]
    EmptySelection { what: &'static str },

    #[error("Invalid flash target: {0}")]
    InvalidTarget(String),

    #[error("Operation aborted by user")]
    Aborted,

    #[error("Operation interrupted (Ctrl+C)")]
    Interrupted,
}

impl GateError {
    pub fn enumeration(what: &'static str, source: HalError) -> Self {
        GateError::Enumeration { what, source }
    }
}
