//! Ctrl+C cancellation handling.
//!
//! Before a session reaches its destructive or long-running phase, Ctrl+C
//! ends the process immediately. Once the token is armed, Ctrl+C only raises
//! the flag and the session stops at its next checkpoint.

use bringup_error::{GateError, GateResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

static HANDLER_SET: OnceLock<()> = OnceLock::new();

/// Exit status used when Ctrl+C ends the process before the token is armed.
const SIGINT_EXIT_CODE: i32 = 130;

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    armed: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn checkpoint(&self) -> GateResult<()> {
        if self.is_cancelled() {
            return Err(GateError::Interrupted);
        }
        Ok(())
    }
}

pub fn install_ctrlc_handler(token: CancelToken) -> anyhow::Result<()> {
    if HANDLER_SET.get().is_some() {
        return Ok(());
    }

    ctrlc::set_handler(move || {
        if !token.is_armed() {
            eprintln!("\nOperation cancelled by user");
            std::process::exit(SIGINT_EXIT_CODE);
        }
        token.cancel();
        log::info!("Cancellation requested (Ctrl+C).");
    })?;

    let _ = HANDLER_SET.set(());
    Ok(())
}
