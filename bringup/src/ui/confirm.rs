//! Confirmation helpers for destructive operations.

use bringup_error::{GateError, GateResult};

/// Run `action` only when `confirm` says yes; a "no" becomes [`GateError::Aborted`].
pub fn confirm_and_run_with<C, A, T>(prompt: &str, confirm: C, action: A) -> GateResult<T>
where
    C: FnOnce(&str) -> GateResult<bool>,
    A: FnOnce() -> GateResult<T>,
{
    if confirm(prompt)? {
        action()
    } else {
        Err(GateError::Aborted)
    }
}
