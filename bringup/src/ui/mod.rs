//! Shared terminal helpers for the interactive sessions.

use std::io::IsTerminal;

pub mod cancel;
pub mod confirm;
pub mod prompt;
pub mod style;
pub mod validation;

pub fn ensure_interactive_terminal() -> anyhow::Result<()> {
    if std::io::stdin().is_terminal() && std::io::stdout().is_terminal() {
        return Ok(());
    }

    anyhow::bail!(
        "No TTY detected. The bringup sessions need an interactive terminal.\n\
         Try running directly in a terminal (not piped or via script).\n\
         If using sudo, try: sudo -E bringup"
    );
}
