//! Centralized emoji + message helpers for consistent UX copy.

use dialoguer::console::style;

pub mod emoji {
    pub const CLEANUP: &str = "🧹";
    pub const DOWNLOAD: &str = "⬇️";
    pub const ERROR: &str = "❌";
    pub const DISK: &str = "💾";
    pub const PARTY: &str = "🎉";
    pub const SEARCH: &str = "🔍";
    pub const SUCCESS: &str = "✅";
}

pub fn with(emoji: &str, message: &str) -> String {
    format!("{} {}", emoji, message)
}

/// Size hint shown next to a menu entry, in yellow when the terminal supports it.
pub fn size_hint(text: &str) -> String {
    style(format!("({})", text)).yellow().to_string()
}

pub fn separator() -> String {
    format!("   {}", "-".repeat(40))
}
