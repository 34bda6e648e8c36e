mod config;

pub use config::{Config, MessagesConfig, ScheduleConfig, SmartPauseConfig, WellnessConfig};

use std::path::PathBuf;

use crate::error::Result;

/// Returns `~/.config/maybe-break[-dev]/` based on MAYBE_BREAK_ENV.
///
/// Set MAYBE_BREAK_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("MAYBE_BREAK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("maybe-break-dev")
    } else {
        base_dir.join("maybe-break")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
