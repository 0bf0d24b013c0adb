mod config;
pub mod database;
pub mod migrations;

pub use config::EngineConfig;
pub use database::Database;

use std::path::PathBuf;

/// Returns `~/.config/mindgate[-dev]/` based on MINDGATE_ENV.
///
/// Set MINDGATE_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("MINDGATE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("mindgate-dev")
    } else {
        base_dir.join("mindgate")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
