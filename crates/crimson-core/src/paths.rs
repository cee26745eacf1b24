//! On-disk locations for crimson's data files.
//!
//! Resolution order for the data root:
//! 1. `CRIMSON_DATA_DIR` environment variable (highest priority)
//! 2. System local-data directory (e.g., `~/.local/share/crimson`)

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Environment variable overriding the data root.
pub const DATA_DIR_ENV: &str = "CRIMSON_DATA_DIR";

const STATE_FILE: &str = "install_state.json";
const SETTINGS_FILE: &str = "settings.json";
const ENV_FILE: &str = ".env";

/// Errors that can occur during path resolution.
#[derive(Debug, Error)]
pub enum PathError {
    /// Could not determine the system data directory.
    #[error("Cannot determine system data directory")]
    NoDataDir,

    /// A path was expected to be a directory but was not.
    #[error("{0} exists but is not a directory")]
    NotADirectory(PathBuf),

    /// Failed to create a directory.
    #[error("Failed to create directory {path}: {reason}")]
    CreateFailed { path: PathBuf, reason: String },
}

/// Get the root directory for crimson's data, creating it if needed.
pub fn data_root() -> Result<PathBuf, PathError> {
    let root = match env::var_os(DATA_DIR_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => dirs::data_local_dir()
            .ok_or(PathError::NoDataDir)?
            .join("crimson"),
    };
    ensure_dir(&root)?;
    Ok(root)
}

/// Create `dir` (and parents) unless it already exists as a directory.
pub fn ensure_dir(dir: &Path) -> Result<(), PathError> {
    if dir.exists() {
        if !dir.is_dir() {
            return Err(PathError::NotADirectory(dir.to_path_buf()));
        }
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| PathError::CreateFailed {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Location of the `.env` file that stores user overrides.
pub fn env_file_path() -> Result<PathBuf, PathError> {
    Ok(data_root()?.join(ENV_FILE))
}

/// State file under an explicit root.
pub fn state_file_in(root: &Path) -> PathBuf {
    root.join(STATE_FILE)
}

/// Settings file under an explicit root.
pub fn settings_file_in(root: &Path) -> PathBuf {
    root.join(SETTINGS_FILE)
}
