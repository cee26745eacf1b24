//! Settings domain types and validation.
//!
//! Every field is optional so a partial `settings.json` still loads; the
//! `effective_*` accessors fill in defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default number of terminal jobs kept in history.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Default seconds to wait for the engine to stop before killing it.
pub const DEFAULT_CANCEL_GRACE_SECS: u64 = 10;

/// Default minimum interval between progress events.
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 250;

/// Default number of throughput samples in the moving average.
pub const DEFAULT_SPEED_WINDOW: usize = 5;

/// Install orchestration settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Number of finished jobs to keep (1-10,000).
    pub history_limit: Option<usize>,

    /// Grace period for the engine to stop on cancel (1-600 seconds).
    pub cancel_grace_secs: Option<u64>,

    /// Minimum milliseconds between progress events (0-10,000).
    pub progress_interval_ms: Option<u64>,

    /// Throughput smoothing window in samples (1-100).
    pub speed_window: Option<usize>,

    /// Base directory used when a job does not name one.
    pub default_install_path: Option<String>,

    /// Explicit engine binary; looked up on `PATH` when unset.
    pub engine_path: Option<String>,
}

impl Settings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub const fn with_defaults() -> Self {
        Self {
            history_limit: Some(DEFAULT_HISTORY_LIMIT),
            cancel_grace_secs: Some(DEFAULT_CANCEL_GRACE_SECS),
            progress_interval_ms: Some(DEFAULT_PROGRESS_INTERVAL_MS),
            speed_window: Some(DEFAULT_SPEED_WINDOW),
            default_install_path: None,
            engine_path: None,
        }
    }

    /// Get the effective history limit (with default fallback).
    #[must_use]
    pub const fn effective_history_limit(&self) -> usize {
        match self.history_limit {
            Some(limit) => limit,
            None => DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Get the effective cancel grace period in seconds.
    #[must_use]
    pub const fn effective_cancel_grace_secs(&self) -> u64 {
        match self.cancel_grace_secs {
            Some(secs) => secs,
            None => DEFAULT_CANCEL_GRACE_SECS,
        }
    }

    /// Get the effective progress interval in milliseconds.
    #[must_use]
    pub const fn effective_progress_interval_ms(&self) -> u64 {
        match self.progress_interval_ms {
            Some(ms) => ms,
            None => DEFAULT_PROGRESS_INTERVAL_MS,
        }
    }

    /// Get the effective speed window.
    #[must_use]
    pub const fn effective_speed_window(&self) -> usize {
        match self.speed_window {
            Some(window) => window,
            None => DEFAULT_SPEED_WINDOW,
        }
    }
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("History limit must be between 1 and 10,000, got {0}")]
    InvalidHistoryLimit(usize),

    #[error("Cancel grace period must be between 1 and 600 seconds, got {0}")]
    InvalidCancelGrace(u64),

    #[error("Progress interval must be at most 10,000 ms, got {0}")]
    InvalidProgressInterval(u64),

    #[error("Speed window must be between 1 and 100 samples, got {0}")]
    InvalidSpeedWindow(usize),

    #[error("Install path cannot be empty")]
    EmptyInstallPath,

    #[error("Failed to read settings file: {0}")]
    Read(String),

    #[error("Failed to parse settings file: {0}")]
    Parse(String),
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if let Some(limit) = settings.history_limit {
        if !(1..=10_000).contains(&limit) {
            return Err(SettingsError::InvalidHistoryLimit(limit));
        }
    }

    if let Some(secs) = settings.cancel_grace_secs {
        if !(1..=600).contains(&secs) {
            return Err(SettingsError::InvalidCancelGrace(secs));
        }
    }

    if let Some(ms) = settings.progress_interval_ms {
        if ms > 10_000 {
            return Err(SettingsError::InvalidProgressInterval(ms));
        }
    }

    if let Some(window) = settings.speed_window {
        if !(1..=100).contains(&window) {
            return Err(SettingsError::InvalidSpeedWindow(window));
        }
    }

    if settings
        .default_install_path
        .as_ref()
        .is_some_and(|p| p.trim().is_empty())
    {
        return Err(SettingsError::EmptyInstallPath);
    }

    Ok(())
}

/// Load and validate settings from a JSON file.
///
/// A missing file yields [`Settings::with_defaults`].
pub fn load_settings(path: &Path) -> Result<Settings, SettingsError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Settings::with_defaults());
        }
        Err(e) => return Err(SettingsError::Read(e.to_string())),
    };

    let settings: Settings =
        serde_json::from_str(&raw).map_err(|e| SettingsError::Parse(e.to_string()))?;
    validate_settings(&settings)?;
    Ok(settings)
}
