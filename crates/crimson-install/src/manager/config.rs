//! Install manager tuning.

use std::time::Duration;

use crimson_core::Settings;
use crimson_core::settings::{
    DEFAULT_CANCEL_GRACE_SECS, DEFAULT_HISTORY_LIMIT, DEFAULT_PROGRESS_INTERVAL_MS,
    DEFAULT_SPEED_WINDOW,
};

/// Configuration for the install manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallManagerConfig {
    /// Terminal jobs kept in history.
    pub history_limit: usize,
    /// Time the engine gets to exit after an interrupt before it is killed.
    pub cancel_grace: Duration,
    /// Minimum interval between progress events for one run.
    pub progress_interval: Duration,
    /// Throughput samples in the moving average.
    pub speed_window: usize,
}

impl Default for InstallManagerConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            cancel_grace: Duration::from_secs(DEFAULT_CANCEL_GRACE_SECS),
            progress_interval: Duration::from_millis(DEFAULT_PROGRESS_INTERVAL_MS),
            speed_window: DEFAULT_SPEED_WINDOW,
        }
    }
}

impl InstallManagerConfig {
    /// Derive the config from user settings.
    #[must_use]
    pub const fn from_settings(settings: &Settings) -> Self {
        Self {
            history_limit: settings.effective_history_limit(),
            cancel_grace: Duration::from_secs(settings.effective_cancel_grace_secs()),
            progress_interval: Duration::from_millis(settings.effective_progress_interval_ms()),
            speed_window: settings.effective_speed_window(),
        }
    }

    /// Set the history retention cap.
    #[must_use]
    pub const fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Set the cancel grace period.
    #[must_use]
    pub const fn with_cancel_grace(mut self, grace: Duration) -> Self {
        self.cancel_grace = grace;
        self
    }

    /// Set the progress event interval.
    #[must_use]
    pub const fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Set the throughput smoothing window.
    #[must_use]
    pub const fn with_speed_window(mut self, window: usize) -> Self {
        self.speed_window = window;
        self
    }
}
