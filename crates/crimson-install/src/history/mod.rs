//! Bounded history of finished install jobs, and restart recovery.

mod json_store;

use std::collections::VecDeque;

use crimson_core::{InstallItem, InstallStatus, PersistedInstallState};
use tracing::warn;

pub use json_store::JsonFileStateStore;

/// Append-only record of jobs that reached a terminal status.
///
/// Oldest entries are pruned first once `retention` is exceeded. Persisting
/// is the manager's job; this type only holds the entries.
#[derive(Debug)]
pub struct HistoryLog {
    entries: VecDeque<InstallItem>,
    retention: usize,
}

/// What [`HistoryLog::restore`] rebuilt from a persisted record.
#[derive(Debug)]
pub struct RestoredState {
    /// History, including jobs interrupted by the previous shutdown.
    pub history: HistoryLog,
    /// Jobs that never started, in their original order.
    pub pending: Vec<InstallItem>,
    /// Names of jobs recorded as interrupted.
    pub interrupted: Vec<String>,
}

impl HistoryLog {
    /// Create an empty log keeping at most `retention` entries.
    pub fn new(retention: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            retention: retention.max(1),
        }
    }

    /// Add a terminal snapshot. Non-terminal items are rejected.
    ///
    /// Returns the entries pruned to honor the retention cap.
    pub fn append(&mut self, item: InstallItem) -> Result<Vec<InstallItem>, InstallItem> {
        if !item.status.is_terminal() {
            return Err(item);
        }
        self.entries.push_back(item);

        let mut pruned = Vec::new();
        while self.entries.len() > self.retention {
            if let Some(oldest) = self.entries.pop_front() {
                pruned.push(oldest);
            }
        }
        Ok(pruned)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no job has finished yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Titles in completion order, oldest first.
    pub fn names_in_order(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|item| item.app_name().to_string())
            .collect()
    }

    /// Entries in completion order, oldest first.
    pub fn entries(&self) -> Vec<InstallItem> {
        self.entries.iter().cloned().collect()
    }

    /// Rebuild history and pending jobs from a persisted record.
    ///
    /// Every persisted item lands somewhere:
    /// - terminal items go to history (trimmed to `retention`)
    /// - items that were Processing, Paused or Cancelling go to history as
    ///   Failed/interrupted, wherever they were recorded
    /// - Pending items are re-seeded: `current` first, then the queue in
    ///   order, then any found in history
    /// - a second Pending item with the same title is dropped with a warning
    pub fn restore(state: PersistedInstallState, retention: usize) -> RestoredState {
        let mut restored = RestoredState {
            history: Self::new(retention),
            pending: Vec::new(),
            interrupted: Vec::new(),
        };

        let mut stray = Vec::new();
        for item in state.history {
            if item.status == InstallStatus::Pending {
                warn!(app_name = %item.app_name(), "Pending install found in history, requeueing");
                stray.push(item);
            } else {
                restored.admit(item);
            }
        }

        for item in state.current.into_iter().chain(state.queue).chain(stray) {
            restored.admit(item);
        }
        restored
    }
}

impl RestoredState {
    fn admit(&mut self, mut item: InstallItem) {
        if item.mark_interrupted() {
            self.interrupted.push(item.app_name().to_string());
        }

        if item.status.is_terminal() {
            if let Err(item) = self.history.append(item) {
                warn!(app_name = %item.app_name(), status = %item.status, "Dropped persisted install");
            }
            return;
        }

        if self.pending.iter().any(|p| p.app_name() == item.app_name()) {
            warn!(app_name = %item.app_name(), "Dropped duplicate persisted install");
            return;
        }
        self.pending.push(item);
    }
}
