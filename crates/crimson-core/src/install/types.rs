//! Install item, action and status types.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::InstallError;

/// The operation an install job asks the engine to perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallAction {
    /// Fresh install of a title.
    Install,
    /// Update an installed title to the latest build.
    Update,
    /// Verify and re-download damaged files.
    Repair,
    /// Move an installed title to a new base directory.
    Move,
    /// Remove an installed title.
    Uninstall,
}

impl InstallAction {
    /// Convert to string representation for storage and display.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Update => "update",
            Self::Repair => "repair",
            Self::Move => "move",
            Self::Uninstall => "uninstall",
        }
    }

    /// Present-progressive label shown while the job runs ("Installing").
    #[must_use]
    pub const fn progressive(&self) -> &'static str {
        match self {
            Self::Install => "Installing",
            Self::Update => "Updating",
            Self::Repair => "Repairing",
            Self::Move => "Moving",
            Self::Uninstall => "Uninstalling",
        }
    }
}

impl fmt::Display for InstallAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of an install job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallStatus {
    /// Waiting in the queue.
    Pending,
    /// The engine is working on this job.
    Processing,
    /// The engine was stopped on request; the job can be resumed.
    Paused,
    /// Cancel was requested; waiting for the engine to stop.
    Cancelling,
    /// Finished successfully.
    Success,
    /// Finished with an error.
    Failed,
    /// Cancelled by the user.
    Cancelled,
}

impl InstallStatus {
    /// Convert to string representation for storage and display.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Paused => "paused",
            Self::Cancelling => "cancelling",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// No further transitions happen from a terminal status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Cancelled)
    }

    /// The status of the single job that currently owns the engine.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Processing | Self::Paused | Self::Cancelling)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing | Self::Cancelled)
                | (
                    Self::Processing,
                    Self::Paused | Self::Cancelling | Self::Success | Self::Failed
                )
                | (
                    Self::Paused,
                    Self::Processing | Self::Cancelling | Self::Success | Self::Failed
                )
                | (Self::Cancelling, Self::Cancelled)
        )
    }
}

impl fmt::Display for InstallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One install job: identity, requested action and live metrics.
///
/// `app_name`, `action`, `install_path` and `enqueued_at` are fixed at
/// creation. Status changes go through [`InstallItem::transition`], which
/// also stamps `started_at` / `finished_at`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstallItem {
    app_name: String,
    action: InstallAction,
    install_path: PathBuf,
    enqueued_at: DateTime<Utc>,

    /// Current state-machine status.
    pub status: InstallStatus,
    /// Completion percentage in `[0, 100]`; `None` until the engine reports.
    pub progress_percentage: Option<f64>,
    /// MiB written to disk so far.
    pub written_size_mib: f64,
    /// Expected MiB to write in total (0 while unknown).
    pub total_write_size_mib: f64,
    /// Smoothed raw download throughput in MiB/s.
    pub download_speed_raw_mib: f64,
    /// When the job was first promoted to `Processing`.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal status.
    pub finished_at: Option<DateTime<Utc>>,
    /// Human-readable reason for `Failed` (and interrupted) jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl InstallItem {
    /// Create a new `Pending` job.
    pub fn new(
        app_name: impl Into<String>,
        action: InstallAction,
        install_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            action,
            install_path: install_path.into(),
            enqueued_at: Utc::now(),
            status: InstallStatus::Pending,
            progress_percentage: None,
            written_size_mib: 0.0,
            total_write_size_mib: 0.0,
            download_speed_raw_mib: 0.0,
            started_at: None,
            finished_at: None,
            failure_reason: None,
        }
    }

    /// Stable identifier of the title.
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Requested operation.
    pub const fn action(&self) -> InstallAction {
        self.action
    }

    /// Destination chosen at enqueue time.
    pub fn install_path(&self) -> &Path {
        &self.install_path
    }

    /// When the job was admitted to the queue.
    pub const fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    /// Pause is only meaningful while the engine is working.
    pub fn is_pausable(&self) -> bool {
        self.status == InstallStatus::Processing
    }

    /// Resume is only meaningful for a paused job.
    pub fn is_resumable(&self) -> bool {
        self.status == InstallStatus::Paused
    }

    /// Move to `next`, enforcing the state machine.
    pub fn transition(&mut self, next: InstallStatus) -> Result<(), InstallError> {
        if !self.status.can_transition_to(next) {
            return Err(InstallError::invalid_transition(
                format!("{} -> {}", self.status, next),
                Some(self.status),
            ));
        }

        self.status = next;
        if next == InstallStatus::Processing && self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
            self.download_speed_raw_mib = 0.0;
        }
        Ok(())
    }

    /// Move to `Failed` with a reason.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), InstallError> {
        self.transition(InstallStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    /// Record an active job that was cut off by a process stop.
    ///
    /// Only applies to `Processing`, `Paused` and `Cancelling`; returns
    /// `false` and leaves the item untouched otherwise.
    pub fn mark_interrupted(&mut self) -> bool {
        if !self.status.is_active() {
            return false;
        }
        self.status = InstallStatus::Failed;
        self.finished_at = Some(Utc::now());
        self.download_speed_raw_mib = 0.0;
        self.failure_reason = Some("interrupted".to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> InstallItem {
        InstallItem::new("Fortnite", InstallAction::Install, "/games")
    }

    #[test]
    fn new_item_is_pending_without_progress() {
        let item = item();
        assert_eq!(item.status, InstallStatus::Pending);
        assert_eq!(item.progress_percentage, None);
        assert_eq!(item.app_name(), "Fortnite");
        assert_eq!(item.install_path(), Path::new("/games"));
        assert!(item.started_at.is_none());
    }

    #[test]
    fn processing_stamps_start_once() {
        let mut item = item();
        item.transition(InstallStatus::Processing).unwrap();
        let started = item.started_at;
        assert!(started.is_some());

        item.transition(InstallStatus::Paused).unwrap();
        item.transition(InstallStatus::Processing).unwrap();
        assert_eq!(item.started_at, started);
    }

    #[test]
    fn terminal_transition_stamps_finish_and_clears_speed() {
        let mut item = item();
        item.transition(InstallStatus::Processing).unwrap();
        item.download_speed_raw_mib = 12.5;
        item.transition(InstallStatus::Success).unwrap();

        assert!(item.finished_at.is_some());
        assert!(item.download_speed_raw_mib.abs() < f64::EPSILON);
    }

    #[test]
    fn pending_cancels_without_cancelling_state() {
        let mut item = item();
        assert!(item.transition(InstallStatus::Cancelled).is_ok());
        assert!(item.status.is_terminal());
    }

    #[test]
    fn rejects_transitions_out_of_terminal_states() {
        let mut item = item();
        item.transition(InstallStatus::Cancelled).unwrap();

        let err = item.transition(InstallStatus::Processing).unwrap_err();
        assert!(matches!(err, InstallError::InvalidTransition { .. }));
        assert_eq!(item.status, InstallStatus::Cancelled);
    }

    #[test]
    fn processing_cannot_jump_to_cancelled() {
        let mut item = item();
        item.transition(InstallStatus::Processing).unwrap();
        assert!(item.transition(InstallStatus::Cancelled).is_err());
        item.transition(InstallStatus::Cancelling).unwrap();
        item.transition(InstallStatus::Cancelled).unwrap();
    }

    #[test]
    fn fail_records_reason() {
        let mut item = item();
        item.transition(InstallStatus::Processing).unwrap();
        item.fail("engine exited with code 1").unwrap();
        assert_eq!(item.status, InstallStatus::Failed);
        assert_eq!(
            item.failure_reason.as_deref(),
            Some("engine exited with code 1")
        );
    }

    #[test]
    fn interrupted_applies_only_to_active_items() {
        let mut pending = item();
        assert!(!pending.mark_interrupted());
        assert_eq!(pending.status, InstallStatus::Pending);

        let mut cancelling = item();
        cancelling.transition(InstallStatus::Processing).unwrap();
        cancelling.transition(InstallStatus::Cancelling).unwrap();
        assert!(cancelling.mark_interrupted());
        assert_eq!(cancelling.status, InstallStatus::Failed);
        assert_eq!(cancelling.failure_reason.as_deref(), Some("interrupted"));
    }

    #[test]
    fn pausable_and_resumable_follow_status() {
        let mut item = item();
        assert!(!item.is_pausable());
        item.transition(InstallStatus::Processing).unwrap();
        assert!(item.is_pausable());
        item.transition(InstallStatus::Paused).unwrap();
        assert!(item.is_resumable());
        assert!(!item.is_pausable());
    }

    #[test]
    fn action_labels() {
        assert_eq!(InstallAction::Repair.progressive(), "Repairing");
        assert_eq!(InstallAction::Uninstall.to_string(), "uninstall");
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&InstallStatus::Cancelling).unwrap();
        assert_eq!(json, "\"cancelling\"");
    }
}
