//! Install events delivered to consumers.
//!
//! # Wire Format
//!
//! Events are serialized with a `type` tag:
//!
//! ```json
//! { "type": "status_changed", "item": null }
//! ```

mod hub;

use serde::{Deserialize, Serialize};

use crate::install::InstallItem;

pub use hub::{InstallEventHub, InstallEventListener, Subscription};

/// Events emitted by the install manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InstallEvent {
    /// An item changed status, or `None` once no job is active.
    StatusChanged {
        /// Snapshot taken right after the transition.
        item: Option<InstallItem>,
    },

    /// Throttled metrics update for the job being processed.
    Progress {
        /// Snapshot with the latest metrics.
        item: InstallItem,
    },
}

impl InstallEvent {
    /// Status change for `item`.
    #[must_use]
    pub fn status_changed(item: &InstallItem) -> Self {
        Self::StatusChanged {
            item: Some(item.clone()),
        }
    }

    /// "No active job" notification.
    #[must_use]
    pub const fn idle() -> Self {
        Self::StatusChanged { item: None }
    }

    /// Progress update for `item`.
    #[must_use]
    pub fn progress(item: &InstallItem) -> Self {
        Self::Progress { item: item.clone() }
    }

    /// The item this event is about, if any.
    pub const fn item(&self) -> Option<&InstallItem> {
        match self {
            Self::StatusChanged { item } => item.as_ref(),
            Self::Progress { item } => Some(item),
        }
    }

    /// Get the event name for logging.
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::StatusChanged { .. } => "status_changed",
            Self::Progress { .. } => "progress",
        }
    }
}
