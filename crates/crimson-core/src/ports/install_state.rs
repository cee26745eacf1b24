//! Install state repository port definition.
//!
//! # Design
//!
//! - Persists the current job, the queue and the history as one record
//! - Fine-grained progress is not persisted on its own; it only rides along
//!   in the snapshots written at enqueue and terminal transitions
//! - Loaded once at manager start, rewritten on every terminal transition

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::RepositoryError;
use crate::install::InstallItem;

/// Current on-disk record version.
pub const STATE_VERSION: u32 = 1;

/// Everything the manager needs to rebuild itself after a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedInstallState {
    /// Record format version.
    pub version: u32,
    /// Job that owned the engine when the record was written.
    #[serde(default)]
    pub current: Option<InstallItem>,
    /// Pending jobs in FIFO order.
    #[serde(default)]
    pub queue: Vec<InstallItem>,
    /// Terminal jobs, oldest first.
    #[serde(default)]
    pub history: Vec<InstallItem>,
}

impl Default for PersistedInstallState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            current: None,
            queue: Vec::new(),
            history: Vec::new(),
        }
    }
}

impl PersistedInstallState {
    /// True when there is nothing to restore.
    pub fn is_empty(&self) -> bool {
        self.current.is_none() && self.queue.is_empty() && self.history.is_empty()
    }
}

/// Port for persisting install state.
///
/// # Usage
///
/// ```ignore
/// let repo: Arc<dyn InstallStateRepositoryPort> = /* ... */;
/// let state = repo.load().await?;
/// repo.save(&state).await?;
/// ```
#[async_trait]
pub trait InstallStateRepositoryPort: Send + Sync {
    /// Load the stored record. A store that was never written returns the
    /// default (empty) record.
    async fn load(&self) -> Result<PersistedInstallState, RepositoryError>;

    /// Replace the stored record.
    async fn save(&self, state: &PersistedInstallState) -> Result<(), RepositoryError>;
}
