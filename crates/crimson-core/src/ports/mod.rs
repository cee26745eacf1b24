//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the install core expects from
//! infrastructure. They contain no implementation details and use only
//! domain types.
//!
//! # Design Rules
//!
//! - No process handles or file descriptors in any signature
//! - Intent-based methods for the engine (launch / read / wait / terminate)
//! - Persistence is a whole-record load/save, not CRUD

pub mod engine;
pub mod event_emitter;
pub mod install_state;

use thiserror::Error;

pub use engine::{EngineError, EngineExit, EngineInvocation, EngineRun, InstallEngine};
pub use event_emitter::InstallEventEmitterPort;
pub use install_state::{InstallStateRepositoryPort, PersistedInstallState};

/// Domain-specific errors for repository operations.
///
/// Abstracts away storage details (filesystem, serialization backend) so the
/// manager can log and continue without knowing the adapter.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Storage backend error (filesystem, permissions, etc.).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}
