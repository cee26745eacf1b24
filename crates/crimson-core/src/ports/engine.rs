//! Engine port: the external process that performs installs.
//!
//! The manager only sees intent (launch this job), a stream of output lines,
//! an exit classification and a terminate request. How the process is spawned
//! and signalled is up to the adapter.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::install::{InstallAction, InstallItem};

/// What the engine is asked to do for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInvocation {
    /// Title identifier.
    pub app_name: String,
    /// Requested operation.
    pub action: InstallAction,
    /// Destination directory chosen at enqueue time.
    pub install_path: PathBuf,
    /// True when this run continues a job that was paused.
    pub resume: bool,
}

impl EngineInvocation {
    /// Build a fresh invocation for `item`.
    pub fn for_item(item: &InstallItem) -> Self {
        Self {
            app_name: item.app_name().to_string(),
            action: item.action(),
            install_path: item.install_path().to_path_buf(),
            resume: false,
        }
    }

    /// Mark the invocation as a resume of an earlier run.
    #[must_use]
    pub const fn resuming(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }
}

/// How an engine run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineExit {
    /// The engine reported completion.
    Success,
    /// The engine stopped on an abort request (signal).
    Aborted,
    /// The engine reported an error.
    Failed {
        /// Exit code, if the platform reported one.
        code: Option<i32>,
    },
}

/// Errors raised by engine adapters.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine could not be started.
    #[error("Failed to launch engine: {0}")]
    Launch(String),

    /// Reading from or waiting on the engine failed.
    #[error("Engine I/O error: {0}")]
    Io(String),

    /// Delivering a termination signal failed.
    #[error("Failed to signal engine: {0}")]
    Signal(String),
}

/// Launches engine runs.
#[async_trait]
pub trait InstallEngine: Send + Sync {
    /// Start the engine for `invocation`.
    async fn launch(&self, invocation: &EngineInvocation)
    -> Result<Box<dyn EngineRun>, EngineError>;
}

/// One running engine process.
#[async_trait]
pub trait EngineRun: Send {
    /// Next output line, in production order. `None` once output is closed.
    async fn next_line(&mut self) -> Option<String>;

    /// Wait for the run to end and classify its exit.
    async fn wait(&mut self) -> Result<EngineExit, EngineError>;

    /// Ask the run to stop; force it after `grace` if it has not exited.
    async fn terminate(&mut self, grace: Duration) -> Result<(), EngineError>;
}
