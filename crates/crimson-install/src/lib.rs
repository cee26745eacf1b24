//! Install orchestration for crimson.
//!
//! - `queue` - FIFO of jobs waiting for the engine
//! - `progress` - engine line parsing, progress metrics and throttling
//! - `history` - bounded record of finished jobs and the JSON state store
//! - `engine` - the legendary process adapter
//! - `manager` - the single-flight `InstallManager` and its runner

// Re-export core types for convenience
pub use crimson_core::{
    InstallAction, InstallError, InstallEvent, InstallItem, InstallResult, InstallStatus,
};

pub mod engine;
pub mod history;
pub mod progress;
pub mod queue;

mod manager;

pub use engine::{LegendaryEngine, ProcessRun};
pub use history::{HistoryLog, JsonFileStateStore, RestoredState};
pub use progress::{ProgressReporter, ProgressThrottle};
pub use queue::InstallQueue;

pub use manager::{
    EngineJob, InstallManager, InstallManagerConfig, InstallManagerDeps, InstallSnapshot,
    JobOutcome, build_install_manager, run_job,
};
