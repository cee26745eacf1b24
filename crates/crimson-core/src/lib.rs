//! Core domain types and port definitions for crimson.
//!
//! - `install` - install jobs, their state machine and errors
//! - `events` - the event union and the subscription hub
//! - `ports` - engine, persistence and event emitter abstractions
//! - `settings` - user-tunable orchestration settings
//! - `paths` - on-disk locations of persisted state
#![deny(unused_crate_dependencies)]

pub mod events;
pub mod install;
pub mod paths;
pub mod ports;
pub mod settings;
pub mod utils;

// Re-export commonly used types for convenience
pub use events::{InstallEvent, InstallEventHub, InstallEventListener, Subscription};
pub use install::{InstallAction, InstallError, InstallItem, InstallResult, InstallStatus};
pub use ports::{
    EngineError, EngineExit, EngineInvocation, EngineRun, InstallEngine, InstallEventEmitterPort,
    InstallStateRepositoryPort, PersistedInstallState, RepositoryError,
};
pub use ports::install_state::STATE_VERSION;
pub use settings::{
    DEFAULT_CANCEL_GRACE_SECS, DEFAULT_HISTORY_LIMIT, DEFAULT_PROGRESS_INTERVAL_MS,
    DEFAULT_SPEED_WINDOW, Settings, SettingsError, load_settings, validate_settings,
};
pub use utils::format_mib;

// Re-export path utilities
pub use paths::{
    DATA_DIR_ENV, PathError, data_root, ensure_dir, env_file_path, settings_file_in,
    state_file_in,
};
