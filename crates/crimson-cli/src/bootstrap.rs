//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the CLI adapter:
//! - Data directory and settings (via crimson-core)
//! - legendary engine adapter and JSON state store (via crimson-install)
//! - Install manager and the event hub it publishes to
//!
//! Command handlers receive the fully-composed `CliContext`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use crimson_core::{
    InstallEventHub, Settings, data_root, ensure_dir, load_settings, settings_file_in,
    state_file_in, validate_settings,
};
use crimson_install::{
    InstallManager, InstallManagerConfig, InstallManagerDeps, JsonFileStateStore,
    LegendaryEngine, build_install_manager,
};
use tracing::{debug, warn};

/// Bootstrap configuration for the CLI (flags and their env fallbacks).
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Overrides the data directory.
    pub data_dir: Option<PathBuf>,
    /// Overrides the engine binary.
    pub engine: Option<PathBuf>,
}

/// Resolved locations and settings, enough for read-only commands.
#[derive(Debug, Clone)]
pub struct CliEnv {
    /// Directory holding the state and settings files.
    pub data_dir: PathBuf,
    /// Persisted queue and history.
    pub state_file: PathBuf,
    /// Settings file (may not exist).
    pub settings_file: PathBuf,
    /// Effective settings.
    pub settings: Settings,
    /// Engine binary requested by flag or settings.
    pub engine: Option<PathBuf>,
}

impl CliEnv {
    /// Store for the persisted record.
    pub fn store(&self) -> JsonFileStateStore {
        JsonFileStateStore::new(&self.state_file)
    }

    /// Base directory used when a job does not name one.
    pub fn default_install_path(&self) -> Option<&Path> {
        self.settings
            .default_install_path
            .as_deref()
            .map(Path::new)
    }
}

/// Fully composed application context for job commands.
pub struct CliContext {
    /// Resolved environment.
    pub env: CliEnv,
    /// The one install manager for this process.
    pub manager: Arc<InstallManager>,
    /// Hub the manager publishes to; views subscribe here.
    pub events: InstallEventHub,
}

/// Resolve the data directory and load settings.
pub fn resolve_env(config: &CliConfig) -> Result<CliEnv> {
    let data_dir = match &config.data_dir {
        Some(dir) => {
            ensure_dir(dir)?;
            dir.clone()
        }
        None => data_root()?,
    };

    let settings_file = settings_file_in(&data_dir);
    let settings = load_settings(&settings_file)
        .with_context(|| format!("Failed to load {}", settings_file.display()))?;
    validate_settings(&settings)?;

    let engine = config
        .engine
        .clone()
        .or_else(|| settings.engine_path.as_ref().map(PathBuf::from));

    debug!(data_dir = %data_dir.display(), "Resolved data directory");
    Ok(CliEnv {
        state_file: state_file_in(&data_dir),
        settings_file,
        data_dir,
        settings,
        engine,
    })
}

/// Compose the install manager for job commands.
///
/// Restores the persisted record, so jobs left queued by an earlier run
/// start again.
pub async fn bootstrap(env: CliEnv) -> Result<CliContext> {
    let engine = match LegendaryEngine::locate(env.engine.as_deref()) {
        Ok(engine) => engine,
        Err(e) => {
            // Keep going: each job then fails with the launch error
            warn!(error = %e, "Engine binary not found");
            LegendaryEngine::new(
                env.engine
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(crimson_install::engine::ENGINE_BINARY)),
            )
        }
    };

    let events = InstallEventHub::new();
    let manager = build_install_manager(InstallManagerDeps {
        engine: Arc::new(engine),
        store: Arc::new(env.store()),
        event_emitter: Arc::new(events.clone()),
        config: InstallManagerConfig::from_settings(&env.settings),
    })
    .await;

    Ok(CliContext {
        env,
        manager,
        events,
    })
}
