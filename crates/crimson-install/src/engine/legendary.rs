//! legendary invocation and binary lookup.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use crimson_core::{EngineError, EngineInvocation, EngineRun, InstallAction, InstallEngine};
use tracing::{debug, info};

use super::process::ProcessRun;

/// Binary name looked up on `PATH` when no explicit engine is configured.
pub const ENGINE_BINARY: &str = "legendary";

/// Runs jobs through the legendary CLI.
#[derive(Debug, Clone)]
pub struct LegendaryEngine {
    binary: PathBuf,
}

impl LegendaryEngine {
    /// Use `binary` as the engine executable.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Resolve the engine binary.
    ///
    /// `configured` may be a path or a bare command name; `None` looks up
    /// `legendary` on `PATH`.
    pub fn locate(configured: Option<&Path>) -> Result<Self, EngineError> {
        let wanted = configured.unwrap_or_else(|| Path::new(ENGINE_BINARY));
        let binary = which::which(wanted)
            .map_err(|e| EngineError::Launch(format!("{}: {e}", wanted.display())))?;
        debug!(binary = %binary.display(), "Resolved engine binary");
        Ok(Self { binary })
    }

    /// Engine executable.
    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl InstallEngine for LegendaryEngine {
    async fn launch(
        &self,
        invocation: &EngineInvocation,
    ) -> Result<Box<dyn EngineRun>, EngineError> {
        let args = legendary_args(invocation);
        info!(
            app_name = %invocation.app_name,
            action = %invocation.action,
            resume = invocation.resume,
            "Launching legendary"
        );
        let run = ProcessRun::spawn(self.binary.as_os_str(), args)?;
        Ok(Box::new(run))
    }
}

/// Command-line arguments for one invocation.
///
/// A resumed install uses the same arguments as the first run; legendary
/// picks up its own resume file for the title.
pub fn legendary_args(invocation: &EngineInvocation) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-y".into()];
    let app = OsString::from(&invocation.app_name);

    match invocation.action {
        InstallAction::Install => {
            args.extend([
                "install".into(),
                app,
                "--base-path".into(),
                invocation.install_path.clone().into_os_string(),
                "--skip-sdl".into(),
            ]);
        }
        InstallAction::Update => {
            args.extend([
                "install".into(),
                app,
                "--update-only".into(),
                "--skip-sdl".into(),
            ]);
        }
        InstallAction::Repair => args.extend(["repair".into(), app]),
        InstallAction::Move => args.extend([
            "move".into(),
            app,
            invocation.install_path.clone().into_os_string(),
        ]),
        InstallAction::Uninstall => args.extend(["uninstall".into(), app]),
    }
    args
}
