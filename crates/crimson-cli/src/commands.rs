//! Main commands enum.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use crimson_core::InstallAction;

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Install one or more titles
    Install {
        /// App names as known to legendary
        #[arg(required = true)]
        apps: Vec<String>,
        /// Base directory for the install (defaults to `default_install_path`)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Update installed titles
    Update {
        /// App names as known to legendary
        #[arg(required = true)]
        apps: Vec<String>,
    },

    /// Verify and repair installed titles
    Repair {
        /// App names as known to legendary
        #[arg(required = true)]
        apps: Vec<String>,
    },

    /// Uninstall titles
    Uninstall {
        /// App names as known to legendary
        #[arg(required = true)]
        apps: Vec<String>,
    },

    /// Move an installed title to a new directory
    Move {
        /// App name as known to legendary
        app: String,
        /// New base directory
        path: PathBuf,
    },

    /// Show the job in progress and the waiting queue
    Queue,

    /// Show finished jobs
    History {
        /// Only show the most recent entries
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show resolved data paths
    Paths,
}

/// One job to enqueue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub app_name: String,
    pub action: InstallAction,
    pub install_path: PathBuf,
}

impl Commands {
    /// Jobs this command asks for, or `None` for read-only commands.
    ///
    /// Actions that do not place files fall back to `default_path` (or an
    /// empty path) since legendary ignores it for them.
    pub fn job_requests(&self, default_path: Option<&Path>) -> Option<Vec<JobRequest>> {
        let fallback = || default_path.map(Path::to_path_buf).unwrap_or_default();

        let jobs = match self {
            Self::Install { apps, path } => {
                let path = path.clone().unwrap_or_else(fallback);
                requests(apps, InstallAction::Install, &path)
            }
            Self::Update { apps } => requests(apps, InstallAction::Update, &fallback()),
            Self::Repair { apps } => requests(apps, InstallAction::Repair, &fallback()),
            Self::Uninstall { apps } => requests(apps, InstallAction::Uninstall, &fallback()),
            Self::Move { app, path } => {
                requests(std::slice::from_ref(app), InstallAction::Move, path)
            }
            Self::Queue | Self::History { .. } | Self::Paths => return None,
        };
        Some(jobs)
    }
}

fn requests(apps: &[String], action: InstallAction, path: &Path) -> Vec<JobRequest> {
    apps.iter()
        .map(|app| JobRequest {
            app_name: app.clone(),
            action,
            install_path: path.to_path_buf(),
        })
        .collect()
}
