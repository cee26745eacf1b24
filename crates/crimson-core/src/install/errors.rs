//! Install error types.
//!
//! Serializable so that adapters (CLI, GUI bridges) can forward them without
//! depending on `std::io::Error` or engine-specific types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::InstallStatus;

/// Result alias for install operations.
pub type InstallResult<T> = Result<T, InstallError>;

/// Error type for install orchestration.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum InstallError {
    /// A job for this title is already queued or running.
    #[error("An install for {app_name} is already queued or running")]
    DuplicateJob {
        /// The title that was rejected.
        app_name: String,
    },

    /// The requested operation does not apply to the item's current status.
    #[error("Cannot {operation} while {}", status.map_or("idle", |s| s.as_str()))]
    InvalidTransition {
        /// What was attempted.
        operation: String,
        /// Status of the targeted item, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<InstallStatus>,
    },

    /// The engine process could not be started.
    #[error("Failed to launch engine: {message}")]
    EngineLaunch {
        /// Detailed error message.
        message: String,
    },

    /// The engine process or the task driving it died unexpectedly.
    #[error("Engine crashed: {message}")]
    EngineCrash {
        /// Detailed error message.
        message: String,
    },

    /// The engine exited with a non-zero status.
    #[error("Engine exited with {}: {message}", code.map_or_else(|| "no code".to_string(), |c| format!("code {c}")))]
    NonZeroExit {
        /// Exit code, if the platform reported one.
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<i32>,
        /// Last error line reported by the engine.
        message: String,
    },

    /// General/uncategorized error.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl InstallError {
    /// Create a duplicate job error.
    pub fn duplicate(app_name: impl Into<String>) -> Self {
        Self::DuplicateJob {
            app_name: app_name.into(),
        }
    }

    /// Create an invalid transition error.
    pub fn invalid_transition(operation: impl Into<String>, status: Option<InstallStatus>) -> Self {
        Self::InvalidTransition {
            operation: operation.into(),
            status,
        }
    }

    /// Create an engine launch error.
    pub fn engine_launch(message: impl Into<String>) -> Self {
        Self::EngineLaunch {
            message: message.into(),
        }
    }

    /// Create an engine crash error.
    pub fn engine_crash(message: impl Into<String>) -> Self {
        Self::EngineCrash {
            message: message.into(),
        }
    }

    /// Create a non-zero exit error.
    pub fn non_zero_exit(code: Option<i32>, message: impl Into<String>) -> Self {
        Self::NonZeroExit {
            code,
            message: message.into(),
        }
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Short message suitable for end users.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::DuplicateJob { app_name } => format!("{app_name} is already in the queue"),
            Self::InvalidTransition { .. } => self.to_string(),
            Self::EngineLaunch { .. } => {
                "Could not start the install engine. Is legendary installed?".to_string()
            }
            Self::EngineCrash { .. } => "The install engine stopped unexpectedly".to_string(),
            Self::NonZeroExit { message, .. } if !message.is_empty() => message.clone(),
            Self::NonZeroExit { code, .. } => code.map_or_else(
                || "The install engine was terminated".to_string(),
                |c| format!("The install engine exited with code {c}"),
            ),
            Self::Other { message } => message.clone(),
        }
    }
}
