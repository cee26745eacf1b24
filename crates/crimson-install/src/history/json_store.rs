//! JSON file implementation of `InstallStateRepositoryPort`.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use crimson_core::{InstallStateRepositoryPort, PersistedInstallState, RepositoryError};
use tempfile::NamedTempFile;
use tracing::debug;

/// Stores the install record as pretty-printed JSON.
///
/// Writes go to a temp file in the same directory which is then renamed over
/// the target, so readers never observe a half-written record.
#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    /// Store backed by `path`. The file does not need to exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl InstallStateRepositoryPort for JsonFileStateStore {
    async fn load(&self) -> Result<PersistedInstallState, RepositoryError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No install state yet");
                return Ok(PersistedInstallState::default());
            }
            Err(e) => return Err(RepositoryError::Storage(e.to_string())),
        };

        serde_json::from_str(&raw).map_err(|e| RepositoryError::Serialization(e.to_string()))
    }

    async fn save(&self, state: &PersistedInstallState) -> Result<(), RepositoryError> {
        let json = serde_json::to_vec_pretty(state)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomic(&path, &json))
            .await
            .map_err(|e| RepositoryError::Storage(format!("write task failed: {e}")))?
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RepositoryError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| RepositoryError::Storage(e.to_string()))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| RepositoryError::Storage(e.to_string()))?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;
    tmp.persist(path)
        .map_err(|e| RepositoryError::Storage(e.error.to_string()))?;
    Ok(())
}
