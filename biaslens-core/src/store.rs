//! Write-once storage for cleaned datasets, keyed by job id.

use crate::error::BiasError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Parse a caller-supplied job id. Anything that is not a UUID is rejected
/// before any storage is touched.
pub fn parse_job_id(raw: &str) -> Result<Uuid, BiasError> {
    Uuid::parse_str(raw.trim()).map_err(|_| BiasError::input(format!("Invalid job id '{raw}'")))
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store the artifact for `job_id`. A second put for the same id fails
    /// with `AlreadyExists`.
    async fn put(&self, job_id: Uuid, bytes: &[u8]) -> Result<(), BiasError>;

    /// Exact bytes written for `job_id`, or `NotFound`.
    async fn get(&self, job_id: Uuid) -> Result<Vec<u8>, BiasError>;
}

/// One `<job_id>.csv` file per job under a directory.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    dir: PathBuf,
}

impl FsArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, job_id: Uuid) -> PathBuf {
        self.dir.join(format!("{job_id}.csv"))
    }
}

fn storage_error(action: &str, path: &Path, error: std::io::Error) -> BiasError {
    BiasError::storage(format!("{action} {}: {error}", path.display()))
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    /// Writes a uniquely named temp file, then hard-links it into place.
    /// The link fails if the target exists, so two racing puts for one id
    /// cannot both succeed.
    async fn put(&self, job_id: Uuid, bytes: &[u8]) -> Result<(), BiasError> {
        let path = self.path_for(job_id);
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| storage_error("create", &self.dir, e))?;
        let tmp = self.dir.join(format!("{job_id}.{}.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| storage_error("write", &tmp, e))?;

        let linked = tokio::fs::hard_link(&tmp, &path).await;
        if let Err(e) = tokio::fs::remove_file(&tmp).await {
            warn!(path = %tmp.display(), error = %e, "Could not remove temp artifact");
        }
        match linked {
            Ok(()) => {
                info!(job_id = %job_id, bytes = bytes.len(), path = %path.display(), "Stored cleaned dataset");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(BiasError::AlreadyExists(format!("artifact {job_id}")))
            }
            Err(e) => Err(storage_error("link", &path, e)),
        }
    }

    async fn get(&self, job_id: Uuid) -> Result<Vec<u8>, BiasError> {
        let path = self.path_for(job_id);
        debug!(path = %path.display(), "Reading artifact");
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BiasError::not_found(format!("No cleaned dataset for job {job_id}")))
            }
            Err(e) => Err(storage_error("read", &path, e)),
        }
    }
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    artifacts: RwLock<HashMap<Uuid, Vec<u8>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.artifacts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.artifacts.read().await.is_empty()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(&self, job_id: Uuid, bytes: &[u8]) -> Result<(), BiasError> {
        let mut artifacts = self.artifacts.write().await;
        if artifacts.contains_key(&job_id) {
            return Err(BiasError::AlreadyExists(format!("artifact {job_id}")));
        }
        artifacts.insert(job_id, bytes.to_vec());
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Vec<u8>, BiasError> {
        self.artifacts
            .read()
            .await
            .get(&job_id)
            .cloned()
            .ok_or_else(|| BiasError::not_found(format!("No cleaned dataset for job {job_id}")))
    }
}
