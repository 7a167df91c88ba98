//! Archive runtime seam.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::error::{DeployError, DeployResult};
use crate::types::FileRecord;

/// Writer for the target application's archive slots.
///
/// `wait_for_initialised` must complete successfully before any slot is
/// mutated, whether by cleanup or by writes.
#[async_trait]
pub trait ArchiveRuntime: Send + Sync {
    async fn wait_for_initialised(&self) -> DeployResult<()>;

    /// Apply one stale entry. Calls for different identities may run concurrently.
    async fn write(&self, record: &FileRecord) -> DeployResult<()>;

    /// Release anything held by the runtime. Called once from finalization.
    async fn shutdown(&self) -> DeployResult<()> {
        Ok(())
    }
}

/// Runtime that stages each entry's source file under a staging directory.
///
/// The archive writer proper picks staged content up from there.
#[derive(Debug, Clone)]
pub struct StagingArchiveRuntime {
    staging_dir: PathBuf,
    temp_dir: PathBuf,
}

impl StagingArchiveRuntime {
    pub fn new(staging_dir: PathBuf, temp_dir: PathBuf) -> Self {
        Self {
            staging_dir,
            temp_dir,
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    fn staged_path(&self, identity: &str) -> DeployResult<PathBuf> {
        let relative = Path::new(identity);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(DeployError::PermissionDenied(relative.to_path_buf()));
        }
        Ok(self.staging_dir.join(relative))
    }
}

#[async_trait]
impl ArchiveRuntime for StagingArchiveRuntime {
    async fn wait_for_initialised(&self) -> DeployResult<()> {
        for dir in [&self.staging_dir, &self.temp_dir] {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                DeployError::DependencyUnavailable(format!(
                    "cannot prepare {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    async fn write(&self, record: &FileRecord) -> DeployResult<()> {
        let source = record
            .source
            .as_ref()
            .ok_or_else(|| DeployError::NotFound(PathBuf::from(&record.identity)))?;
        let target = self.staged_path(&record.identity)?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DeployError::from_io(parent, e))?;
        }
        tokio::fs::copy(source, &target)
            .await
            .map_err(|e| DeployError::from_io(source, e))?;

        tracing::debug!("Staged {} -> {}", record.identity, target.display());
        Ok(())
    }

    async fn shutdown(&self) -> DeployResult<()> {
        match tokio::fs::remove_dir_all(&self.temp_dir).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(DeployError::from_io(&self.temp_dir, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::Fingerprint;
    use tempfile::TempDir;

    fn runtime(temp: &TempDir) -> StagingArchiveRuntime {
        StagingArchiveRuntime::new(temp.path().join("staging"), temp.path().join("temp"))
    }

    #[tokio::test]
    async fn write_copies_source_into_staging() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("content.json");
        std::fs::write(&source, b"{}").unwrap();

        let runtime = runtime(&temp);
        runtime.wait_for_initialised().await.unwrap();
        let record =
            FileRecord::new("pack/content.json", Fingerprint::of_bytes(b"{}")).with_source(source);
        runtime.write(&record).await.unwrap();

        let staged = temp.path().join("staging").join("pack").join("content.json");
        assert_eq!(std::fs::read(staged).unwrap(), b"{}");
    }

    #[tokio::test]
    async fn write_without_source_fails() {
        let temp = TempDir::new().unwrap();
        let runtime = runtime(&temp);
        let err = runtime
            .write(&FileRecord::new("a", Fingerprint::new("00")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn identities_cannot_escape_staging() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("x");
        std::fs::write(&source, b"x").unwrap();

        let runtime = runtime(&temp);
        let record = FileRecord::new("../outside", Fingerprint::new("00")).with_source(source);
        let err = runtime.write(&record).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert!(!temp.path().join("outside").exists());
    }

    #[tokio::test]
    async fn shutdown_clears_temp_dir() {
        let temp = TempDir::new().unwrap();
        let runtime = runtime(&temp);
        runtime.wait_for_initialised().await.unwrap();
        assert!(temp.path().join("temp").exists());

        runtime.shutdown().await.unwrap();
        assert!(!temp.path().join("temp").exists());
        runtime.shutdown().await.unwrap();
    }
}
