//! Cache persistence inside the work directory.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{CACHE_FILE_NAME, CacheRecord};
use crate::error::{DeployError, DeployResult};
use crate::types::Inventory;

/// Only the version is read before trusting the rest of the file.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheHeader {
    #[serde(default)]
    schema_version: u32,
}

/// Cache storage and persistence.
///
/// One cache file per target: `<cache_dir>/map.json`. Saves go through a
/// temp file and a rename so a crash mid-write never leaves a truncated
/// record behind.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
    schema_version: u32,
}

impl CacheStore {
    pub fn new(cache_dir: &Path, schema_version: u32) -> Self {
        Self {
            path: cache_dir.join(CACHE_FILE_NAME),
            schema_version,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Load the cache, treating every failure as an empty record.
    pub async fn load(&self) -> CacheRecord {
        match self.try_load().await {
            Ok(record) => record,
            Err(DeployError::NotFound(_)) => {
                tracing::debug!("No cache at {}, starting fresh", self.path.display());
                CacheRecord::empty(self.schema_version)
            }
            Err(err) => {
                tracing::warn!("Discarding cache: {}", err);
                CacheRecord::empty(self.schema_version)
            }
        }
    }

    /// Load the cache, reporting why it could not be used.
    pub async fn try_load(&self) -> DeployResult<CacheRecord> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| DeployError::from_io(&self.path, e))?;

        let header: CacheHeader = serde_json::from_slice(&bytes).map_err(|e| self.corrupt(e))?;
        if header.schema_version != self.schema_version {
            return Err(DeployError::SchemaStale {
                found: header.schema_version,
                current: self.schema_version,
            });
        }

        let record: CacheRecord = serde_json::from_slice(&bytes).map_err(|e| self.corrupt(e))?;
        if let Some((key, file)) = record.files.misfiled() {
            return Err(DeployError::Corrupt {
                path: self.path.clone(),
                reason: format!("entry '{}' holds record for '{}'", key, file.identity),
            });
        }
        Ok(record)
    }

    /// Replace the cache with `files`.
    pub async fn save(&self, files: &Inventory, target_digest: &str) -> DeployResult<()> {
        let record = CacheRecord {
            files: files.clone(),
            schema_version: self.schema_version,
            target_digest: target_digest.to_string(),
            saved_at: Some(chrono::Utc::now()),
        };

        let bytes = serde_json::to_vec_pretty(&record).map_err(|e| self.corrupt(e))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DeployError::from_io(parent, e))?;
        }

        let tmp_path = self
            .path
            .with_extension(format!("json.{}.tmp", std::process::id()));
        tokio::fs::write(&tmp_path, bytes)
            .await
            .map_err(|e| DeployError::from_io(&tmp_path, e))?;

        if let Err(err) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(DeployError::from_io(&self.path, err));
        }

        tracing::debug!("Saved {} cache entries to {}", files.len(), self.path.display());
        Ok(())
    }

    fn corrupt(&self, err: serde_json::Error) -> DeployError {
        DeployError::Corrupt {
            path: self.path.clone(),
            reason: err.to_string(),
        }
    }
}
