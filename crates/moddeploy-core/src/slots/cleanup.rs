//! Reclaim mod-managed slots before a new deployment.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use super::SlotPolicy;
use crate::error::{DeployError, DeployResult};

#[derive(Debug, Default)]
pub struct CleanupReport {
    pub scanned: usize,
    pub removed: Vec<String>,
    pub retained: usize,
    pub failed: Vec<(String, DeployError)>,
    /// Set when cancellation stopped the pass before every file was visited.
    pub cancelled: bool,
}

#[derive(Debug, Clone)]
pub struct SlotManager {
    archive_dir: PathBuf,
    policy: SlotPolicy,
}

impl SlotManager {
    pub fn new(archive_dir: PathBuf, policy: SlotPolicy) -> Self {
        Self {
            archive_dir,
            policy,
        }
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    pub fn policy(&self) -> &SlotPolicy {
        &self.policy
    }

    /// Delete every reclaimable slot in the archive directory.
    ///
    /// Only failing to list the directory is an error. A file that cannot be
    /// deleted is recorded in the report and the pass moves on.
    pub async fn cleanup(&self, cancel: &CancellationToken) -> DeployResult<CleanupReport> {
        let names = self.list_file_names().await?;
        let mut report = CleanupReport::default();

        for name in names {
            if cancel.is_cancelled() {
                tracing::info!("Slot cleanup cancelled after {} files", report.scanned);
                report.cancelled = true;
                break;
            }
            report.scanned += 1;

            if !self.policy.is_reclaimable(&name) {
                report.retained += 1;
                continue;
            }

            let path = self.archive_dir.join(&name);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    tracing::debug!("Removed slot {}", name);
                    report.removed.push(name);
                }
                Err(err) => {
                    let err = DeployError::from_io(&path, err);
                    tracing::warn!("Could not remove slot {}: {}", name, err);
                    report.failed.push((name, err));
                }
            }
        }

        Ok(report)
    }

    async fn list_file_names(&self) -> DeployResult<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.archive_dir)
            .await
            .map_err(|e| DeployError::from_io(&self.archive_dir, e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DeployError::from_io(&self.archive_dir, e))?
        {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                continue;
            }
            // Non-UTF-8 names cannot match the slot patterns.
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}
