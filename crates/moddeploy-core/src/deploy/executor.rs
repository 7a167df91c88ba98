//! Execute a change set against the archive runtime.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use super::runtime::ArchiveRuntime;
use crate::error::DeployError;
use crate::types::{ChangeSet, Inventory};

pub const DEFAULT_DEPLOY_CONCURRENCY: usize = 4;

#[derive(Debug, Default)]
pub struct DeployReport {
    pub attempted: usize,
    pub succeeded: BTreeSet<String>,
    pub failed: Vec<(String, DeployError)>,
    /// Stale entries never started because the run was cancelled.
    pub skipped: usize,
}

impl DeployReport {
    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

/// Drives one write per stale identity, with bounded concurrency.
#[derive(Clone)]
pub struct DeploymentExecutor {
    runtime: Arc<dyn ArchiveRuntime>,
    concurrency: usize,
}

impl DeploymentExecutor {
    pub fn new(runtime: Arc<dyn ArchiveRuntime>, concurrency: usize) -> Self {
        Self {
            runtime,
            concurrency: concurrency.max(1),
        }
    }

    /// Attempt every stale identity.
    ///
    /// A failed write is recorded against its identity and never stops the
    /// batch. Writes that have not started when `cancel` fires are skipped;
    /// writes already in flight finish.
    pub async fn execute(
        &self,
        changes: &ChangeSet,
        inventory: &Inventory,
        cancel: &CancellationToken,
    ) -> DeployReport {
        let outcomes: Vec<(String, Option<Result<(), DeployError>>)> =
            futures::stream::iter(changes.stale.iter())
                .map(|identity| async move {
                    if cancel.is_cancelled() {
                        return (identity.clone(), None);
                    }
                    let result = match inventory.get(identity) {
                        Some(record) => self.runtime.write(record).await,
                        None => Err(DeployError::NotFound(PathBuf::from(identity))),
                    };
                    (identity.clone(), Some(result))
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        let mut report = DeployReport::default();
        for (identity, outcome) in outcomes {
            match outcome {
                None => report.skipped += 1,
                Some(Ok(())) => {
                    report.attempted += 1;
                    report.succeeded.insert(identity);
                }
                Some(Err(err)) => {
                    report.attempted += 1;
                    tracing::warn!("Failed to deploy {}: {}", identity, err);
                    report.failed.push((identity, err));
                }
            }
        }
        report.failed.sort_by(|a, b| a.0.cmp(&b.0));
        report
    }
}

impl std::fmt::Debug for DeploymentExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentExecutor")
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}
