//! The staged deployment pipeline.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use super::report::{RunOutcome, RunReport, format_elapsed};
use super::stage::{Stage, StageRecord, StageStatus};
use crate::cache::CacheRecord;
use crate::context::DeployContext;
use crate::deploy::{ArchiveRuntime, DeployReport, DeploymentExecutor};
use crate::detect::{Differ, FingerprintDiffer};
use crate::discover::Discovery;
use crate::error::{DeployError, DeployResult};
use crate::platform::{PlatformResolution, PlatformResolver};
use crate::slots::CleanupReport;
use crate::telemetry::{NoopSpan, Span};
use crate::types::{ChangeSet, Inventory};

/// Stage outputs. Every field starts at its stage's fallback value.
struct RunState {
    resolution: PlatformResolution,
    cache: CacheRecord,
    current: Inventory,
    cleanup: CleanupReport,
    changes: Option<ChangeSet>,
    deploy: DeployReport,
    runtime_ready: bool,
    cache_saved: bool,
}

impl RunState {
    fn new(schema_version: u32) -> Self {
        Self {
            resolution: PlatformResolution::unknown(),
            cache: CacheRecord::empty(schema_version),
            current: Inventory::new(),
            cleanup: CleanupReport::default(),
            changes: None,
            deploy: DeployReport::default(),
            runtime_ready: false,
            cache_saved: false,
        }
    }
}

/// Runs `Resolve -> LoadCache -> Discover -> Cleanup -> Detect -> Deploy ->
/// SaveCache -> Finalize` under the context's
/// [`ExecutionPolicy`](super::ExecutionPolicy).
///
/// `Finalize` runs exactly once whatever happened before it; once it
/// returns the run has exited.
pub struct Orchestrator {
    ctx: DeployContext,
    discovery: Arc<dyn Discovery>,
    differ: Arc<dyn Differ>,
    runtime: Arc<dyn ArchiveRuntime>,
    span: Box<dyn Span>,
}

impl Orchestrator {
    pub fn new(
        ctx: DeployContext,
        discovery: Arc<dyn Discovery>,
        differ: Arc<dyn Differ>,
        runtime: Arc<dyn ArchiveRuntime>,
    ) -> Self {
        Self {
            ctx,
            discovery,
            differ,
            runtime,
            span: Box::new(NoopSpan),
        }
    }

    /// Orchestrator wired to the directory discovery and staging runtime.
    pub fn from_context(ctx: DeployContext) -> Self {
        let discovery = Arc::new(ctx.directory_discovery());
        let runtime = Arc::new(ctx.staging_runtime());
        Self::new(ctx, discovery, Arc::new(FingerprintDiffer), runtime)
    }

    pub fn with_span(mut self, span: Box<dyn Span>) -> Self {
        self.span = span;
        self
    }

    pub fn context(&self) -> &DeployContext {
        &self.ctx
    }

    pub async fn run(self, cancel: &CancellationToken) -> RunReport {
        let started = Instant::now();
        let policy = self.ctx.policy();
        let mut state = RunState::new(self.ctx.schema_version());
        let mut stages = Vec::with_capacity(Stage::PIPELINE.len() + 1);
        let mut aborted = false;

        tracing::info!("Starting deployment ({} policy)", policy);

        for stage in Stage::PIPELINE {
            if aborted || cancel.is_cancelled() {
                stages.push(StageRecord {
                    stage,
                    status: StageStatus::Skipped,
                    elapsed: Default::default(),
                });
                continue;
            }

            let span = self.span.start_child(stage.as_str());
            let stage_started = Instant::now();
            tracing::debug!("Entering stage {}", stage);
            let result = self.run_stage(stage, &mut state, cancel).await;
            span.finish();

            let status = match result {
                Ok(()) => StageStatus::Completed,
                Err(err) if !err.is_recoverable(policy) => {
                    tracing::error!("Stage {} failed, aborting: {}", stage, err);
                    aborted = true;
                    StageStatus::from_error(&err, true)
                }
                Err(err) => {
                    tracing::warn!("Stage {} failed, continuing with fallback: {}", stage, err);
                    StageStatus::from_error(&err, false)
                }
            };
            stages.push(StageRecord {
                stage,
                status,
                elapsed: stage_started.elapsed(),
            });
        }

        let outcome = if cancel.is_cancelled() {
            RunOutcome::Cancelled
        } else if aborted {
            RunOutcome::Failed
        } else {
            RunOutcome::Succeeded
        };

        self.finalize(state, stages, outcome, started).await
    }

    async fn run_stage(
        &self,
        stage: Stage,
        state: &mut RunState,
        cancel: &CancellationToken,
    ) -> DeployResult<()> {
        match stage {
            Stage::Resolve => self.resolve(state).await,
            Stage::LoadCache => self.load_cache(state).await,
            Stage::Discover => self.discover(state).await,
            Stage::Cleanup => self.cleanup(state, cancel).await,
            Stage::Detect => self.detect(state).await,
            Stage::Deploy => self.deploy(state, cancel).await,
            Stage::SaveCache => self.save_cache(state).await,
            Stage::Finalize => Ok(()),
        }
    }

    async fn resolve(&self, state: &mut RunState) -> DeployResult<()> {
        if self.ctx.policy().checks_preconditions() {
            self.check_installation().await?;
        } else {
            tracing::info!("Bypass active, skipping installation checks");
        }

        let resolver: PlatformResolver = self.ctx.platform_resolver();
        state.resolution = resolver.resolve().await;
        tracing::info!("Detected platform: {}", state.resolution.platform);
        Ok(())
    }

    async fn check_installation(&self) -> DeployResult<()> {
        let runtime_path = self.ctx.runtime_path();
        let metadata = tokio::fs::metadata(runtime_path)
            .await
            .map_err(|e| DeployError::from_io(runtime_path, e))?;
        if !metadata.is_dir() {
            return Err(DeployError::NotFound(runtime_path.to_path_buf()));
        }
        Ok(())
    }

    async fn load_cache(&self, state: &mut RunState) -> DeployResult<()> {
        let store = self.ctx.cache_store();
        match store.try_load().await {
            Ok(record) => {
                tracing::info!("Loaded {} cached entries", record.files.len());
                state.cache = record;
                Ok(())
            }
            Err(DeployError::NotFound(_)) => {
                tracing::info!("No cache yet, every entry will be deployed");
                Ok(())
            }
            Err(err @ DeployError::SchemaStale { .. }) => {
                tracing::info!("Discarding cache: {}", err);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn discover(&self, state: &mut RunState) -> DeployResult<()> {
        tracing::info!("Discovering mods");
        state.current = self.discovery.discover().await?;
        tracing::info!("Discovered {} entries", state.current.len());
        Ok(())
    }

    async fn cleanup(&self, state: &mut RunState, cancel: &CancellationToken) -> DeployResult<()> {
        self.runtime
            .wait_for_initialised()
            .await
            .map_err(|err| match err {
                DeployError::DependencyUnavailable(_) => err,
                other => DeployError::DependencyUnavailable(other.to_string()),
            })?;
        state.runtime_ready = true;

        state.cleanup = self.ctx.slot_manager().cleanup(cancel).await?;
        tracing::info!(
            "Removed {} mod slots ({} could not be removed)",
            state.cleanup.removed.len(),
            state.cleanup.failed.len()
        );
        Ok(())
    }

    async fn detect(&self, state: &mut RunState) -> DeployResult<()> {
        tracing::info!("Diffing files");
        let changes = self
            .differ
            .difference(&state.cache.files, &state.current)
            .await?;
        for err in &changes.errors {
            tracing::warn!("Change detection: {}", err);
        }
        tracing::info!(
            "{} of {} entries need deployment",
            changes.stale.len(),
            state.current.len()
        );
        state.changes = Some(changes);
        Ok(())
    }

    async fn deploy(&self, state: &mut RunState, cancel: &CancellationToken) -> DeployResult<()> {
        let Some(changes) = state.changes.as_ref() else {
            tracing::info!("No change set, nothing to deploy");
            return Ok(());
        };
        if changes.is_empty() {
            tracing::info!("Everything is up to date");
            return Ok(());
        }
        if !state.runtime_ready {
            return Err(DeployError::DependencyUnavailable(
                "archive runtime was not initialised".to_string(),
            ));
        }

        let executor = DeploymentExecutor::new(self.runtime.clone(), self.ctx.concurrency());
        state.deploy = executor.execute(changes, &state.current, cancel).await;
        tracing::info!(
            "Deployed {} of {} entries ({} failed, {} skipped)",
            state.deploy.succeeded_count(),
            changes.stale.len(),
            state.deploy.failed_count(),
            state.deploy.skipped
        );

        if state.deploy.failed_count() > 0 {
            return Err(DeployError::Io {
                path: self.ctx.runtime_path().to_path_buf(),
                source: std::io::Error::other(format!(
                    "{} of {} writes failed",
                    state.deploy.failed_count(),
                    state.deploy.attempted
                )),
            });
        }
        Ok(())
    }

    async fn save_cache(&self, state: &mut RunState) -> DeployResult<()> {
        let files = settled_inventory(
            &state.cache.files,
            &state.current,
            state.changes.as_ref(),
            &state.deploy.succeeded,
        );
        self.ctx
            .cache_store()
            .save(&files, &state.resolution.target_digest)
            .await?;
        state.cache_saved = true;
        Ok(())
    }

    async fn finalize(
        self,
        state: RunState,
        mut stages: Vec<StageRecord>,
        outcome: RunOutcome,
        started: Instant,
    ) -> RunReport {
        let finalize_started = Instant::now();
        let span = self.span.start_child(Stage::Finalize.as_str());

        let status = match self.runtime.shutdown().await {
            Ok(()) => StageStatus::Completed,
            Err(err) => {
                tracing::warn!("Archive runtime shutdown failed: {}", err);
                StageStatus::from_error(&err, false)
            }
        };
        span.finish();
        stages.push(StageRecord {
            stage: Stage::Finalize,
            status,
            elapsed: finalize_started.elapsed(),
        });

        let elapsed = started.elapsed();
        let human = format_elapsed(elapsed);
        let human = if human.is_empty() {
            "less than a second".to_string()
        } else {
            human
        };
        match outcome {
            RunOutcome::Succeeded => tracing::info!("Done in {}", human),
            RunOutcome::Failed => tracing::error!("Deployment failed after {}", human),
            RunOutcome::Cancelled => tracing::warn!("Deployment cancelled after {}", human),
        }
        self.span.finish();

        RunReport {
            policy: self.ctx.policy(),
            platform: state.resolution.platform,
            target_digest: state.resolution.target_digest,
            stages,
            discovered: state.current.len(),
            stale: state.changes.as_ref().map_or(0, |c| c.stale.len()),
            slots_removed: state.cleanup.removed.len(),
            slot_failures: state.cleanup.failed.len(),
            deploy_attempted: state.deploy.attempted,
            deploy_succeeded: state.deploy.succeeded_count(),
            deploy_failed: state.deploy.failed_count(),
            cache_saved: state.cache_saved,
            outcome,
            elapsed,
        }
    }
}

/// The inventory to persist after a run.
///
/// An identity is settled when detection found it unchanged or when its
/// write succeeded; settled identities are saved with their current
/// fingerprint. Unsettled ones keep their previous cached entry, or are
/// left out, so the next run picks them up again.
pub fn settled_inventory(
    cached: &Inventory,
    current: &Inventory,
    changes: Option<&ChangeSet>,
    deployed: &BTreeSet<String>,
) -> Inventory {
    let mut files = Inventory::new();
    for record in current.records() {
        let settled = changes.is_some_and(|changes| {
            !changes.is_stale(&record.identity) || deployed.contains(&record.identity)
        });
        if settled {
            files.insert(record.clone());
        } else if let Some(previous) = cached.get(&record.identity) {
            files.insert(previous.clone());
        }
    }
    files
}
