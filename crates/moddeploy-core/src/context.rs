//! Immutable run configuration.

use std::path::{Path, PathBuf};

use crate::cache::{CACHE_SCHEMA_VERSION, CacheStore};
use crate::config::{ConfigFile, resolve_against};
use crate::deploy::{DEFAULT_DEPLOY_CONCURRENCY, StagingArchiveRuntime};
use crate::discover::DirectoryDiscovery;
use crate::orchestrator::ExecutionPolicy;
use crate::platform::{DigestTable, PlatformResolver, install_markers};
use crate::slots::{SlotManager, SlotPolicy};

const DEFAULT_BYPASS_MARKER: &str = "bypass.txt";

/// Values that outrank the config file, typically from the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub policy: Option<ExecutionPolicy>,
    pub concurrency: Option<usize>,
    pub game_root: Option<PathBuf>,
    pub mods_dir: Option<PathBuf>,
}

/// Everything a deployment run needs to know, built once at process start.
///
/// Frontends construct this and hand it to the orchestrator; nothing below
/// reads ambient process state.
#[derive(Debug, Clone)]
pub struct DeployContext {
    work_dir: PathBuf,
    game_root: PathBuf,
    retail_path: PathBuf,
    runtime_path: PathBuf,
    mods_dir: PathBuf,
    /// Explicit marker candidates; `None` picks one from the install layout.
    markers: Option<Vec<PathBuf>>,
    platforms: DigestTable,
    policy: ExecutionPolicy,
    schema_version: u32,
    slot_policy: SlotPolicy,
    concurrency: usize,
    bypass_marker: PathBuf,
}

impl DeployContext {
    /// Context with default layout: `Retail/` and `Runtime/` under the game
    /// root, everything else under the work dir.
    pub fn new(work_dir: PathBuf, game_root: PathBuf) -> Self {
        Self {
            retail_path: game_root.join("Retail"),
            runtime_path: game_root.join("Runtime"),
            mods_dir: work_dir.join("Mods"),
            bypass_marker: work_dir.join(DEFAULT_BYPASS_MARKER),
            markers: None,
            platforms: DigestTable::builtin(),
            policy: ExecutionPolicy::default(),
            schema_version: CACHE_SCHEMA_VERSION,
            slot_policy: SlotPolicy::default(),
            concurrency: DEFAULT_DEPLOY_CONCURRENCY,
            game_root,
            work_dir,
        }
    }

    /// Fold a config file and overrides over the defaults, then honour the
    /// bypass marker.
    pub fn from_config(work_dir: PathBuf, file: &ConfigFile, overrides: &ConfigOverrides) -> Self {
        let game_root = overrides
            .game_root
            .clone()
            .or_else(|| file.install.game_root.clone())
            .map(|p| resolve_against(&work_dir, &p))
            .unwrap_or_else(|| default_game_root(&work_dir));

        let mut ctx = Self::new(work_dir, game_root);

        if let Some(retail) = &file.install.retail_path {
            ctx.retail_path = resolve_against(&ctx.work_dir, retail);
        }
        if let Some(runtime) = &file.install.runtime_path {
            ctx.runtime_path = resolve_against(&ctx.work_dir, runtime);
        }
        if let Some(markers) = &file.install.markers {
            ctx.markers = Some(
                markers
                    .iter()
                    .map(|m| resolve_against(&ctx.game_root, m))
                    .collect(),
            );
        }
        if let Some(mods) = overrides.mods_dir.as_ref().or(file.deploy.mods_dir.as_ref()) {
            ctx.mods_dir = resolve_against(&ctx.work_dir, mods);
        }
        if let Some(marker) = &file.deploy.bypass_marker {
            ctx.bypass_marker = resolve_against(&ctx.work_dir, marker);
        }

        ctx.platforms = DigestTable::builtin().with_names(&file.platforms);
        if let Some(policy) = overrides.policy.or(file.deploy.policy) {
            ctx.policy = policy;
        }
        if let Some(concurrency) = overrides.concurrency.or(file.deploy.concurrency) {
            ctx.concurrency = concurrency.max(1);
        }
        if let Some(min) = file.slots.reserved_patch_min {
            ctx.slot_policy.reserved_patches = min..=*ctx.slot_policy.reserved_patches.end();
        }
        if let Some(max) = file.slots.reserved_patch_max {
            ctx.slot_policy.reserved_patches = *ctx.slot_policy.reserved_patches.start()..=max;
        }
        if let Some(threshold) = file.slots.base_chunk_threshold {
            ctx.slot_policy.base_chunk_threshold = threshold;
        }

        ctx.apply_bypass_marker()
    }

    /// Switch to [`ExecutionPolicy::Bypass`] when the bypass marker exists.
    pub fn apply_bypass_marker(mut self) -> Self {
        if self.bypass_marker.exists() && self.policy != ExecutionPolicy::Bypass {
            tracing::warn!(
                "{} detected, installation checks will be skipped",
                self.bypass_marker.display()
            );
            self.policy = ExecutionPolicy::Bypass;
        }
        self
    }

    pub fn with_policy(mut self, policy: ExecutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_runtime_path(mut self, runtime_path: PathBuf) -> Self {
        self.runtime_path = runtime_path;
        self
    }

    pub fn with_mods_dir(mut self, mods_dir: PathBuf) -> Self {
        self.mods_dir = mods_dir;
        self
    }

    pub fn with_markers(mut self, markers: Vec<PathBuf>) -> Self {
        self.markers = Some(markers);
        self
    }

    pub fn with_platforms(mut self, platforms: DigestTable) -> Self {
        self.platforms = platforms;
        self
    }

    pub fn with_slot_policy(mut self, slot_policy: SlotPolicy) -> Self {
        self.slot_policy = slot_policy;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_schema_version(mut self, schema_version: u32) -> Self {
        self.schema_version = schema_version;
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn game_root(&self) -> &Path {
        &self.game_root
    }

    pub fn retail_path(&self) -> &Path {
        &self.retail_path
    }

    /// Directory holding the archive chunks and patches.
    pub fn runtime_path(&self) -> &Path {
        &self.runtime_path
    }

    pub fn mods_dir(&self) -> &Path {
        &self.mods_dir
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.work_dir.join("cache")
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.work_dir.join("staging")
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.work_dir.join("temp")
    }

    /// Marker files the platform resolver tries, in order.
    pub fn marker_candidates(&self) -> Vec<PathBuf> {
        match &self.markers {
            Some(markers) => markers.clone(),
            None => install_markers(&self.retail_path, &self.runtime_path),
        }
    }

    pub fn policy(&self) -> ExecutionPolicy {
        self.policy
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn slot_policy(&self) -> &SlotPolicy {
        &self.slot_policy
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn bypass_marker(&self) -> &Path {
        &self.bypass_marker
    }

    /// Lock file guarding the cache against concurrent runs.
    pub fn run_lock_path(&self) -> PathBuf {
        self.cache_dir().join(".lock")
    }

    pub fn cache_store(&self) -> CacheStore {
        CacheStore::new(&self.cache_dir(), self.schema_version)
    }

    pub fn platform_resolver(&self) -> PlatformResolver {
        PlatformResolver::new(self.marker_candidates(), self.platforms.clone())
    }

    pub fn slot_manager(&self) -> SlotManager {
        SlotManager::new(self.runtime_path.clone(), self.slot_policy.clone())
    }

    pub fn directory_discovery(&self) -> DirectoryDiscovery {
        DirectoryDiscovery::new(self.mods_dir.clone())
    }

    pub fn staging_runtime(&self) -> StagingArchiveRuntime {
        StagingArchiveRuntime::new(self.staging_dir(), self.temp_dir())
    }
}

fn default_game_root(work_dir: &Path) -> PathBuf {
    work_dir
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| work_dir.to_path_buf())
}
