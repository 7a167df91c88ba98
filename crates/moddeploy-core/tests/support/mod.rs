//! Counting fakes for the orchestrator's collaborators.
#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use moddeploy_core::context::DeployContext;
use moddeploy_core::deploy::ArchiveRuntime;
use moddeploy_core::detect::{Differ, detect};
use moddeploy_core::discover::Discovery;
use moddeploy_core::error::{DeployError, DeployResult};
use moddeploy_core::types::{ChangeSet, FileRecord, Fingerprint, Inventory};

pub fn inventory(entries: &[(&str, &str)]) -> Inventory {
    entries
        .iter()
        .map(|(id, fp)| FileRecord::new(*id, Fingerprint::new(*fp)))
        .collect()
}

/// Context rooted in `root`, with `game/Runtime` created and the work dir at
/// `game/Framework`.
pub fn context(root: &Path) -> DeployContext {
    let game_root = root.join("game");
    let work_dir = game_root.join("Framework");
    std::fs::create_dir_all(game_root.join("Runtime")).unwrap();
    std::fs::create_dir_all(&work_dir).unwrap();
    DeployContext::new(work_dir, game_root)
}

pub fn runtime_file(ctx: &DeployContext, name: &str) -> PathBuf {
    let path = ctx.runtime_path().join(name);
    std::fs::write(&path, b"rpkg").unwrap();
    path
}

#[derive(Default)]
pub struct FakeDiscovery {
    pub inventory: Inventory,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakeDiscovery {
    pub fn returning(inventory: Inventory) -> Arc<Self> {
        Arc::new(Self {
            inventory,
            ..Self::default()
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }
}

#[async_trait]
impl Discovery for FakeDiscovery {
    async fn discover(&self) -> DeployResult<Inventory> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DeployError::NotFound(PathBuf::from("Mods")));
        }
        Ok(self.inventory.clone())
    }
}

#[derive(Default)]
pub struct FakeDiffer {
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakeDiffer {
    pub fn working() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }
}

#[async_trait]
impl Differ for FakeDiffer {
    async fn difference(&self, cached: &Inventory, current: &Inventory) -> DeployResult<ChangeSet> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DeployError::Corrupt {
                path: PathBuf::from("diff"),
                reason: "differ unavailable".to_string(),
            });
        }
        Ok(detect(cached, current))
    }
}

/// Runtime that records writes instead of performing them.
#[derive(Default)]
pub struct FakeRuntime {
    pub init_fails: bool,
    pub failing: BTreeSet<String>,
    /// Cancelled after the first write completes.
    pub cancel_after_write: Option<CancellationToken>,
    pub init_calls: AtomicUsize,
    pub shutdown_calls: AtomicUsize,
    pub writes: Mutex<Vec<String>>,
}

impl FakeRuntime {
    pub fn working() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_init() -> Arc<Self> {
        Arc::new(Self {
            init_fails: true,
            ..Self::default()
        })
    }

    pub fn failing_writes(identities: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            failing: identities.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        })
    }

    pub fn written(&self) -> Vec<String> {
        let mut writes = self.writes.lock().unwrap().clone();
        writes.sort();
        writes
    }
}

#[async_trait]
impl ArchiveRuntime for FakeRuntime {
    async fn wait_for_initialised(&self) -> DeployResult<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if self.init_fails {
            return Err(DeployError::DependencyUnavailable(
                "archive tool missing".to_string(),
            ));
        }
        Ok(())
    }

    async fn write(&self, record: &FileRecord) -> DeployResult<()> {
        self.writes.lock().unwrap().push(record.identity.clone());
        if let Some(token) = &self.cancel_after_write {
            token.cancel();
        }
        if self.failing.contains(&record.identity) {
            return Err(DeployError::PermissionDenied(PathBuf::from(&record.identity)));
        }
        Ok(())
    }

    async fn shutdown(&self) -> DeployResult<()> {
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
