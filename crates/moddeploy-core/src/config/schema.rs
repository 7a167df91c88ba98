//! Configuration schema for moddeploy.toml
//!
//! Every field is optional; anything left out falls back to the defaults
//! baked into [`crate::context::DeployContext`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::orchestrator::ExecutionPolicy;

/// Root configuration structure for moddeploy.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub install: InstallSection,

    #[serde(default)]
    pub deploy: DeploySection,

    #[serde(default)]
    pub slots: SlotSection,

    /// Marker digest -> platform name (`epic`, `steam`, `microsoft`)
    #[serde(default)]
    pub platforms: BTreeMap<String, String>,
}

/// Where the target application is installed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstallSection {
    /// Installation root (relative paths resolve against the work dir)
    pub game_root: Option<PathBuf>,

    /// Directory holding the retail binaries
    pub retail_path: Option<PathBuf>,

    /// Directory holding the archive chunks and patches
    pub runtime_path: Option<PathBuf>,

    /// Platform marker candidates, relative to the game root, in priority order
    pub markers: Option<Vec<PathBuf>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploySection {
    pub policy: Option<ExecutionPolicy>,

    /// Directory scanned for mod content
    pub mods_dir: Option<PathBuf>,

    /// Maximum number of concurrent archive writes
    pub concurrency: Option<usize>,

    /// File whose presence forces the bypass policy
    pub bypass_marker: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlotSection {
    pub reserved_patch_min: Option<u32>,
    pub reserved_patch_max: Option<u32>,
    pub base_chunk_threshold: Option<u32>,
}

impl ConfigFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if let (Some(min), Some(max)) = (self.slots.reserved_patch_min, self.slots.reserved_patch_max)
            && min > max
        {
            anyhow::bail!("Reserved patch range is inverted: {} > {}", min, max);
        }
        if self.deploy.concurrency == Some(0) {
            anyhow::bail!("Deploy concurrency must be at least 1");
        }
        for (digest, name) in &self.platforms {
            if crate::platform::Platform::from_name(name).is_none() {
                anyhow::bail!("Unknown platform '{}' for digest {}", name, digest);
            }
        }
        Ok(())
    }
}
