//! Config store for locating and loading moddeploy.toml.

use std::path::{Path, PathBuf};

use super::{ConfigFile, parser, paths::config_path_for_work_dir};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    /// Locate the config for a work dir, falling back to the per-user config directory.
    pub fn for_work_dir(work_dir: &Path) -> Self {
        let global_dir = dirs::config_dir()
            .map(|p| p.join("moddeploy"))
            .unwrap_or_else(|| work_dir.to_path_buf());
        Self::from_paths(work_dir, &global_dir)
    }

    pub fn from_paths(work_dir: &Path, global_dir: &Path) -> Self {
        Self {
            config_path: config_path_for_work_dir(work_dir, global_dir),
        }
    }

    pub fn at(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn load(&self) -> anyhow::Result<ConfigFile> {
        if !self.config_path.exists() {
            return Ok(ConfigFile::new());
        }
        parser::parse_config_toml(&self.config_path)
    }
}
