//! Advisory lock serialising runs that share a work directory.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{DeployError, DeployResult};

/// Exclusive lock on the run lock file, released on drop.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Take the lock without waiting.
    ///
    /// Fails with [`DeployError::DependencyUnavailable`] when another run
    /// already holds it.
    pub fn acquire(path: &Path) -> DeployResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| DeployError::from_io(parent, e))?;
        }
        let file = File::create(path).map_err(|e| DeployError::from_io(path, e))?;
        file.try_lock_exclusive().map_err(|e| {
            if e.kind() == fs2::lock_contended_error().kind() {
                DeployError::DependencyUnavailable(format!(
                    "another deployment holds {}",
                    path.display()
                ))
            } else {
                DeployError::from_io(path, e)
            }
        })?;
        tracing::debug!("Acquired run lock {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
