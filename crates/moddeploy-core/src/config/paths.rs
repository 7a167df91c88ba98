//! Config path resolution helpers.

use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "moddeploy.toml";

/// Pick the config file for a work dir.
///
/// A file next to the work dir wins over the per-user one.
pub fn config_path_for_work_dir(work_dir: &Path, global_dir: &Path) -> PathBuf {
    let local = work_dir.join(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    global_dir.join(CONFIG_FILE_NAME)
}

/// Resolve a possibly relative path against a base directory.
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
