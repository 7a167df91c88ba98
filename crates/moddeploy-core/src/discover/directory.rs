//! Deterministic directory walk producing an inventory.
//!
//! Identity is the forward-slash path relative to the mods directory and
//! the fingerprint is `blake3(content)`. Entries are visited in sorted order
//! so logs and errors are stable between runs.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::Discovery;
use crate::error::{DeployError, DeployResult};
use crate::types::{FileRecord, Fingerprint, Inventory};

#[derive(Debug, Clone)]
pub struct DirectoryDiscovery {
    root: PathBuf,
}

impl DirectoryDiscovery {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl Discovery for DirectoryDiscovery {
    async fn discover(&self) -> DeployResult<Inventory> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || scan_tree(&root))
            .await
            .map_err(|e| DeployError::Io {
                path: self.root.clone(),
                source: std::io::Error::other(e),
            })?
    }
}

/// Walk `root` and fingerprint every regular file.
///
/// Symlinks are rejected rather than followed.
pub fn scan_tree(root: &Path) -> DeployResult<Inventory> {
    let mut inventory = Inventory::new();
    scan_dir_recursive(&mut inventory, root, "")?;
    Ok(inventory)
}

fn scan_dir_recursive(inventory: &mut Inventory, dir: &Path, base: &str) -> DeployResult<()> {
    let entries = fs::read_dir(dir).map_err(|e| DeployError::from_io(dir, e))?;

    // Collect and sort entries for deterministic ordering
    let mut sorted_entries: Vec<_> = entries
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DeployError::from_io(dir, e))?;
    sorted_entries.sort_by_key(|e| e.file_name());

    for entry in sorted_entries {
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        let rel_path = if base.is_empty() {
            name_str.to_string()
        } else {
            format!("{}/{}", base, name_str)
        };

        let path = entry.path();
        let ty = entry
            .file_type()
            .map_err(|e| DeployError::from_io(&path, e))?;

        if ty.is_dir() {
            scan_dir_recursive(inventory, &path, &rel_path)?;
        } else if ty.is_file() {
            let content = fs::read(&path).map_err(|e| DeployError::from_io(&path, e))?;
            inventory.insert(
                FileRecord::new(rel_path, Fingerprint::of_bytes(&content)).with_source(path),
            );
        } else {
            return Err(DeployError::Corrupt {
                path,
                reason: "symlinks and special files are not supported".to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create_dir_all should succeed in test temp dirs");
        }
        fs::write(path, content).expect("write should succeed in test temp dirs");
    }

    #[tokio::test]
    async fn test_empty_directory_has_empty_inventory() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let inventory = DirectoryDiscovery::new(tmp.path().to_path_buf())
            .discover()
            .await
            .expect("discover should succeed");
        assert!(inventory.is_empty());
    }

    #[tokio::test]
    async fn test_nested_identities_use_forward_slashes() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        write_file(&tmp.path().join("level1.txt"), "level1");
        write_file(&tmp.path().join("pack").join("level2.txt"), "level2");
        write_file(
            &tmp.path().join("pack").join("deep").join("level3.txt"),
            "level3",
        );

        let inventory = DirectoryDiscovery::new(tmp.path().to_path_buf())
            .discover()
            .await
            .expect("discover should succeed");

        let ids: Vec<&str> = inventory.identities().collect();
        assert_eq!(ids, vec!["level1.txt", "pack/deep/level3.txt", "pack/level2.txt"]);
        let record = inventory.get("pack/level2.txt").expect("record present");
        assert_eq!(record.fingerprint, Fingerprint::of_bytes(b"level2"));
        assert_eq!(
            record.source.as_deref(),
            Some(tmp.path().join("pack").join("level2.txt").as_path())
        );
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let file = tmp.path().join("test.txt");
        write_file(&file, "original content");
        let first = scan_tree(tmp.path()).expect("scan should succeed");

        write_file(&file, "modified content");
        let second = scan_tree(tmp.path()).expect("scan should succeed");

        assert_ne!(
            first.get("test.txt").map(|r| r.fingerprint.clone()),
            second.get("test.txt").map(|r| r.fingerprint.clone())
        );
    }

    #[test]
    fn test_nonexistent_path_fails() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let err = scan_tree(&tmp.path().join("missing")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_rejected() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        write_file(&tmp.path().join("real.txt"), "content");
        std::os::unix::fs::symlink(tmp.path().join("real.txt"), tmp.path().join("link.txt"))
            .expect("symlink should succeed");

        let err = scan_tree(tmp.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corrupt);
    }
}
