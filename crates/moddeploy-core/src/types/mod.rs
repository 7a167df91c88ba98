//! Shared core types used across discovery, caching and deployment.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::DeployError;

/// Content digest of a discovered file (blake3, hex encoded).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Fingerprint raw bytes.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One discovered content unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub identity: String,
    pub fingerprint: Fingerprint,
    /// Where discovery found the content. Not part of change detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

impl FileRecord {
    pub fn new(identity: impl Into<String>, fingerprint: Fingerprint) -> Self {
        Self {
            identity: identity.into(),
            fingerprint,
            source: None,
        }
    }

    pub fn with_source(mut self, source: PathBuf) -> Self {
        self.source = Some(source);
        self
    }
}

/// Snapshot of discovered content keyed by identity.
///
/// Identities are unique by construction: inserting a record for an
/// existing identity replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory(BTreeMap<String, FileRecord>);

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: FileRecord) -> Option<FileRecord> {
        self.0.insert(record.identity.clone(), record)
    }

    pub fn get(&self, identity: &str) -> Option<&FileRecord> {
        self.0.get(identity)
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.0.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn identities(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.0.values()
    }

    /// First entry whose key differs from its record's identity. Only a
    /// hand-edited or damaged file can produce one.
    pub fn misfiled(&self) -> Option<(&str, &FileRecord)> {
        self.0
            .iter()
            .find(|(key, record)| **key != record.identity)
            .map(|(key, record)| (key.as_str(), record))
    }
}

impl FromIterator<FileRecord> for Inventory {
    fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
        let mut inventory = Inventory::new();
        for record in iter {
            inventory.insert(record);
        }
        inventory
    }
}

/// Identities requiring redeployment, plus non-fatal errors hit while
/// computing them.
#[derive(Debug, Default)]
pub struct ChangeSet {
    pub stale: BTreeSet<String>,
    pub errors: Vec<DeployError>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.stale.is_empty()
    }

    pub fn is_stale(&self, identity: &str) -> bool {
        self.stale.contains(identity)
    }
}
