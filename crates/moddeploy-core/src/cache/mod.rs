//! Versioned record of previously-deployed file state.
//!
//! The cache only ever saves work: deployment must behave the same whether
//! the file exists, is empty or is garbage.

pub mod store;

use serde::{Deserialize, Serialize};

use crate::platform::UNKNOWN_DIGEST;
use crate::types::Inventory;

pub use store::CacheStore;

/// Cache format version written by this build.
pub const CACHE_SCHEMA_VERSION: u32 = 2;

/// File name of the cache inside the cache directory.
pub const CACHE_FILE_NAME: &str = "map.json";

/// Persisted cache record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord {
    #[serde(default)]
    pub files: Inventory,

    pub schema_version: u32,

    #[serde(default = "unknown_digest")]
    pub target_digest: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl CacheRecord {
    /// Empty record at the given schema version.
    pub fn empty(schema_version: u32) -> Self {
        Self {
            files: Inventory::new(),
            schema_version,
            target_digest: UNKNOWN_DIGEST.to_string(),
            saved_at: None,
        }
    }
}

fn unknown_digest() -> String {
    UNKNOWN_DIGEST.to_string()
}
