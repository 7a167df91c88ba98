//! Mod content discovery.

pub mod directory;

use async_trait::async_trait;

use crate::error::DeployResult;
use crate::types::Inventory;

pub use directory::DirectoryDiscovery;

/// Enumerates mod content and fingerprints it.
#[async_trait]
pub trait Discovery: Send + Sync {
    async fn discover(&self) -> DeployResult<Inventory>;
}
