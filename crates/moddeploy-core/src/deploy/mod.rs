//! Deployment: the archive runtime seam and the executor driving it.

pub mod executor;
pub mod runtime;

pub use executor::{DEFAULT_DEPLOY_CONCURRENCY, DeployReport, DeploymentExecutor};
pub use runtime::{ArchiveRuntime, StagingArchiveRuntime};
