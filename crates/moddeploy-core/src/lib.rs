//! Moddeploy Core Library
//!
//! Incremental mod deployment: detects which mod files changed since the
//! last run, reclaims reserved archive slots and redeploys only what is
//! stale, under a strict, resilient or bypass execution policy.

pub mod cache;
pub mod config;
pub mod context;
pub mod deploy;
pub mod detect;
pub mod discover;
pub mod error;
pub mod lock;
pub mod orchestrator;
pub mod platform;
pub mod slots;
pub mod telemetry;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{ConfigFile, ConfigStore};
    pub use crate::context::{ConfigOverrides, DeployContext};

    // Errors
    pub use crate::error::{DeployError, DeployResult, ErrorKind};

    // Domain types
    pub use crate::types::{ChangeSet, FileRecord, Fingerprint, Inventory};

    // Collaborators
    pub use crate::deploy::{ArchiveRuntime, DeploymentExecutor, StagingArchiveRuntime};
    pub use crate::detect::{Differ, FingerprintDiffer};
    pub use crate::discover::{DirectoryDiscovery, Discovery};

    // Pipeline
    pub use crate::lock::RunLock;
    pub use crate::orchestrator::{
        ExecutionPolicy, Orchestrator, RunOutcome, RunReport, Stage, StageStatus,
    };
    pub use crate::platform::{Platform, PlatformResolution};
    pub use crate::telemetry::{NoopSpan, Span, TracingSpan};
}
