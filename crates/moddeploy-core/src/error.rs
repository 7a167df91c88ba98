//! Error taxonomy shared by every deployment stage.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::orchestrator::ExecutionPolicy;

/// Coarse classification used by the orchestrator when deciding whether a
/// failure can degrade to a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    SchemaStale,
    DependencyUnavailable,
    Io,
    Corrupt,
    Cancelled,
}

/// Errors raised by deployment stages and collaborators.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("cache schema version {found} does not match current version {current}")]
    SchemaStale { found: u32, current: u32 },

    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt data in {}: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("operation cancelled")]
    Cancelled,
}

impl DeployError {
    /// Classify an I/O failure against the path it happened on.
    pub fn from_io(path: impl AsRef<Path>, source: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            _ => Self::Io { path, source },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::SchemaStale { .. } => ErrorKind::SchemaStale,
            Self::DependencyUnavailable(_) => ErrorKind::DependencyUnavailable,
            Self::Io { .. } => ErrorKind::Io,
            Self::Corrupt { .. } => ErrorKind::Corrupt,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Whether a run under `policy` may replace the failed stage's output
    /// with its fallback and carry on.
    pub fn is_recoverable(&self, policy: ExecutionPolicy) -> bool {
        match self {
            Self::Cancelled => false,
            _ => !policy.aborts_on_error(),
        }
    }
}

/// Result type for deployment operations.
pub type DeployResult<T> = std::result::Result<T, DeployError>;
