use std::fmt;
use std::time::Duration;

use crate::error::{DeployError, ErrorKind};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Resolve,
    LoadCache,
    Discover,
    Cleanup,
    Detect,
    Deploy,
    SaveCache,
    Finalize,
}

impl Stage {
    /// Stages before finalization, in the order they run.
    pub const PIPELINE: [Stage; 7] = [
        Stage::Resolve,
        Stage::LoadCache,
        Stage::Discover,
        Stage::Cleanup,
        Stage::Detect,
        Stage::Deploy,
        Stage::SaveCache,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Resolve => "resolve",
            Stage::LoadCache => "load-cache",
            Stage::Discover => "discover",
            Stage::Cleanup => "cleanup",
            Stage::Detect => "detect",
            Stage::Deploy => "deploy",
            Stage::SaveCache => "save-cache",
            Stage::Finalize => "finalize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Completed,
    /// Failed; the stage's fallback output was used and the run went on.
    Degraded { kind: ErrorKind, message: String },
    /// Failed under the strict policy; later stages were skipped.
    Failed { kind: ErrorKind, message: String },
    /// Not run because of an earlier abort or a cancellation.
    Skipped,
}

impl StageStatus {
    pub(crate) fn from_error(err: &DeployError, aborting: bool) -> Self {
        let kind = err.kind();
        let message = err.to_string();
        if aborting {
            StageStatus::Failed { kind, message }
        } else {
            StageStatus::Degraded { kind, message }
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, StageStatus::Degraded { .. } | StageStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRecord {
    pub stage: Stage,
    pub status: StageStatus,
    pub elapsed: Duration,
}
