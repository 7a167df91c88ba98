//! Summary of a finished run.

use std::time::Duration;

use super::policy::ExecutionPolicy;
use super::stage::{Stage, StageRecord, StageStatus};
use crate::platform::Platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub policy: ExecutionPolicy,
    pub platform: Platform,
    pub target_digest: String,
    pub stages: Vec<StageRecord>,
    pub discovered: usize,
    pub stale: usize,
    pub slots_removed: usize,
    pub slot_failures: usize,
    pub deploy_attempted: usize,
    pub deploy_succeeded: usize,
    pub deploy_failed: usize,
    pub cache_saved: bool,
    pub outcome: RunOutcome,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn status_of(&self, stage: Stage) -> Option<&StageStatus> {
        self.stages
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.status)
    }

    /// Stages that hit an error, whether degraded or fatal.
    pub fn failed_stages(&self) -> Vec<Stage> {
        self.stages
            .iter()
            .filter(|r| r.status.is_error())
            .map(|r| r.stage)
            .collect()
    }

    /// Process exit status: only the strict policy can report failure.
    pub fn exit_success(&self) -> bool {
        match self.policy {
            ExecutionPolicy::Strict => self.outcome == RunOutcome::Succeeded,
            ExecutionPolicy::Resilient | ExecutionPolicy::Bypass => true,
        }
    }
}

/// Compact elapsed time, e.g. `1h2m3s`. Sub-second runs give an empty string.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let parts = [
        (total / 86_400, 'd'),
        (total % 86_400 / 3_600, 'h'),
        (total % 3_600 / 60, 'm'),
        (total % 60, 's'),
    ];
    parts
        .iter()
        .filter(|(amount, _)| *amount > 0)
        .map(|(amount, unit)| format!("{amount}{unit}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_elapsed_compactly() {
        assert_eq!(format_elapsed(Duration::from_millis(300)), "");
        assert_eq!(format_elapsed(Duration::from_secs(5)), "5s");
        assert_eq!(format_elapsed(Duration::from_secs(62)), "1m2s");
        assert_eq!(format_elapsed(Duration::from_secs(3_600)), "1h");
        assert_eq!(format_elapsed(Duration::from_secs(90_061)), "1d1h1m1s");
    }
}
