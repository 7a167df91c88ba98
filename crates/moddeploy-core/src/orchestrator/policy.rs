use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How the orchestrator reacts to a stage error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionPolicy {
    /// First stage error aborts the remaining stages; the run fails.
    Strict,
    /// Stage errors are logged and replaced by the stage's fallback.
    #[default]
    Resilient,
    /// Resilient, and the installation precondition checks are skipped.
    Bypass,
}

impl ExecutionPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionPolicy::Strict => "strict",
            ExecutionPolicy::Resilient => "resilient",
            ExecutionPolicy::Bypass => "bypass",
        }
    }

    pub fn aborts_on_error(self) -> bool {
        self == ExecutionPolicy::Strict
    }

    pub fn checks_preconditions(self) -> bool {
        self != ExecutionPolicy::Bypass
    }
}

impl fmt::Display for ExecutionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(ExecutionPolicy::Strict),
            "resilient" => Ok(ExecutionPolicy::Resilient),
            "bypass" => Ok(ExecutionPolicy::Bypass),
            other => anyhow::bail!(
                "Unknown policy '{}' (expected strict, resilient or bypass)",
                other
            ),
        }
    }
}
