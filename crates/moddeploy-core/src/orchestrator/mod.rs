//! Staged deployment pipeline and its execution policies.

pub mod policy;
pub mod report;
pub mod run;
pub mod stage;

pub use policy::ExecutionPolicy;
pub use report::{RunOutcome, RunReport, format_elapsed};
pub use run::{Orchestrator, settled_inventory};
pub use stage::{Stage, StageRecord, StageStatus};
