//! Configuration file handling.
//!
//! The file is read once at process start and folded into an immutable
//! [`crate::context::DeployContext`].

pub mod parser;
pub mod paths;
pub mod schema;
pub mod store;

pub use parser::{parse_config_toml, parse_config_toml_str};
pub use paths::{CONFIG_FILE_NAME, config_path_for_work_dir, resolve_against};
pub use schema::{ConfigFile, DeploySection, InstallSection, SlotSection};
pub use store::ConfigStore;
