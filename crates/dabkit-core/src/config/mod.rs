//! Configuration for the dabkit frontend.
//!
//! A single `dabkit.toml` supplies defaults for the workspace host, token
//! source, bundle target and template, installer locations and the commit
//! identity used when publishing. Command-line flags override it.

pub mod parser;
pub mod schema;
pub mod store;

pub use parser::{parse_dab_toml, parse_dab_toml_str, to_toml};
pub use schema::{BundleSection, DabConfig, GithubSection, InstallSection, WorkspaceSection};
pub use store::{CONFIG_FILE_NAME, ConfigStore};
