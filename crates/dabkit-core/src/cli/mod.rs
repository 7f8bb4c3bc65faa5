//! Platform CLI session management.
//!
//! A [`CliSession`] owns the workspace host, the access token and, once
//! installed, the path of the `databricks` binary. Every bundle operation
//! borrows the resolved binary path from here.

mod identity;
mod session;
pub mod version;

pub use identity::CurrentUser;
pub use session::{CONFIG_FILE_ENV, CliSession, cli_version};
pub use version::{MIN_BUNDLE_VERSION, ensure_min_version, parse_cli_version};
