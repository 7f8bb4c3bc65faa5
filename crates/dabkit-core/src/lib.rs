//! dabkit Core Library
//!
//! Drives asset bundle provisioning against a workspace by wrapping the
//! platform CLI (`databricks`), the hosting CLI (`gh`) and `git`.

pub mod bundle;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod git;
pub mod github;
pub mod install;
pub mod process;
pub mod secret;

pub use error::{DabError, Result};

/// Re-exports of commonly used types
pub mod prelude {
    // Sessions
    pub use crate::cli::{CliSession, CurrentUser};
    pub use crate::install::ScriptInstaller;

    // Bundles
    pub use crate::bundle::{
        BundleWorkspace, CleanupReport, GenerateKind, InitConfig, PublishOptions, PublishReport,
        RunMode, Visibility,
    };

    // Hosting
    pub use crate::github::GhCli;

    // Commands
    pub use crate::commands::{LifecycleCommand, LifecycleOptions, LifecycleReport, Source};

    // Configuration
    pub use crate::config::{ConfigStore, DabConfig};

    // Process
    pub use crate::process::{CommandOutcome, CommandSpec};
    pub use crate::secret::{ExposeSecret, SecretString};

    pub use crate::error::{DabError, Result};
}
