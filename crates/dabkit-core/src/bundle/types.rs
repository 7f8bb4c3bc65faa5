//! Small value types shared by bundle operations.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DabError;

/// How `bundle run` should execute a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Run the job or pipeline normally and wait for it.
    #[default]
    Default,
    /// Pipelines only: check the graph without processing data.
    ValidateOnly,
    /// Pipelines only: reset and recompute every table.
    FullRefreshAll,
    /// Cancel an active run before starting a new one.
    Restart,
    /// Return as soon as the run is triggered.
    NoWait,
}

impl RunMode {
    pub fn flag(self) -> Option<&'static str> {
        match self {
            RunMode::Default => None,
            RunMode::ValidateOnly => Some("--validate-only"),
            RunMode::FullRefreshAll => Some("--full-refresh-all"),
            RunMode::Restart => Some("--restart"),
            RunMode::NoWait => Some("--no-wait"),
        }
    }
}

impl FromStr for RunMode {
    type Err = DabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" | "" => Ok(RunMode::Default),
            "validate-only" => Ok(RunMode::ValidateOnly),
            "full-refresh-all" => Ok(RunMode::FullRefreshAll),
            "restart" => Ok(RunMode::Restart),
            "no-wait" => Ok(RunMode::NoWait),
            _ => Err(DabError::Config(format!(
                "Unknown run mode: {s}. Use default, validate-only, full-refresh-all, restart or no-wait"
            ))),
        }
    }
}

/// Resource kinds `bundle generate` can import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerateKind {
    Job,
    Pipeline,
}

impl GenerateKind {
    pub fn subcommand(self) -> &'static str {
        match self {
            GenerateKind::Job => "job",
            GenerateKind::Pipeline => "pipeline",
        }
    }

    pub fn id_flag(self) -> &'static str {
        match self {
            GenerateKind::Job => "--existing-job-id",
            GenerateKind::Pipeline => "--existing-pipeline-id",
        }
    }
}

impl fmt::Display for GenerateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.subcommand())
    }
}

impl FromStr for GenerateKind {
    type Err = DabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "job" => Ok(GenerateKind::Job),
            "pipeline" => Ok(GenerateKind::Pipeline),
            _ => Err(DabError::Config(format!(
                "Unknown resource kind: {s}. Use 'job' or 'pipeline'"
            ))),
        }
    }
}

/// What `remove_clone` deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub directory: PathBuf,
    pub removed_git_dir: bool,
    pub removed_directory: bool,
}
