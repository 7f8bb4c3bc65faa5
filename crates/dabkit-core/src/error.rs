//! Error types for dabkit operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::process::CommandOutcome;

#[derive(Error, Debug)]
pub enum DabError {
    #[error("CLI installation failed: {0}")]
    InstallFailed(String),

    #[error("{0} has not been installed; run install first")]
    NotInstalled(String),

    #[error("CLI binary not found or not executable at {0}")]
    BinaryNotFound(PathBuf),

    #[error("CLI version {found} is older than the required {required}")]
    UnsupportedCliVersion {
        found: semver::Version,
        required: semver::Version,
    },

    #[error("Could not parse CLI version from output: {0}")]
    VersionParse(String),

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command `{command}` exited with {}:\n{output}", format_exit(.exit_code))]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("Step '{step}' failed: {outcome}")]
    StepFailed {
        step: String,
        outcome: Box<CommandOutcome>,
    },

    #[error("Bundle directory does not exist: {0}")]
    WorkspaceMissing(PathBuf),

    #[error("Bundle workspace has no source repository URL")]
    MissingRepositoryUrl,

    #[error("Invalid URL '{input}': {source}")]
    InvalidUrl {
        input: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub(crate) fn format_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, DabError>;
