//! Configuration schema for dabkit.toml
//!
//! ```toml
//! [workspace]
//! host = "https://adb-123.azuredatabricks.net"
//! token_env = "DATABRICKS_TOKEN"
//!
//! [bundle]
//! target = "dev"
//! template = "default-python"
//!
//! [github]
//! user_name = "Ada Lovelace"
//! user_email = "ada@example.com"
//! ```

use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::bundle::{DEFAULT_TARGET, DEFAULT_TEMPLATE};
use crate::github::Visibility;

/// Root configuration structure for dabkit.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DabConfig {
    #[serde(default)]
    pub workspace: WorkspaceSection,

    #[serde(default)]
    pub bundle: BundleSection,

    #[serde(default)]
    pub install: InstallSection,

    #[serde(default)]
    pub github: GithubSection,
}

/// Platform workspace and credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkspaceSection {
    /// Workspace URL
    #[serde(default)]
    pub host: Option<String>,

    /// CLI profile name (defaults to DEFAULT)
    #[serde(default)]
    pub profile: Option<String>,

    /// Environment variable holding the access token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Alternative CLI config file instead of ~/.databrickscfg
    #[serde(default)]
    pub config_file: Option<PathBuf>,
}

impl Default for WorkspaceSection {
    fn default() -> Self {
        Self {
            host: None,
            profile: None,
            token_env: default_token_env(),
            config_file: None,
        }
    }
}

/// Bundle defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BundleSection {
    #[serde(default = "default_target")]
    pub target: String,

    #[serde(default = "default_template")]
    pub template: String,

    /// Working directory; a fresh directory under $HOME when unset
    #[serde(default)]
    pub directory: Option<PathBuf>,

    #[serde(default)]
    pub project: Option<String>,

    #[serde(default)]
    pub repo_url: Option<String>,
}

impl Default for BundleSection {
    fn default() -> Self {
        Self {
            target: default_target(),
            template: default_template(),
            directory: None,
            project: None,
            repo_url: None,
        }
    }
}

/// Platform CLI installation.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct InstallSection {
    /// Directory probed before the standard locations
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Installer script URL (http(s) or file)
    #[serde(default)]
    pub script_url: Option<String>,

    /// Minimum accepted CLI version
    #[serde(default)]
    pub min_version: Option<String>,
}

/// Hosting CLI and commit identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GithubSection {
    #[serde(default = "default_gh_token_env")]
    pub token_env: String,

    #[serde(default)]
    pub visibility: Visibility,

    #[serde(default)]
    pub user_name: Option<String>,

    #[serde(default)]
    pub user_email: Option<String>,

    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default = "default_branch")]
    pub branch: String,

    #[serde(default)]
    pub install_dir: Option<PathBuf>,

    #[serde(default)]
    pub script_url: Option<String>,
}

impl Default for GithubSection {
    fn default() -> Self {
        Self {
            token_env: default_gh_token_env(),
            visibility: Visibility::default(),
            user_name: None,
            user_email: None,
            remote: default_remote(),
            branch: default_branch(),
            install_dir: None,
            script_url: None,
        }
    }
}

fn default_token_env() -> String {
    "DATABRICKS_TOKEN".to_string()
}

fn default_gh_token_env() -> String {
    "GH_TOKEN".to_string()
}

fn default_target() -> String {
    DEFAULT_TARGET.to_string()
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}

fn default_remote() -> String {
    "upstream".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

impl DabConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration values
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(host) = &self.workspace.host {
            if host.trim().is_empty() {
                anyhow::bail!("workspace.host is empty");
            }
        }
        if self.workspace.token_env.trim().is_empty() {
            anyhow::bail!("workspace.token_env is empty");
        }
        if self.bundle.target.trim().is_empty() {
            anyhow::bail!("bundle.target is empty");
        }
        if self.bundle.template.trim().is_empty() {
            anyhow::bail!("bundle.template is empty");
        }
        if let Some(version) = &self.install.min_version {
            semver::Version::parse(version.trim_start_matches('v'))
                .with_context(|| format!("install.min_version is not a version: {version}"))?;
        }
        if self.github.branch.trim().is_empty() {
            anyhow::bail!("github.branch is empty");
        }
        if self.github.remote.trim().is_empty() {
            anyhow::bail!("github.remote is empty");
        }
        Ok(())
    }
}
