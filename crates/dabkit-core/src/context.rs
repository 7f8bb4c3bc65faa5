//! Application context for building sessions and workspaces from config.

use std::path::{Path, PathBuf};

use semver::Version;
use tempfile::TempDir;
use tracing::debug;

use crate::bundle::{BundleWorkspace, PublishOptions};
use crate::cli::{CliSession, MIN_BUNDLE_VERSION};
use crate::config::DabConfig;
use crate::error::{DabError, Result};
use crate::github::GhCli;
use crate::install::ScriptInstaller;
use crate::secret::{self, SecretString};

/// Resolved configuration shared by every frontend command.
///
/// Frontends load a [`DabConfig`], apply their flag overrides, and create
/// this once.
#[derive(Debug, Clone)]
pub struct AppContext {
    config: DabConfig,
    home_dir: PathBuf,
}

impl AppContext {
    pub fn new(config: DabConfig) -> Result<Self> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| DabError::Config("Could not determine home directory".to_string()))?;
        Ok(Self::with_home_dir(config, home_dir))
    }

    /// Create context with an explicit home directory (for testing).
    pub fn with_home_dir(config: DabConfig, home_dir: PathBuf) -> Self {
        Self { config, home_dir }
    }

    pub fn config(&self) -> &DabConfig {
        &self.config
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    /// Installer for the platform CLI, honouring `[install]`.
    pub fn cli_installer(&self) -> ScriptInstaller {
        let mut installer = ScriptInstaller::databricks();
        if let Some(url) = &self.config.install.script_url {
            installer = installer.with_script_url(url);
        }
        if let Some(dir) = &self.config.install.dir {
            installer = installer.with_preferred_install_dir(dir);
        }
        installer
    }

    /// Installer for `gh`, honouring `[github]`.
    pub fn gh_installer(&self) -> ScriptInstaller {
        let mut installer = ScriptInstaller::gh();
        if let Some(url) = &self.config.github.script_url {
            installer = installer.with_script_url(url);
        }
        if let Some(dir) = &self.config.github.install_dir {
            installer = installer.with_preferred_install_dir(dir);
        }
        installer
    }

    pub fn min_cli_version(&self) -> Result<Version> {
        match &self.config.install.min_version {
            Some(v) => Version::parse(v.trim_start_matches('v'))
                .map_err(|e| DabError::Config(format!("install.min_version '{v}': {e}"))),
            None => Ok(MIN_BUNDLE_VERSION),
        }
    }

    /// Workspace access token from the configured environment variable.
    pub fn token(&self) -> Result<SecretString> {
        let var = &self.config.workspace.token_env;
        secret::from_env(var).ok_or_else(|| {
            DabError::Config(format!("No access token: set the {var} environment variable"))
        })
    }

    /// Hosting CLI token from the configured environment variable.
    pub fn gh_token(&self) -> Result<SecretString> {
        let var = &self.config.github.token_env;
        secret::from_env(var).ok_or_else(|| {
            DabError::Config(format!("No GitHub token: set the {var} environment variable"))
        })
    }

    /// A session for the configured host.
    ///
    /// If the CLI is already installed in a probed location the session
    /// comes back with its binary resolved; otherwise call
    /// [`CliSession::install`].
    pub fn session(&self, token: SecretString) -> Result<CliSession> {
        let host = self.config.workspace.host.as_deref().ok_or_else(|| {
            DabError::Config("No workspace host: set workspace.host or pass --host".to_string())
        })?;
        let mut session = CliSession::new(host, token)?.with_min_version(self.min_cli_version()?);
        if let Some(profile) = &self.config.workspace.profile {
            session = session.with_profile(profile);
        }
        if let Some(file) = &self.config.workspace.config_file {
            session = session.with_config_file(file);
        }
        if let Some(binary) = self.cli_installer().locate() {
            session = session.with_binary(binary)?;
        }
        Ok(session)
    }

    /// Locate an installed platform CLI without needing credentials.
    pub fn cli_binary(&self) -> Result<PathBuf> {
        self.cli_installer()
            .locate()
            .ok_or_else(|| DabError::NotInstalled("databricks CLI".to_string()))
    }

    pub fn project(&self) -> Result<&str> {
        self.config.bundle.project.as_deref().ok_or_else(|| {
            DabError::Config("No project: set bundle.project or pass --project".to_string())
        })
    }

    /// Working directory from config, or a new uniquely named directory
    /// under the home directory.
    ///
    /// A new directory is removed again when the returned guard is dropped;
    /// see [`WorkingDirectory::keep_if_used`].
    pub fn working_directory(&self) -> Result<WorkingDirectory> {
        if let Some(dir) = &self.config.bundle.directory {
            return Ok(WorkingDirectory::Configured(dir.clone()));
        }
        std::fs::create_dir_all(&self.home_dir)?;
        let dir = tempfile::Builder::new()
            .prefix("dabkit-")
            .tempdir_in(&self.home_dir)?;
        Ok(WorkingDirectory::Fresh(dir))
    }

    /// Bundle workspace for the configured project using `cli_binary`.
    pub fn bundle_workspace(&self, directory: PathBuf, cli_binary: &Path) -> Result<BundleWorkspace> {
        let mut workspace = BundleWorkspace::new(
            directory,
            self.project()?,
            self.config.bundle.target.as_str(),
            cli_binary,
        )?;
        if let Some(url) = &self.config.bundle.repo_url {
            workspace = workspace.with_repo_url(url);
        }
        if let Some(profile) = &self.config.workspace.profile {
            workspace = workspace.with_profile(profile);
        }
        if let Some(file) = &self.config.workspace.config_file {
            workspace = workspace.with_config_file(file);
        }
        Ok(workspace)
    }

    /// Publish settings from `[github]`; user name and email are required.
    pub fn publish_options(&self) -> Result<PublishOptions> {
        let gh = &self.config.github;
        let (Some(name), Some(email)) = (&gh.user_name, &gh.user_email) else {
            return Err(DabError::Config(
                "Commit identity missing: set github.user_name and github.user_email".to_string(),
            ));
        };
        Ok(PublishOptions::new(name, email)
            .with_visibility(gh.visibility)
            .with_branch(gh.branch.as_str())
            .with_remote(gh.remote.as_str()))
    }

    /// Resolve `gh`, installing it when `install` is set.
    pub fn gh_cli(&self, install: bool) -> Result<GhCli> {
        let installer = self.gh_installer();
        if install {
            return GhCli::install(&installer);
        }
        GhCli::locate(&installer).ok_or_else(|| DabError::NotInstalled("gh CLI".to_string()))
    }
}

/// Directory a bundle is created or cloned into.
#[derive(Debug)]
pub enum WorkingDirectory {
    /// `bundle.directory`; never removed by dabkit.
    Configured(PathBuf),
    /// Created for this run under the home directory.
    Fresh(TempDir),
}

impl WorkingDirectory {
    pub fn path(&self) -> &Path {
        match self {
            Self::Configured(path) => path,
            Self::Fresh(dir) => dir.path(),
        }
    }

    /// Keep a fresh directory on disk if anything was written into it.
    ///
    /// An empty fresh directory is deleted and `None` returned. A configured
    /// directory is always kept.
    pub fn keep_if_used(self) -> Option<PathBuf> {
        match self {
            Self::Configured(path) => Some(path),
            Self::Fresh(dir) => {
                let used = std::fs::read_dir(dir.path())
                    .map(|mut entries| entries.next().is_some())
                    .unwrap_or(false);
                if used {
                    Some(dir.keep())
                } else {
                    debug!(path = %dir.path().display(), "removing unused working directory");
                    None
                }
            }
        }
    }
}
