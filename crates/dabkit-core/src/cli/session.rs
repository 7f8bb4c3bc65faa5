//! Installing, configuring and validating the platform CLI.

use std::path::{Path, PathBuf};

use semver::Version;
use tracing::{info, warn};
use url::Url;

use super::identity::CurrentUser;
use super::version::{MIN_BUNDLE_VERSION, ensure_min_version, parse_cli_version};
use crate::bundle::BundleWorkspace;
use crate::error::{DabError, Result};
use crate::install::{ScriptInstaller, is_executable};
use crate::process::{CommandOutcome, CommandSpec};
use crate::secret::{ExposeSecret, SecretString};

/// Environment variable the platform CLI reads its config file location from.
pub const CONFIG_FILE_ENV: &str = "DATABRICKS_CONFIG_FILE";

/// Credentials plus the resolved CLI binary.
#[derive(Debug, Clone)]
pub struct CliSession {
    workspace_url: Url,
    token: SecretString,
    profile: Option<String>,
    config_file: Option<PathBuf>,
    binary: Option<PathBuf>,
    min_version: Version,
}

impl CliSession {
    /// Create a session for `workspace_url`.
    ///
    /// A bare host name is treated as `https://<host>`.
    pub fn new(workspace_url: &str, token: impl Into<SecretString>) -> Result<Self> {
        Ok(Self {
            workspace_url: parse_workspace_url(workspace_url)?,
            token: token.into(),
            profile: None,
            config_file: None,
            binary: None,
            min_version: MIN_BUNDLE_VERSION,
        })
    }

    /// Use a named profile instead of `DEFAULT`.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Point the CLI at a specific config file instead of `~/.databrickscfg`.
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Raise or lower the oldest CLI release [`install`](Self::install)
    /// accepts.
    pub fn with_min_version(mut self, version: Version) -> Self {
        self.min_version = version;
        self
    }

    /// Use an already-installed binary.
    pub fn with_binary(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !is_executable(&path) {
            return Err(DabError::BinaryNotFound(path));
        }
        self.binary = Some(path);
        Ok(self)
    }

    pub fn workspace_url(&self) -> &Url {
        &self.workspace_url
    }

    /// Host URL as passed to `configure --host`, without a trailing slash.
    pub fn host(&self) -> &str {
        self.workspace_url.as_str().trim_end_matches('/')
    }

    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    pub fn is_installed(&self) -> bool {
        self.binary.is_some()
    }

    /// Resolved binary path.
    pub fn binary(&self) -> Result<&Path> {
        self.binary
            .as_deref()
            .ok_or_else(|| DabError::NotInstalled("databricks CLI".to_string()))
    }

    /// Install the CLI (or find an existing install) and cache its path.
    ///
    /// Rejects binaries older than the first release with bundle support,
    /// which catches the legacy Python CLI shadowing the new one on `PATH`.
    pub fn install(&mut self, installer: &ScriptInstaller) -> Result<PathBuf> {
        let path = installer.install()?;
        let version = cli_version(&path)?;
        ensure_min_version(&version, &self.min_version)?;
        info!(path = %path.display(), %version, "databricks CLI ready");
        self.binary = Some(path.clone());
        Ok(path)
    }

    /// Version reported by the resolved binary.
    pub fn version(&self) -> Result<Version> {
        cli_version(self.binary()?)
    }

    /// Base command for the CLI with session environment applied.
    pub fn command(&self) -> Result<CommandSpec> {
        let mut spec = CommandSpec::new(self.binary()?).redact(self.token.clone());
        if let Some(file) = &self.config_file {
            spec = spec.env(CONFIG_FILE_ENV, file.to_string_lossy());
        }
        Ok(spec)
    }

    fn with_profile_args(&self, spec: CommandSpec) -> CommandSpec {
        match &self.profile {
            Some(profile) => spec.args(["--profile", profile.as_str()]),
            None => spec,
        }
    }

    /// Store host and token in the CLI's config.
    ///
    /// The token is written to the child's stdin and never appears on the
    /// command line.
    pub fn configure(&self) -> Result<CommandOutcome> {
        if self.token.expose_secret().is_empty() {
            warn!("configuring databricks CLI with an empty token");
        }
        let spec = self
            .command()?
            .args(["configure", "--host", self.host()])
            .stdin_secret(self.token.clone());
        self.with_profile_args(spec).run()
    }

    /// Run `current-user me`. A non-zero exit is returned, not raised.
    pub fn validate(&self) -> Result<CommandOutcome> {
        let spec = self.command()?.args(["current-user", "me"]);
        self.with_profile_args(spec).run()
    }

    /// Validate the session and parse the identity payload.
    pub fn identity(&self) -> Result<CurrentUser> {
        let outcome = self.validate()?.ensure_success()?;
        CurrentUser::parse(&outcome.stdout)
    }

    /// A bundle workspace driven by this session's binary and profile.
    pub fn bundle_workspace(
        &self,
        directory: impl Into<PathBuf>,
        project: impl Into<String>,
        target: impl Into<String>,
    ) -> Result<BundleWorkspace> {
        let mut workspace = BundleWorkspace::new(directory, project, target, self.binary()?)?;
        if let Some(profile) = &self.profile {
            workspace = workspace.with_profile(profile.clone());
        }
        if let Some(file) = &self.config_file {
            workspace = workspace.with_config_file(file.clone());
        }
        Ok(workspace)
    }
}

/// Version reported by `<binary> --version`.
pub fn cli_version(binary: &Path) -> Result<Version> {
    let outcome = CommandSpec::new(binary)
        .arg("--version")
        .run()?
        .ensure_success()?;
    parse_cli_version(&outcome.combined())
}

fn parse_workspace_url(input: &str) -> Result<Url> {
    let trimmed = input.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let url = Url::parse(&candidate).map_err(|source| DabError::InvalidUrl {
        input: input.to_string(),
        source,
    })?;
    match url.scheme() {
        "https" | "http" => Ok(url),
        other => Err(DabError::Config(format!(
            "Workspace URL must use http(s), got '{other}'"
        ))),
    }
}
