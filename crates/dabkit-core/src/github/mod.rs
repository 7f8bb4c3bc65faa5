//! GitHub CLI (`gh`) wrapper.
//!
//! Only the two operations the bundle flow needs: logging in with a token
//! and creating a repository from a local source directory.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DabError, Result};
use crate::install::{ScriptInstaller, is_executable};
use crate::process::{CommandOutcome, CommandSpec};
use crate::secret::SecretString;

/// Visibility of a newly created repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Public,
    Internal,
}

impl Visibility {
    pub fn flag(self) -> &'static str {
        match self {
            Visibility::Private => "--private",
            Visibility::Public => "--public",
            Visibility::Internal => "--internal",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Visibility::Private => "private",
            Visibility::Public => "public",
            Visibility::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl FromStr for Visibility {
    type Err = DabError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "private" => Ok(Visibility::Private),
            "public" => Ok(Visibility::Public),
            "internal" => Ok(Visibility::Internal),
            _ => Err(DabError::Config(format!(
                "Unknown visibility: {s}. Use 'private', 'public' or 'internal'"
            ))),
        }
    }
}

/// Arguments for `gh repo create --source`.
#[derive(Debug, Clone)]
pub struct RepoCreate<'a> {
    pub name: &'a str,
    pub visibility: Visibility,
    pub source: &'a Path,
    pub remote: &'a str,
    pub push: bool,
}

/// A resolved `gh` binary.
#[derive(Debug, Clone)]
pub struct GhCli {
    binary: PathBuf,
    config_dir: Option<PathBuf>,
}

impl GhCli {
    pub fn new(binary: impl Into<PathBuf>) -> Result<Self> {
        let binary = binary.into();
        if !is_executable(&binary) {
            return Err(DabError::BinaryNotFound(binary));
        }
        Ok(Self {
            binary,
            config_dir: None,
        })
    }

    /// Find an existing install without downloading anything.
    pub fn locate(installer: &ScriptInstaller) -> Option<Self> {
        installer.locate().map(|binary| Self {
            binary,
            config_dir: None,
        })
    }

    /// Install `gh` if missing.
    pub fn install(installer: &ScriptInstaller) -> Result<Self> {
        Self::new(installer.install()?)
    }

    /// Keep `gh` state in `dir` instead of `~/.config/gh`.
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command(&self) -> CommandSpec {
        let spec = CommandSpec::new(&self.binary).env("GH_PROMPT_DISABLED", "1");
        match &self.config_dir {
            Some(dir) => spec.env("GH_CONFIG_DIR", dir.to_string_lossy()),
            None => spec,
        }
    }

    /// `gh auth login --with-token`, token on stdin.
    pub fn auth_login(&self, token: &SecretString) -> Result<CommandOutcome> {
        self.command()
            .args(["auth", "login", "--with-token"])
            .stdin_secret(token.clone())
            .run()
    }

    pub fn auth_status(&self) -> Result<CommandOutcome> {
        self.command().args(["auth", "status"]).run()
    }

    /// Create a hosted repository from a local directory.
    pub fn repo_create(&self, request: &RepoCreate<'_>) -> Result<CommandOutcome> {
        let mut spec = self
            .command()
            .args(["repo", "create", request.name, request.visibility.flag()])
            .arg("--source")
            .arg(request.source.to_string_lossy())
            .arg("--remote")
            .arg(request.remote)
            .current_dir(request.source);
        if request.push {
            spec = spec.arg("--push");
        }
        spec.run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_round_trips_through_str() {
        assert_eq!("PUBLIC".parse::<Visibility>().unwrap(), Visibility::Public);
        assert_eq!(Visibility::Internal.to_string(), "internal");
        assert_eq!(Visibility::default().flag(), "--private");
        assert!("secret".parse::<Visibility>().is_err());
    }

    #[test]
    fn new_rejects_missing_binary() {
        assert!(matches!(
            GhCli::new("/nonexistent/gh").unwrap_err(),
            DabError::BinaryNotFound(_)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn auth_login_sends_token_on_stdin() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::TempDir::new().unwrap();
        let gh = temp.path().join("gh");
        std::fs::write(&gh, "#!/bin/sh\nread token\necho \"args=$* token=$token\"\n").unwrap();
        std::fs::set_permissions(&gh, std::fs::Permissions::from_mode(0o755)).unwrap();

        let cli = GhCli::new(&gh).unwrap();
        let outcome = cli.auth_login(&SecretString::from("ghp_abc".to_string())).unwrap();

        assert!(outcome.success());
        assert_eq!(
            outcome.stdout.trim(),
            "args=auth login --with-token token=****"
        );
        assert!(!outcome.command.contains("ghp_abc"));
    }
}
