//! Bundle working directory and lifecycle commands.
//!
//! A [`BundleWorkspace`] is a local directory holding one bundle project at
//! `<directory>/<project>`. Lifecycle operations forward to the platform
//! CLI's `bundle` subcommands against a single deployment target and return
//! the captured [`CommandOutcome`]; a non-zero exit is data, not an error.

mod init;
mod publish;
mod types;

use std::path::{Path, PathBuf};

use tracing::{info, warn};

pub use crate::github::Visibility;
pub use init::{INIT_CONFIG_FILE, InitConfig, YesNo};
pub use publish::{PublishOptions, PublishReport, PublishStep, StepStatus};
pub use types::{CleanupReport, GenerateKind, RunMode};

use crate::cli::CONFIG_FILE_ENV;
use crate::error::{DabError, Result};
use crate::git;
use crate::install::is_executable;
use crate::process::{CommandOutcome, CommandSpec};

/// Deployment target used when none is given.
pub const DEFAULT_TARGET: &str = "dev";

/// Template used when none is given.
pub const DEFAULT_TEMPLATE: &str = "default-python";

#[derive(Debug, Clone)]
pub struct BundleWorkspace {
    directory: PathBuf,
    repo_url: Option<String>,
    project: String,
    target: String,
    cli_binary: PathBuf,
    profile: Option<String>,
    config_file: Option<PathBuf>,
}

impl BundleWorkspace {
    /// Create a workspace rooted at `directory`.
    ///
    /// `cli_binary` must be a resolved, executable path; nothing touches the
    /// filesystem until an operation runs.
    pub fn new(
        directory: impl Into<PathBuf>,
        project: impl Into<String>,
        target: impl Into<String>,
        cli_binary: impl Into<PathBuf>,
    ) -> Result<Self> {
        let project = project.into();
        validate_project_name(&project)?;
        let target = target.into();
        if target.trim().is_empty() {
            return Err(DabError::Config("Deployment target is empty".to_string()));
        }
        let cli_binary = cli_binary.into();
        if !is_executable(&cli_binary) {
            return Err(DabError::BinaryNotFound(cli_binary));
        }

        Ok(Self {
            directory: directory.into(),
            repo_url: None,
            project,
            target,
            cli_binary,
            profile: None,
            config_file: None,
        })
    }

    /// Source repository for [`clone_repo`](Self::clone_repo).
    pub fn with_repo_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.repo_url = (!url.trim().is_empty()).then_some(url);
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// `<directory>/<project>`, where the bundle's `databricks.yml` lives.
    pub fn bundle_path(&self) -> PathBuf {
        self.directory.join(&self.project)
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn repo_url(&self) -> Option<&str> {
        self.repo_url.as_deref()
    }

    pub fn cli_binary(&self) -> &Path {
        &self.cli_binary
    }

    fn ensure_bundle_dir(&self) -> Result<PathBuf> {
        let path = self.bundle_path();
        if !path.is_dir() {
            return Err(DabError::WorkspaceMissing(path));
        }
        Ok(path)
    }

    fn cli(&self, cwd: &Path) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.cli_binary).current_dir(cwd);
        if let Some(file) = &self.config_file {
            spec = spec.env(CONFIG_FILE_ENV, file.to_string_lossy());
        }
        spec
    }

    fn with_profile_args(&self, spec: CommandSpec) -> CommandSpec {
        match &self.profile {
            Some(profile) => spec.args(["--profile", profile.as_str()]),
            None => spec,
        }
    }

    /// `bundle <subcommand> -t <target>` inside the bundle directory.
    fn bundle_command(&self, subcommand: &[&str]) -> Result<CommandSpec> {
        let path = self.ensure_bundle_dir()?;
        let spec = self
            .cli(&path)
            .arg("bundle")
            .args(subcommand.iter().copied())
            .args(["-t", self.target.as_str()]);
        Ok(self.with_profile_args(spec))
    }

    /// Scaffold a new bundle from `template` into the working directory.
    ///
    /// The parameters are written to a temporary file that is removed once
    /// the CLI exits.
    pub fn initialize(&self, template: &str, config: &InitConfig) -> Result<CommandOutcome> {
        if config.project_name != self.project {
            warn!(
                template_project = %config.project_name,
                workspace_project = %self.project,
                "init config project name differs from workspace project"
            );
        }
        std::fs::create_dir_all(&self.directory)?;

        let params_dir = tempfile::tempdir()?;
        let params_file = params_dir.path().join(INIT_CONFIG_FILE);
        std::fs::write(&params_file, config.to_json()?)?;

        info!(template, directory = %self.directory.display(), "initializing bundle");
        let spec = self
            .cli(&self.directory)
            .args(["bundle", "init", template])
            .arg("--config-file")
            .arg(params_file.to_string_lossy())
            .arg("--output-dir")
            .arg(self.directory.to_string_lossy());
        self.with_profile_args(spec).run()
    }

    /// Clone the source repository into `<directory>/<project>`.
    pub fn clone_repo(&self) -> Result<CommandOutcome> {
        let url = self.repo_url.as_deref().ok_or(DabError::MissingRepositoryUrl)?;
        std::fs::create_dir_all(&self.directory)?;
        info!(url, directory = %self.directory.display(), "cloning bundle repository");
        git::git_command(&self.directory)
            .args(["clone", url, self.project.as_str()])
            .run()
    }

    pub fn checkout(&self, branch: &str) -> Result<CommandOutcome> {
        let path = self.ensure_bundle_dir()?;
        git::git_command(&path).args(["checkout", branch]).run()
    }

    pub fn pull(&self) -> Result<CommandOutcome> {
        let path = self.ensure_bundle_dir()?;
        git::git_command(&path).arg("pull").run()
    }

    /// Branch currently checked out in the bundle directory.
    pub fn current_branch(&self) -> Result<Option<String>> {
        let path = self.ensure_bundle_dir()?;
        git::current_branch(&path)
    }

    pub fn validate(&self) -> Result<CommandOutcome> {
        self.bundle_command(&["validate"])?.run()
    }

    /// Deploy to the target. `force` skips the CLI's git branch and
    /// concurrent-deploy checks.
    pub fn deploy(&self, force: bool) -> Result<CommandOutcome> {
        let mut spec = self.bundle_command(&["deploy"])?;
        if force {
            spec = spec.arg("--force");
        }
        spec.run()
    }

    /// Run the job or pipeline with resource key `key`.
    pub fn run(&self, key: &str, mode: RunMode) -> Result<CommandOutcome> {
        let mut spec = self.bundle_command(&["run"])?;
        if let Some(flag) = mode.flag() {
            spec = spec.arg(flag);
        }
        spec.arg(key).run()
    }

    /// Remove every deployed resource from the target without prompting.
    pub fn destroy(&self) -> Result<CommandOutcome> {
        self.bundle_command(&["destroy", "--auto-approve"])?.run()
    }

    /// Import an existing job or pipeline as bundle YAML.
    pub fn generate(&self, kind: GenerateKind, existing_id: &str) -> Result<CommandOutcome> {
        let id = existing_id.trim();
        if id.is_empty() {
            return Err(DabError::Config(format!("Empty {kind} id")));
        }
        self.bundle_command(&["generate", kind.subcommand()])?
            .args([kind.id_flag(), id])
            .run()
    }

    /// Delete the bundle's `.git` directory and then the whole working
    /// directory. Succeeds when the directory is already gone.
    pub fn remove_clone(&self) -> Result<CleanupReport> {
        let git_dir = self.bundle_path().join(".git");
        let removed_git_dir = remove_dir_if_exists(&git_dir)?;
        let removed_directory = remove_dir_if_exists(&self.directory)?;
        info!(
            directory = %self.directory.display(),
            removed_directory,
            "removed bundle working directory"
        );
        Ok(CleanupReport {
            directory: self.directory.clone(),
            removed_git_dir,
            removed_directory,
        })
    }
}

fn remove_dir_if_exists(path: &Path) -> Result<bool> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn validate_project_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(DabError::Config("Project name is empty".to_string()));
    }
    if name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(DabError::Config(format!(
            "Project name must be a single directory name: {name}"
        )));
    }
    Ok(())
}
