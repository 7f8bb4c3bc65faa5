//! Publishing a freshly initialized bundle to a new hosted repository.
//!
//! The flow is git init, identity, add, commit, branch rename, then
//! `gh repo create --push`. Each step checks whether its effect is already
//! present and is skipped if so, so a call that failed halfway (typically at
//! the push) can simply be repeated.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::BundleWorkspace;
use crate::error::{DabError, Result};
use crate::git;
use crate::github::{GhCli, RepoCreate, Visibility};
use crate::process::{CommandOutcome, CommandSpec};

/// Settings for [`BundleWorkspace::create_remote_repository`].
#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// Hosted repository name; defaults to the project name.
    pub repo_name: Option<String>,
    pub visibility: Visibility,
    pub user_name: String,
    pub user_email: String,
    pub commit_message: String,
    pub branch: String,
    pub remote: String,
}

impl PublishOptions {
    pub fn new(user_name: impl Into<String>, user_email: impl Into<String>) -> Self {
        Self {
            repo_name: None,
            visibility: Visibility::Private,
            user_name: user_name.into(),
            user_email: user_email.into(),
            commit_message: "initial commit".to_string(),
            branch: "main".to_string(),
            remote: "upstream".to_string(),
        }
    }

    pub fn with_repo_name(mut self, name: impl Into<String>) -> Self {
        self.repo_name = Some(name.into());
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_commit_message(mut self, message: impl Into<String>) -> Self {
        self.commit_message = message.into();
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StepStatus {
    Completed { outcome: CommandOutcome },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishStep {
    pub name: String,
    #[serde(flatten)]
    pub status: StepStatus,
}

/// Steps run or skipped by one publish call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReport {
    pub steps: Vec<PublishStep>,
}

impl PublishReport {
    pub fn completed(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(|s| match s.status {
            StepStatus::Completed { .. } => Some(s.name.as_str()),
            StepStatus::Skipped { .. } => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(|s| match s.status {
            StepStatus::Skipped { .. } => Some(s.name.as_str()),
            StepStatus::Completed { .. } => None,
        })
    }

    fn run(&mut self, name: &str, spec: CommandSpec) -> Result<()> {
        let outcome = spec.run()?;
        self.record(name, outcome)
    }

    fn record(&mut self, name: &str, outcome: CommandOutcome) -> Result<()> {
        if !outcome.success() {
            return Err(DabError::StepFailed {
                step: name.to_string(),
                outcome: Box::new(outcome),
            });
        }
        self.steps.push(PublishStep {
            name: name.to_string(),
            status: StepStatus::Completed { outcome },
        });
        Ok(())
    }

    fn skip(&mut self, name: &str, reason: impl Into<String>) {
        let reason = reason.into();
        debug!(step = name, %reason, "skipping publish step");
        self.steps.push(PublishStep {
            name: name.to_string(),
            status: StepStatus::Skipped { reason },
        });
    }
}

impl BundleWorkspace {
    /// Put the bundle under version control and push it to a new hosted
    /// repository.
    ///
    /// On failure returns [`DabError::StepFailed`] naming the step; calling
    /// again resumes from that step.
    pub fn create_remote_repository(
        &self,
        gh: &GhCli,
        options: &PublishOptions,
    ) -> Result<PublishReport> {
        let path = self.ensure_bundle_dir()?;
        let repo_name = options.repo_name.as_deref().unwrap_or(self.project());
        let mut report = PublishReport::default();

        if git::is_repository(&path) {
            report.skip("init", "repository exists");
        } else {
            report.run("init", git::git_command(&path).arg("init"))?;
        }

        for (key, value, step) in [
            ("user.email", options.user_email.as_str(), "config-email"),
            ("user.name", options.user_name.as_str(), "config-name"),
        ] {
            if git::local_config(&path, key)?.as_deref() == Some(value) {
                report.skip(step, format!("{key} already set"));
            } else {
                report.run(step, git::git_command(&path).args(["config", key, value]))?;
            }
        }

        if git::has_commits(&path)? && git::is_clean(&path)? {
            report.skip("add", "working tree clean");
            report.skip("commit", "nothing to commit");
        } else {
            report.run("add", git::git_command(&path).args(["add", "-A"]))?;
            report.run(
                "commit",
                git::git_command(&path).args(["commit", "-m", options.commit_message.as_str()]),
            )?;
        }

        if git::current_branch(&path)?.as_deref() == Some(options.branch.as_str()) {
            report.skip("branch", format!("already on {}", options.branch));
        } else {
            report.run(
                "branch",
                git::git_command(&path).args(["branch", "-M", options.branch.as_str()]),
            )?;
        }

        if git::has_remote(&path, &options.remote)? {
            report.skip("create", format!("remote '{}' exists", options.remote));
            report.run(
                "push",
                git::git_command(&path).args([
                    "push",
                    "-u",
                    options.remote.as_str(),
                    options.branch.as_str(),
                ]),
            )?;
        } else {
            info!(repo = repo_name, visibility = %options.visibility, "creating remote repository");
            let outcome = gh.repo_create(&RepoCreate {
                name: repo_name,
                visibility: options.visibility,
                source: &path,
                remote: &options.remote,
                push: true,
            })?;
            report.record("create", outcome)?;
        }

        Ok(report)
    }
}
