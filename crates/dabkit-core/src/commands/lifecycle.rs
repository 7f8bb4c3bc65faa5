//! End-to-end bundle lifecycle.
//!
//! Installs and configures the CLI, obtains the bundle source, then
//! validates, deploys, runs and optionally tears down, stopping at the first
//! step whose command exits non-zero.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::bundle::{BundleWorkspace, DEFAULT_TARGET, GenerateKind, InitConfig, RunMode};
use crate::cli::CliSession;
use crate::error::Result;
use crate::install::ScriptInstaller;
use crate::process::CommandOutcome;

/// Where the bundle comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// Clone an existing repository and optionally switch branch.
    Clone {
        repo_url: String,
        branch: Option<String>,
    },
    /// Scaffold a new bundle from a template.
    Initialize {
        template: String,
        config: InitConfig,
    },
    /// Use the bundle already present at `<directory>/<project>`.
    Existing,
}

/// Options for the lifecycle command
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    pub directory: PathBuf,
    pub project: String,
    pub target: String,
    pub source: Source,
    /// Write host and token into the CLI config before anything else
    pub configure: bool,
    /// Existing resources to import as YAML after the source step
    pub generate: Vec<(GenerateKind, String)>,
    pub deploy: bool,
    pub deploy_force: bool,
    /// Resource key and mode to run after deploying
    pub run: Option<(String, RunMode)>,
    pub destroy_after: bool,
    /// Remove the working directory once every other step succeeded
    pub cleanup_after: bool,
}

impl LifecycleOptions {
    pub fn new(directory: impl Into<PathBuf>, project: impl Into<String>, source: Source) -> Self {
        Self {
            directory: directory.into(),
            project: project.into(),
            target: DEFAULT_TARGET.to_string(),
            source,
            configure: true,
            generate: Vec::new(),
            deploy: true,
            deploy_force: false,
            run: None,
            destroy_after: false,
            cleanup_after: false,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_configure(mut self, configure: bool) -> Self {
        self.configure = configure;
        self
    }

    pub fn with_generate(mut self, kind: GenerateKind, existing_id: impl Into<String>) -> Self {
        self.generate.push((kind, existing_id.into()));
        self
    }

    pub fn with_deploy(mut self, deploy: bool) -> Self {
        self.deploy = deploy;
        self
    }

    pub fn with_deploy_force(mut self, force: bool) -> Self {
        self.deploy_force = force;
        self
    }

    pub fn with_run(mut self, key: impl Into<String>, mode: RunMode) -> Self {
        self.run = Some((key.into(), mode));
        self
    }

    pub fn with_destroy_after(mut self, destroy: bool) -> Self {
        self.destroy_after = destroy;
        self
    }

    pub fn with_cleanup_after(mut self, cleanup: bool) -> Self {
        self.cleanup_after = cleanup;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StepResult {
    /// An external command ran; check its exit code
    Ran { outcome: CommandOutcome },
    /// Work done in-process, such as locating a binary or deleting files
    Done { detail: String },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleStep {
    pub name: String,
    #[serde(flatten)]
    pub result: StepResult,
}

impl LifecycleStep {
    pub fn succeeded(&self) -> bool {
        match &self.result {
            StepResult::Ran { outcome } => outcome.success(),
            StepResult::Done { .. } | StepResult::Skipped { .. } => true,
        }
    }

    pub fn outcome(&self) -> Option<&CommandOutcome> {
        match &self.result {
            StepResult::Ran { outcome } => Some(outcome),
            _ => None,
        }
    }
}

/// Report from a lifecycle run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleReport {
    pub steps: Vec<LifecycleStep>,
}

impl LifecycleReport {
    /// True when no step failed.
    pub fn succeeded(&self) -> bool {
        self.steps.iter().all(LifecycleStep::succeeded)
    }

    /// The step that stopped the run, if any.
    pub fn failed_step(&self) -> Option<&LifecycleStep> {
        self.steps.iter().find(|s| !s.succeeded())
    }

    pub fn step(&self, name: &str) -> Option<&LifecycleStep> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Record a command outcome; returns whether to continue.
    fn ran(&mut self, name: &str, outcome: CommandOutcome) -> bool {
        let ok = outcome.success();
        if ok {
            info!(step = name, "lifecycle step succeeded");
        } else {
            warn!(step = name, exit_code = ?outcome.exit_code, "lifecycle step failed");
        }
        self.push(name, StepResult::Ran { outcome });
        ok
    }

    fn done(&mut self, name: &str, detail: impl Into<String>) {
        self.push(
            name,
            StepResult::Done {
                detail: detail.into(),
            },
        );
    }

    fn skip(&mut self, name: &str, reason: impl Into<String>) {
        self.push(
            name,
            StepResult::Skipped {
                reason: reason.into(),
            },
        );
    }

    fn push(&mut self, name: &str, result: StepResult) {
        self.steps.push(LifecycleStep {
            name: name.to_string(),
            result,
        });
    }
}

/// Lifecycle command orchestrator
#[derive(Debug)]
pub struct LifecycleCommand {
    session: CliSession,
    installer: ScriptInstaller,
}

impl LifecycleCommand {
    pub fn new(session: CliSession, installer: ScriptInstaller) -> Self {
        Self { session, installer }
    }

    pub fn session(&self) -> &CliSession {
        &self.session
    }

    /// Execute the lifecycle.
    ///
    /// Returns `Err` only when a step could not run at all; a command that
    /// ran and failed ends the report instead.
    pub fn execute(&self, options: &LifecycleOptions) -> Result<LifecycleReport> {
        let mut report = LifecycleReport::default();

        let mut session = self.session.clone();
        if session.is_installed() {
            report.skip(
                "install",
                format!("found {}", session.binary()?.display()),
            );
        } else {
            let path = session.install(&self.installer)?;
            report.done("install", format!("installed {}", path.display()));
        }

        if options.configure {
            if !report.ran("configure", session.configure()?) {
                return Ok(report);
            }
        } else {
            report.skip("configure", "disabled");
        }

        if !report.ran("validate-session", session.validate()?) {
            return Ok(report);
        }

        let workspace = session.bundle_workspace(
            options.directory.clone(),
            options.project.clone(),
            options.target.clone(),
        )?;
        if !self.acquire_source(&workspace, &options.source, &mut report)? {
            return Ok(report);
        }

        for (kind, id) in &options.generate {
            if !report.ran(&format!("generate-{kind}"), workspace.generate(*kind, id)?) {
                return Ok(report);
            }
        }

        if !report.ran("validate", workspace.validate()?) {
            return Ok(report);
        }

        if options.deploy {
            if !report.ran("deploy", workspace.deploy(options.deploy_force)?) {
                return Ok(report);
            }
        } else {
            report.skip("deploy", "disabled");
        }

        if let Some((key, mode)) = &options.run {
            if !report.ran("run", workspace.run(key, *mode)?) {
                return Ok(report);
            }
        }

        if options.destroy_after && !report.ran("destroy", workspace.destroy()?) {
            return Ok(report);
        }

        if options.cleanup_after {
            let cleanup = workspace.remove_clone()?;
            report.done(
                "cleanup",
                format!("removed {}", cleanup.directory.display()),
            );
        }

        Ok(report)
    }

    fn acquire_source(
        &self,
        workspace: &BundleWorkspace,
        source: &Source,
        report: &mut LifecycleReport,
    ) -> Result<bool> {
        match source {
            Source::Clone { repo_url, branch } => {
                let workspace = workspace.clone().with_repo_url(repo_url.as_str());
                if !report.ran("clone", workspace.clone_repo()?) {
                    return Ok(false);
                }
                match branch {
                    Some(branch) => Ok(report.ran("checkout", workspace.checkout(branch)?)),
                    None => Ok(true),
                }
            }
            Source::Initialize { template, config } => {
                Ok(report.ran("init", workspace.initialize(template, config)?))
            }
            Source::Existing => {
                report.skip("source", "using existing bundle directory");
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn outcome(code: i32) -> CommandOutcome {
        CommandOutcome {
            command: "databricks bundle deploy".to_string(),
            exit_code: Some(code),
            stdout: String::new(),
            stderr: String::new(),
            started_at: Utc::now(),
            duration_ms: 1,
        }
    }

    #[test]
    fn test_lifecycle_options_builder() {
        let opts = LifecycleOptions::new(
            "/tmp/work",
            "demo",
            Source::Clone {
                repo_url: "https://github.com/org/demo.git".to_string(),
                branch: Some("feature-x".to_string()),
            },
        )
        .with_target("prod")
        .with_generate(GenerateKind::Job, "123")
        .with_deploy_force(true)
        .with_run("nightly", RunMode::FullRefreshAll)
        .with_destroy_after(true);

        assert_eq!(opts.target, "prod");
        assert!(opts.configure);
        assert!(opts.deploy);
        assert!(opts.deploy_force);
        assert_eq!(opts.generate, vec![(GenerateKind::Job, "123".to_string())]);
        assert_eq!(
            opts.run,
            Some(("nightly".to_string(), RunMode::FullRefreshAll))
        );
        assert!(!opts.cleanup_after);
    }

    #[test]
    fn test_defaults_target_dev() {
        let opts = LifecycleOptions::new("/tmp/work", "demo", Source::Existing);
        assert_eq!(opts.target, "dev");
        assert!(opts.run.is_none());
    }

    #[test]
    fn test_report_tracks_first_failure() {
        let mut report = LifecycleReport::default();
        report.skip("install", "found");
        assert!(report.ran("validate", outcome(0)));
        assert!(!report.ran("deploy", outcome(1)));

        assert!(!report.succeeded());
        assert_eq!(report.failed_step().unwrap().name, "deploy");
        assert!(report.step("validate").unwrap().succeeded());
        assert!(report.step("install").unwrap().outcome().is_none());
    }

    #[test]
    fn test_report_serializes_status_tag() {
        let mut report = LifecycleReport::default();
        report.done("cleanup", "removed /tmp/work");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["steps"][0]["name"], "cleanup");
        assert_eq!(json["steps"][0]["status"], "done");
        assert_eq!(json["steps"][0]["detail"], "removed /tmp/work");
    }
}
