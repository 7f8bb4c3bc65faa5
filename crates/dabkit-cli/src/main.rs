//! dabkit - asset bundle provisioning
//!
//! Usage:
//!   dabkit install             # Install the databricks CLI
//!   dabkit configure           # Store host and token
//!   dabkit init --project demo # Scaffold a bundle
//!   dabkit deploy              # Deploy to the configured target
//!   dabkit lifecycle ...       # Everything in one go

mod interactive;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dabkit_core::bundle::{BundleWorkspace, GenerateKind, InitConfig, RunMode, StepStatus};
use dabkit_core::cli::{CliSession, cli_version, ensure_min_version};
use dabkit_core::commands::{
    LifecycleCommand, LifecycleOptions, LifecycleReport, Source, StepResult,
};
use dabkit_core::config::{ConfigStore, DabConfig, to_toml};
use dabkit_core::context::{AppContext, WorkingDirectory};
use dabkit_core::github::Visibility;
use dabkit_core::process::CommandOutcome;

use crate::interactive::{Confirmation, Destruction};

#[derive(Parser)]
#[command(name = "dabkit")]
#[command(about = "Provision and manage asset bundles", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by every subcommand; they override dabkit.toml.
#[derive(Args, Debug, Default)]
struct GlobalArgs {
    /// Config file (defaults to ~/.config/dabkit/dabkit.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Workspace URL
    #[arg(long, global = true)]
    host: Option<String>,

    /// CLI profile
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Bundle project name (directory under the working directory)
    #[arg(long, short = 'p', global = true)]
    project: Option<String>,

    /// Deployment target
    #[arg(long, short = 't', global = true)]
    target: Option<String>,

    /// Working directory holding the bundle
    #[arg(long, short = 'd', global = true, value_name = "DIR")]
    directory: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long, global = true, default_value = "table")]
    format: OutputFormat,
}

impl GlobalArgs {
    fn apply(&self, config: &mut DabConfig) {
        if let Some(host) = &self.host {
            config.workspace.host = Some(host.clone());
        }
        if let Some(profile) = &self.profile {
            config.workspace.profile = Some(profile.clone());
        }
        if let Some(project) = &self.project {
            config.bundle.project = Some(project.clone());
        }
        if let Some(target) = &self.target {
            config.bundle.target = target.clone();
        }
        if let Some(directory) = &self.directory {
            config.bundle.directory = Some(directory.clone());
        }
    }

    fn store(&self) -> Result<ConfigStore> {
        match &self.config {
            Some(path) => Ok(ConfigStore::from_path(path)),
            None => ConfigStore::from_default_location(),
        }
    }
}

#[derive(Clone, Copy, ValueEnum, Default, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Human-readable output
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
    /// Only print failures (non-zero exit on failure)
    Quiet,
}

#[derive(Subcommand)]
enum Commands {
    /// Install the databricks CLI (or gh with --gh)
    Install {
        /// Install the GitHub CLI instead
        #[arg(long)]
        gh: bool,
    },

    /// Write host and token into the databricks CLI config
    Configure,

    /// Show the user the configured token belongs to
    Whoami,

    /// Scaffold a new bundle from a template
    Init(InitArgs),

    /// Clone an existing bundle repository
    Clone {
        /// Repository URL (defaults to bundle.repo_url)
        #[arg(long)]
        repo_url: Option<String>,
        /// Branch to check out after cloning
        #[arg(long, short)]
        branch: Option<String>,
    },

    /// Switch the bundle to another branch
    Checkout {
        branch: String,
    },

    /// Pull the latest commits into the bundle
    Pull,

    /// Validate the bundle configuration
    Validate,

    /// Deploy the bundle to the target
    Deploy {
        /// Skip the git branch and concurrent deployment checks
        #[arg(long, short)]
        force: bool,
    },

    /// Run a job or pipeline defined in the bundle
    Run {
        /// Resource key of the job or pipeline
        key: String,
        /// default, validate-only, full-refresh-all, restart or no-wait
        #[arg(long, short, default_value = "default")]
        mode: String,
    },

    /// Destroy everything the bundle deployed to the target
    Destroy {
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Import an existing job or pipeline as bundle YAML
    Generate {
        /// What to import (job or pipeline)
        kind: String,
        /// ID of the existing job or pipeline
        id: String,
    },

    /// Push the bundle to a new GitHub repository
    Publish(PublishArgs),

    /// Delete the local working directory
    Cleanup {
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Install, configure, fetch, validate, deploy and optionally run,
    /// destroy and clean up in one go
    Lifecycle(Box<LifecycleArgs>),

    /// Inspect or create dabkit.toml
    Config(ConfigArgs),
}

#[derive(Args)]
struct InitArgs {
    /// Template name, path or URL (defaults to bundle.template)
    #[arg(long)]
    template: Option<String>,
    /// Leave out the sample notebook
    #[arg(long)]
    no_notebook: bool,
    /// Include a sample pipeline
    #[arg(long)]
    dlt: bool,
    /// Include a sample Python package
    #[arg(long)]
    python: bool,
    /// Extra template parameter
    #[arg(long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,
}

#[derive(Args)]
struct PublishArgs {
    /// Repository name (defaults to the project name)
    #[arg(long)]
    repo_name: Option<String>,
    /// private, public or internal (defaults to github.visibility)
    #[arg(long)]
    visibility: Option<String>,
    /// Initial commit message
    #[arg(long, short)]
    message: Option<String>,
}

#[derive(Args)]
struct LifecycleArgs {
    /// Clone this repository (defaults to bundle.repo_url)
    #[arg(long, conflicts_with_all = ["template", "existing"])]
    repo_url: Option<String>,
    /// Branch to check out after cloning
    #[arg(long, short)]
    branch: Option<String>,
    /// Scaffold from this template instead of cloning
    #[arg(long, conflicts_with = "existing")]
    template: Option<String>,
    /// Use the bundle already in the working directory
    #[arg(long)]
    existing: bool,
    /// Do not rewrite the CLI config
    #[arg(long)]
    skip_configure: bool,
    /// Import an existing job first
    #[arg(long = "generate-job", value_name = "ID")]
    generate_jobs: Vec<String>,
    /// Import an existing pipeline first
    #[arg(long = "generate-pipeline", value_name = "ID")]
    generate_pipelines: Vec<String>,
    /// Stop after validating
    #[arg(long)]
    no_deploy: bool,
    /// Deploy with --force
    #[arg(long, short)]
    force: bool,
    /// Resource key to run after deploying
    #[arg(long, value_name = "KEY")]
    run: Option<String>,
    /// Run mode
    #[arg(long, short, default_value = "default")]
    mode: String,
    /// Destroy the deployment at the end
    #[arg(long)]
    destroy: bool,
    /// Delete the working directory at the end
    #[arg(long)]
    cleanup: bool,
    /// Skip confirmation prompts
    #[arg(short = 'y', long)]
    yes: bool,
}

#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Print the effective configuration
    Show,
    /// Write a config file with the current values
    Init {
        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dabkit=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if !run_cli(cli)? {
        std::process::exit(1);
    }

    Ok(())
}

/// Run a subcommand; `Ok(false)` means an external command failed.
fn run_cli(cli: Cli) -> Result<bool> {
    let global = cli.global;
    let format = global.format;

    match cli.command {
        Commands::Install { gh } => run_install(&load_context(&global)?, gh, format),
        Commands::Configure => {
            let session = session(&load_context(&global)?)?;
            report_outcome("configure", &session.configure()?, format)
        }
        Commands::Whoami => run_whoami(&load_context(&global)?, format),
        Commands::Init(args) => run_init(&load_context(&global)?, args, format),
        Commands::Clone { repo_url, branch } => {
            run_clone(&load_context(&global)?, repo_url, branch, format)
        }
        Commands::Checkout { branch } => {
            let ws = existing_workspace(&load_context(&global)?)?;
            report_outcome("checkout", &ws.checkout(&branch)?, format)
        }
        Commands::Pull => {
            let ws = existing_workspace(&load_context(&global)?)?;
            report_outcome("pull", &ws.pull()?, format)
        }
        Commands::Validate => {
            let ws = existing_workspace(&load_context(&global)?)?;
            report_outcome("validate", &ws.validate()?, format)
        }
        Commands::Deploy { force } => {
            let ws = existing_workspace(&load_context(&global)?)?;
            report_outcome("deploy", &ws.deploy(force)?, format)
        }
        Commands::Run { key, mode } => {
            let mode: RunMode = mode.parse()?;
            let ws = existing_workspace(&load_context(&global)?)?;
            report_outcome("run", &ws.run(&key, mode)?, format)
        }
        Commands::Destroy { yes } => {
            let ws = existing_workspace(&load_context(&global)?)?;
            let confirmed = confirmation(yes, format).confirm(&Destruction::Deployment {
                project: ws.project(),
                target: ws.target(),
            })?;
            if !confirmed {
                eprintln!("Destroy cancelled.");
                return Ok(true);
            }
            report_outcome("destroy", &ws.destroy()?, format)
        }
        Commands::Generate { kind, id } => {
            let kind: GenerateKind = kind.parse()?;
            let ws = existing_workspace(&load_context(&global)?)?;
            report_outcome(&format!("generate {kind}"), &ws.generate(kind, &id)?, format)
        }
        Commands::Publish(args) => run_publish(&load_context(&global)?, args, format),
        Commands::Cleanup { yes } => run_cleanup(&load_context(&global)?, yes, format),
        Commands::Lifecycle(args) => run_lifecycle(&load_context(&global)?, *args, format),
        Commands::Config(args) => run_config(&global, args),
    }
}

// =============================================================================
// Context helpers
// =============================================================================

/// Load dabkit.toml and apply the global flag overrides.
fn load_context(global: &GlobalArgs) -> Result<AppContext> {
    let store = global.store()?;
    let mut config = store
        .load()
        .with_context(|| format!("Failed to load {}", store.config_path().display()))?;
    global.apply(&mut config);
    Ok(AppContext::new(config)?)
}

/// Confirmation whose summary only shows up in human-readable output.
fn confirmation(yes: bool, format: OutputFormat) -> Confirmation {
    Confirmation::new(yes).verbose(format == OutputFormat::Table)
}

/// Session with the CLI installed if it was missing.
fn session(ctx: &AppContext) -> Result<CliSession> {
    let mut session = ctx.session(ctx.token()?)?;
    if !session.is_installed() {
        session.install(&ctx.cli_installer())?;
    }
    Ok(session)
}

/// Workspace in the configured directory, which must already exist.
fn existing_workspace(ctx: &AppContext) -> Result<BundleWorkspace> {
    let directory = ctx.config().bundle.directory.clone().ok_or_else(|| {
        anyhow::anyhow!("No working directory: set bundle.directory or pass --directory")
    })?;
    Ok(ctx.bundle_workspace(directory, &ctx.cli_binary()?)?)
}

/// Workspace in the configured directory, or a fresh one under $HOME.
///
/// Pass the returned guard to `keep_if_used` once the command has run.
fn new_workspace(
    ctx: &AppContext,
    format: OutputFormat,
) -> Result<(WorkingDirectory, BundleWorkspace)> {
    let cli_binary = ctx.cli_binary()?;
    let directory = ctx.working_directory()?;
    if format == OutputFormat::Table {
        println!("Working directory: {}", style(directory.path().display()).cyan());
    }
    let ws = ctx.bundle_workspace(directory.path().to_path_buf(), &cli_binary)?;
    Ok((directory, ws))
}

// =============================================================================
// Commands
// =============================================================================

fn run_install(ctx: &AppContext, gh: bool, format: OutputFormat) -> Result<bool> {
    let (name, path, version) = if gh {
        let gh = ctx.gh_cli(true)?;
        ("gh", gh.binary().to_path_buf(), None)
    } else {
        let path = ctx.cli_installer().install()?;
        let version = cli_version(&path)?;
        ensure_min_version(&version, &ctx.min_cli_version()?)?;
        ("databricks", path, Some(version))
    };

    match format {
        OutputFormat::Table => {
            print!("{} {} at {}", style("✓").green(), name, path.display());
            match &version {
                Some(version) => println!(" (v{version})"),
                None => println!(),
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "binary": name,
                "path": path,
                "version": version.map(|v| v.to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Quiet => {}
    }
    Ok(true)
}

fn run_whoami(ctx: &AppContext, format: OutputFormat) -> Result<bool> {
    let session = session(ctx)?;
    let outcome = session.validate()?;
    if !outcome.success() {
        return report_outcome("whoami", &outcome, format);
    }
    let user = dabkit_core::cli::CurrentUser::parse(&outcome.stdout)?;

    match format {
        OutputFormat::Table => {
            println!("Host:  {}", session.host());
            println!("User:  {}", style(&user.user_name).green());
            if let Some(name) = &user.display_name {
                println!("Name:  {name}");
            }
            println!("Scope: {}", user.scope_name());
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&user)?),
        OutputFormat::Quiet => {}
    }
    Ok(true)
}

fn run_init(ctx: &AppContext, args: InitArgs, format: OutputFormat) -> Result<bool> {
    let (directory, ws) = new_workspace(ctx, format)?;
    let template = args
        .template
        .unwrap_or_else(|| ctx.config().bundle.template.clone());

    let mut init = InitConfig::default_python(ws.project())
        .with_notebook(!args.no_notebook)
        .with_dlt(args.dlt)
        .with_python(args.python);
    for param in &args.params {
        let (key, value) = parse_key_value(param)?;
        init = init.with_param(key, value);
    }

    let ok = report_outcome("init", &ws.initialize(&template, &init)?, format)?;
    directory.keep_if_used();
    Ok(ok)
}

fn run_clone(
    ctx: &AppContext,
    repo_url: Option<String>,
    branch: Option<String>,
    format: OutputFormat,
) -> Result<bool> {
    let (directory, mut ws) = new_workspace(ctx, format)?;
    if let Some(url) = repo_url {
        ws = ws.with_repo_url(url);
    }

    let mut ok = report_outcome("clone", &ws.clone_repo()?, format)?;
    if let (true, Some(branch)) = (ok, branch) {
        ok = report_outcome("checkout", &ws.checkout(&branch)?, format)?;
    }
    directory.keep_if_used();
    Ok(ok)
}

fn run_publish(ctx: &AppContext, args: PublishArgs, format: OutputFormat) -> Result<bool> {
    let ws = existing_workspace(ctx)?;
    let gh = ctx.gh_cli(true)?;

    match ctx.gh_token() {
        Ok(token) => {
            gh.auth_login(&token)?
                .ensure_success()
                .context("gh auth login failed")?;
        }
        Err(e) => {
            if !gh.auth_status()?.success() {
                anyhow::bail!("gh is not logged in: {e}");
            }
            tracing::debug!("{e}; using the existing gh login");
        }
    }

    let mut options = ctx.publish_options()?;
    if let Some(name) = args.repo_name {
        options = options.with_repo_name(name);
    }
    if let Some(visibility) = args.visibility {
        options = options.with_visibility(visibility.parse::<Visibility>()?);
    }
    if let Some(message) = args.message {
        options = options.with_commit_message(message);
    }

    let report = ws.create_remote_repository(&gh, &options)?;

    match format {
        OutputFormat::Table => {
            for step in &report.steps {
                match &step.status {
                    StepStatus::Completed { .. } => {
                        println!("{} {}", style("✓").green(), step.name)
                    }
                    StepStatus::Skipped { reason } => {
                        println!("{} {} ({})", style("•").dim(), step.name, reason)
                    }
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Quiet => {}
    }
    Ok(true)
}

fn run_cleanup(ctx: &AppContext, yes: bool, format: OutputFormat) -> Result<bool> {
    let ws = existing_workspace(ctx)?;
    let confirmed = confirmation(yes, format).confirm(&Destruction::WorkingDirectory {
        directory: Some(ws.directory()),
    })?;
    if !confirmed {
        eprintln!("Cleanup cancelled.");
        return Ok(true);
    }

    let report = ws.remove_clone()?;
    match format {
        OutputFormat::Table => {
            if report.removed_directory {
                println!("{} Removed {}", style("✓").green(), report.directory.display());
            } else {
                println!("• {} was already gone", report.directory.display());
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Quiet => {}
    }
    Ok(true)
}

fn run_lifecycle(ctx: &AppContext, args: LifecycleArgs, format: OutputFormat) -> Result<bool> {
    let mode: RunMode = args.mode.parse()?;
    let project = ctx.project()?.to_string();
    let target = ctx.config().bundle.target.clone();
    let session = ctx.session(ctx.token()?)?;

    let source = if args.existing {
        Source::Existing
    } else if let Some(template) = args.template {
        Source::Initialize {
            template,
            config: InitConfig::default_python(project.as_str()),
        }
    } else if let Some(repo_url) = args.repo_url.or_else(|| ctx.config().bundle.repo_url.clone())
    {
        Source::Clone {
            repo_url,
            branch: args.branch,
        }
    } else {
        Source::Initialize {
            template: ctx.config().bundle.template.clone(),
            config: InitConfig::default_python(project.as_str()),
        }
    };

    let mut prompt = confirmation(args.yes, format);
    let destroy_after = args.destroy
        && prompt.confirm(&Destruction::Deployment {
            project: &project,
            target: &target,
        })?;
    let cleanup_after = args.cleanup
        && prompt.confirm(&Destruction::WorkingDirectory {
            directory: ctx.config().bundle.directory.as_deref(),
        })?;

    let directory = ctx.working_directory()?;
    let mut options = LifecycleOptions::new(directory.path(), project.as_str(), source)
        .with_target(target.as_str())
        .with_configure(!args.skip_configure)
        .with_deploy(!args.no_deploy)
        .with_deploy_force(args.force)
        .with_destroy_after(destroy_after)
        .with_cleanup_after(cleanup_after);
    for id in args.generate_jobs {
        options = options.with_generate(GenerateKind::Job, id);
    }
    for id in args.generate_pipelines {
        options = options.with_generate(GenerateKind::Pipeline, id);
    }
    if let Some(key) = args.run {
        options = options.with_run(key, mode);
    }

    if format == OutputFormat::Table {
        println!(
            "Working directory: {}",
            style(directory.path().display()).cyan()
        );
    }

    let command = LifecycleCommand::new(session, ctx.cli_installer());
    let report = command.execute(&options)?;
    directory.keep_if_used();
    print_lifecycle(&report, format)?;
    Ok(report.succeeded())
}

fn run_config(global: &GlobalArgs, args: ConfigArgs) -> Result<bool> {
    let store = global.store()?;
    match args.command {
        ConfigSubcommand::Show => {
            let mut config = store.load()?;
            global.apply(&mut config);
            match global.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
                OutputFormat::Table | OutputFormat::Quiet => {
                    println!("# {}", store.config_path().display());
                    print!("{}", to_toml(&config)?);
                }
            }
        }
        ConfigSubcommand::Init { force } => {
            if store.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    store.config_path().display()
                );
            }
            let mut config = DabConfig::new();
            global.apply(&mut config);
            store.save(&config)?;
            if global.format != OutputFormat::Quiet {
                println!(
                    "{} Wrote {}",
                    style("✓").green(),
                    store.config_path().display()
                );
            }
        }
    }
    Ok(true)
}

// =============================================================================
// Output
// =============================================================================

/// Print one command outcome; returns whether it succeeded.
fn report_outcome(step: &str, outcome: &CommandOutcome, format: OutputFormat) -> Result<bool> {
    let ok = outcome.success();
    match format {
        OutputFormat::Table => {
            print_outcome_header(step, outcome);
            let output = outcome.combined();
            let output = output.trim();
            if !output.is_empty() {
                println!("{output}");
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "step": step,
                "success": ok,
                "outcome": outcome,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Quiet => {
            if !ok {
                eprintln!("{outcome}");
            }
        }
    }
    Ok(ok)
}

fn print_outcome_header(step: &str, outcome: &CommandOutcome) {
    if outcome.success() {
        println!(
            "{} {} {}",
            style("✓").green(),
            style(step).bold(),
            style(format!("({} ms)", outcome.duration_ms)).dim()
        );
    } else {
        println!(
            "{} {} failed: {}",
            style("✗").red(),
            style(step).bold(),
            outcome.command
        );
    }
}

fn print_lifecycle(report: &LifecycleReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            for step in &report.steps {
                match &step.result {
                    StepResult::Ran { outcome } => {
                        print_outcome_header(&step.name, outcome);
                        if !outcome.success() {
                            println!("{}", outcome.combined().trim());
                        }
                    }
                    StepResult::Done { detail } => {
                        println!("{} {} ({})", style("✓").green(), style(&step.name).bold(), detail)
                    }
                    StepResult::Skipped { reason } => {
                        println!("{} {} ({})", style("•").dim(), step.name, reason)
                    }
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Quiet => {
            if let Some(StepResult::Ran { outcome }) = report.failed_step().map(|s| &s.result) {
                eprintln!("{outcome}");
            }
        }
    }
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_key_value(input: &str) -> Result<(String, String)> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Expected KEY=VALUE, got '{input}'"))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("Empty key in '{input}'");
    }
    Ok((key.to_string(), value.to_string()))
}
