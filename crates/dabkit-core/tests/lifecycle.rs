#![cfg(unix)]

mod support;

use tempfile::TempDir;

use dabkit_core::commands::StepResult;
use dabkit_core::install::ScriptInstaller;
use dabkit_core::prelude::*;

use support::{bundle_origin, calls, fake_databricks};

fn command(temp: &TempDir) -> LifecycleCommand {
    let cli = fake_databricks(&temp.path().join("bin"));
    let session = CliSession::new("https://example.cloud.databricks.com", "dapi-123".to_string())
        .unwrap()
        .with_binary(&cli)
        .unwrap();
    // Never consulted: the session already has a binary.
    let installer = ScriptInstaller::new("databricks", "file:///unused").with_path_search(false);
    LifecycleCommand::new(session, installer)
}

fn names(report: &LifecycleReport) -> Vec<&str> {
    report.steps.iter().map(|s| s.name.as_str()).collect()
}

#[test]
fn initialize_deploy_run_destroy_cleanup() {
    let temp = TempDir::new().unwrap();
    let cmd = command(&temp);
    let work = temp.path().join("work");

    let options = LifecycleOptions::new(
        &work,
        "demo",
        Source::Initialize {
            template: "default-python".to_string(),
            config: InitConfig::default_python("demo"),
        },
    )
    .with_run("demo_job", RunMode::Default)
    .with_destroy_after(true)
    .with_cleanup_after(true);

    let report = cmd.execute(&options).unwrap();

    assert!(report.succeeded(), "{report:?}");
    assert_eq!(
        names(&report),
        vec![
            "install",
            "configure",
            "validate-session",
            "init",
            "validate",
            "deploy",
            "run",
            "destroy",
            "cleanup"
        ]
    );
    assert!(matches!(
        report.step("install").unwrap().result,
        StepResult::Skipped { .. }
    ));
    assert!(!work.exists());

    let destroy = report.step("destroy").unwrap().outcome().unwrap();
    assert!(destroy.stdout.contains("Destroy complete"));
}

#[test]
fn clone_source_checks_out_branch() {
    let temp = TempDir::new().unwrap();
    let origin = temp.path().join("origin");
    std::fs::create_dir_all(&origin).unwrap();
    bundle_origin(&origin);
    let cmd = command(&temp);

    let options = LifecycleOptions::new(
        temp.path().join("work"),
        "demo",
        Source::Clone {
            repo_url: origin.to_string_lossy().into_owned(),
            branch: Some("feature-x".to_string()),
        },
    )
    .with_target("qa")
    .with_deploy_force(true);

    let report = cmd.execute(&options).unwrap();

    assert!(report.succeeded(), "{report:?}");
    assert_eq!(
        names(&report)[3..],
        ["clone", "checkout", "validate", "deploy"]
    );
    let ws = cmd
        .session()
        .bundle_workspace(temp.path().join("work"), "demo", "qa")
        .unwrap();
    assert_eq!(ws.current_branch().unwrap().as_deref(), Some("feature-x"));

    let log = calls(cmd.session().binary().unwrap());
    assert!(log.contains(&"bundle deploy -t qa --force".to_string()));
}

#[test]
fn stops_at_first_failed_step() {
    let temp = TempDir::new().unwrap();
    let cmd = command(&temp);
    let work = temp.path().join("work");
    std::fs::create_dir_all(work.join("demo")).unwrap();

    let options = LifecycleOptions::new(&work, "demo", Source::Existing)
        .with_run("demo_job", RunMode::Default)
        .with_destroy_after(true)
        .with_cleanup_after(true);

    let report = cmd.execute(&options).unwrap();

    assert!(!report.succeeded());
    assert_eq!(report.failed_step().unwrap().name, "validate");
    assert!(report.step("deploy").is_none());
    assert!(report.step("cleanup").is_none());
    // Cleanup never ran, so the directory survives for inspection.
    assert!(work.join("demo").is_dir());
}

#[test]
fn unconfigured_session_fails_before_source() {
    let temp = TempDir::new().unwrap();
    let cmd = command(&temp);

    let options = LifecycleOptions::new(temp.path().join("work"), "demo", Source::Existing)
        .with_configure(false);

    let report = cmd.execute(&options).unwrap();

    assert_eq!(report.failed_step().unwrap().name, "validate-session");
    assert!(report.step("source").is_none());
}
