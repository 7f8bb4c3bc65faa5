use std::path::PathBuf;

use tempfile::TempDir;

use dabkit_core::config::{CONFIG_FILE_NAME, ConfigStore, DabConfig};
use dabkit_core::context::AppContext;
use dabkit_core::github::Visibility;

#[test]
fn load_missing_returns_defaults() {
    let temp = TempDir::new().unwrap();
    let store = ConfigStore::from_path(temp.path().join(CONFIG_FILE_NAME));

    assert!(!store.exists());
    let config = store.load().unwrap();

    assert_eq!(config, DabConfig::default());
    assert_eq!(config.workspace.token_env, "DATABRICKS_TOKEN");
    assert_eq!(config.github.token_env, "GH_TOKEN");
}

#[test]
fn save_then_load_roundtrip() {
    let temp = TempDir::new().unwrap();
    let store = ConfigStore::from_path(temp.path().join("nested").join(CONFIG_FILE_NAME));

    let mut config = DabConfig::new();
    config.workspace.host = Some("https://adb-123.azuredatabricks.net".to_string());
    config.workspace.profile = Some("analytics".to_string());
    config.bundle.project = Some("demo".to_string());
    config.bundle.directory = Some(PathBuf::from("/srv/bundles"));
    config.install.min_version = Some("0.210.0".to_string());
    config.github.visibility = Visibility::Internal;
    config.github.user_name = Some("Ada Lovelace".to_string());

    store.save(&config).unwrap();
    assert!(store.exists());

    let loaded = store.load().unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn load_reports_path_and_line_on_bad_toml() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "[bundle]\ntarget = \"dev\"\ntemplate = \n").unwrap();

    let err = ConfigStore::from_path(&path).load().unwrap_err();
    let message = format!("{err:#}");

    assert!(message.contains(CONFIG_FILE_NAME), "{message}");
    assert!(message.contains("line 3"), "{message}");
}

#[test]
fn context_builds_workspace_from_config() {
    let temp = TempDir::new().unwrap();
    let cli = temp.path().join("bin").join("databricks");
    std::fs::create_dir_all(cli.parent().unwrap()).unwrap();
    std::fs::write(&cli, "#!/bin/sh\n").unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&cli, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    let mut config = DabConfig::new();
    config.bundle.project = Some("demo".to_string());
    config.bundle.target = "prod".to_string();
    config.bundle.repo_url = Some("https://github.com/org/demo.git".to_string());
    let ctx = AppContext::with_home_dir(config, temp.path().to_path_buf());

    let ws = ctx
        .bundle_workspace(temp.path().join("work"), &cli)
        .unwrap();

    assert_eq!(ws.project(), "demo");
    assert_eq!(ws.target(), "prod");
    assert_eq!(ws.repo_url(), Some("https://github.com/org/demo.git"));
    assert_eq!(ws.bundle_path(), temp.path().join("work").join("demo"));
}
