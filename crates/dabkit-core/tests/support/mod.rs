#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use git2::{IndexAddOption, Repository, Signature};

const GIT_ENV_OVERRIDES: [&str; 4] = [
    "GIT_DIR",
    "GIT_WORK_TREE",
    "GIT_INDEX_FILE",
    "GIT_COMMON_DIR",
];

pub fn git_command() -> Command {
    let mut cmd = Command::new("git");
    for key in GIT_ENV_OVERRIDES {
        cmd.env_remove(key);
    }
    cmd
}

pub fn write_executable(path: &Path, body: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Stand-in for the platform CLI.
///
/// Keeps its state (configured host, deployment marker, call log) next to
/// itself so each test's temp dir is isolated.
pub const FAKE_DATABRICKS: &str = r#"#!/bin/sh
state="$(dirname "$0")"
echo "$*" >> "$state/calls.log"
case "$1" in
  --version)
    echo "Databricks CLI v0.218.0"
    ;;
  configure)
    read -r token
    if [ -z "$token" ]; then
      echo "token is required" >&2
      exit 1
    fi
    echo "host=$3" > "$state/configured"
    echo "saved token $token"
    ;;
  current-user)
    if [ ! -f "$state/configured" ]; then
      echo "Error: default auth: cannot configure default credentials" >&2
      exit 1
    fi
    echo '{"id":"42","userName":"ada.lovelace@example.com","displayName":"Ada Lovelace","active":true}'
    ;;
  bundle)
    shift
    sub="$1"
    shift
    case "$sub" in
      init)
        template="$1"
        shift
        while [ $# -gt 0 ]; do
          case "$1" in
            --config-file) cfg="$2"; shift 2 ;;
            --output-dir) out="$2"; shift 2 ;;
            *) shift ;;
          esac
        done
        name=$(sed -n 's/.*"project_name": *"\([^"]*\)".*/\1/p' "$cfg")
        mkdir -p "$out/$name/resources" "$out/$name/src"
        printf 'bundle:\n  name: %s\n' "$name" > "$out/$name/databricks.yml"
        echo "Workspace to use: $template"
        echo "Your new project has been created in the '$name' directory!"
        ;;
      validate)
        if [ ! -f databricks.yml ]; then
          echo "Error: unable to locate bundle root: databricks.yml not found" >&2
          exit 1
        fi
        echo "Validation OK!"
        ;;
      deploy)
        touch "$state/deployed"
        echo "Deployment complete!"
        ;;
      run)
        echo "Run URL: https://example.cloud.databricks.com/jobs/1/runs/1"
        ;;
      destroy)
        if [ -f "$state/deployed" ]; then
          rm "$state/deployed"
          echo "Destroy complete!"
        else
          echo "No active deployment found to destroy!"
        fi
        ;;
      generate)
        echo "Job configuration successfully saved to resources/generated.yml"
        ;;
      *)
        echo "unknown bundle command: $sub" >&2
        exit 1
        ;;
    esac
    ;;
  *)
    echo "unknown command: $1" >&2
    exit 1
    ;;
esac
"#;

/// Stand-in for `gh`. Creates bare repositories under `$GH_CONFIG_DIR` and
/// fails after adding the remote while `$GH_CONFIG_DIR/fail-push` exists.
pub const FAKE_GH: &str = r#"#!/bin/sh
state="$GH_CONFIG_DIR"
echo "$*" >> "$state/calls.log"
case "$1 $2" in
  "auth login")
    read -r token
    if [ -z "$token" ]; then
      exit 1
    fi
    echo "logged in" > "$state/hosts.yml"
    ;;
  "auth status")
    if [ ! -f "$state/hosts.yml" ]; then
      echo "You are not logged into any GitHub hosts." >&2
      exit 1
    fi
    echo "Logged in to github.com"
    ;;
  "repo create")
    name="$3"
    shift 3
    remote=origin
    push=no
    while [ $# -gt 0 ]; do
      case "$1" in
        --remote) remote="$2"; shift 2 ;;
        --source) shift 2 ;;
        --push) push=yes; shift ;;
        *) shift ;;
      esac
    done
    bare="$state/remotes/$name.git"
    git init -q --bare "$bare" || exit 1
    git remote add "$remote" "$bare" || exit 1
    echo "https://github.com/example/$name"
    if [ -f "$state/fail-push" ]; then
      echo "error: failed to push some refs" >&2
      exit 1
    fi
    if [ "$push" = yes ]; then
      git push -q -u "$remote" HEAD || exit 1
    fi
    ;;
  *)
    echo "unknown command: $*" >&2
    exit 1
    ;;
esac
"#;

pub fn fake_databricks(bin_dir: &Path) -> PathBuf {
    let path = bin_dir.join("databricks");
    write_executable(&path, FAKE_DATABRICKS);
    path
}

pub fn fake_gh(bin_dir: &Path) -> PathBuf {
    let path = bin_dir.join("gh");
    write_executable(&path, FAKE_GH);
    path
}

/// Lines the fake CLI at `binary` has logged.
pub fn calls(binary: &Path) -> Vec<String> {
    let log = binary.parent().unwrap().join("calls.log");
    fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

pub fn commit_all(repo: &Repository, message: &str) -> git2::Oid {
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let sig = Signature::now("Test", "test@example.com").unwrap();
    match repo.head() {
        Ok(head) => {
            let parent = repo.find_commit(head.target().unwrap()).unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent])
                .unwrap()
        }
        Err(_) => repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &[])
            .unwrap(),
    }
}

/// A repository holding a bundle on its default branch plus `feature-x`.
pub fn bundle_origin(path: &Path) -> Repository {
    let repo = Repository::init(path).unwrap();
    fs::write(path.join("databricks.yml"), "bundle:\n  name: demo\n").unwrap();
    let oid = commit_all(&repo, "initial bundle");
    {
        let commit = repo.find_commit(oid).unwrap();
        repo.branch("feature-x", &commit, false).unwrap();
    }
    repo
}
