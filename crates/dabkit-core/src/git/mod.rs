//! Git plumbing for bundle working directories.
//!
//! Mutating operations shell out to `git` so their output can be returned to
//! the caller; read-only inspection goes through git2.

use std::path::Path;

use git2::{Repository, StatusOptions};

use crate::error::Result;
use crate::process::CommandSpec;

/// Variables that would redirect git away from the working directory.
const GIT_ENV_OVERRIDES: [&str; 4] = [
    "GIT_DIR",
    "GIT_WORK_TREE",
    "GIT_INDEX_FILE",
    "GIT_COMMON_DIR",
];

/// Build a `git` invocation rooted at `cwd`.
pub fn git_command(cwd: &Path) -> CommandSpec {
    GIT_ENV_OVERRIDES
        .iter()
        .fold(CommandSpec::new("git"), |cmd, key| cmd.env_remove(*key))
        .current_dir(cwd)
}

/// Whether `path` is the root of a git working tree.
pub fn is_repository(path: &Path) -> bool {
    path.join(".git").exists() && Repository::open(path).is_ok()
}

/// Name of the branch HEAD points at, `None` when detached.
///
/// Works on unborn branches (fresh `git init`) too.
pub fn current_branch(path: &Path) -> Result<Option<String>> {
    let repo = Repository::open(path)?;
    match repo.head() {
        Ok(head) if head.is_branch() => Ok(head.shorthand().map(str::to_string)),
        Ok(_) => Ok(None),
        Err(e) if e.code() == git2::ErrorCode::UnbornBranch => {
            let head = repo.find_reference("HEAD")?;
            Ok(head
                .symbolic_target()
                .and_then(|t| t.strip_prefix("refs/heads/"))
                .map(str::to_string))
        }
        Err(e) => Err(e.into()),
    }
}

/// Whether HEAD resolves to a commit.
pub fn has_commits(path: &Path) -> Result<bool> {
    let repo = Repository::open(path)?;
    let has = match repo.head() {
        Ok(head) => head.peel_to_commit().is_ok(),
        Err(_) => false,
    };
    Ok(has)
}

/// Whether the working tree has no staged, modified or untracked files.
pub fn is_clean(path: &Path) -> Result<bool> {
    let repo = Repository::open(path)?;
    let mut opts = StatusOptions::new();
    opts.include_untracked(true).include_ignored(false);
    let statuses = repo.statuses(Some(&mut opts))?;
    Ok(statuses.is_empty())
}

/// Whether the repository has a remote called `name`.
pub fn has_remote(path: &Path, name: &str) -> Result<bool> {
    let repo = Repository::open(path)?;
    let found = repo.find_remote(name).is_ok();
    Ok(found)
}

/// Read a value from the repository-local config.
pub fn local_config(path: &Path, key: &str) -> Result<Option<String>> {
    let repo = Repository::open(path)?;
    let config = repo.config()?.open_level(git2::ConfigLevel::Local)?;
    match config.get_string(key) {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
