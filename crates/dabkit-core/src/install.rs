//! Script-based installation of external CLI binaries.
//!
//! Both the platform CLI and the hosting CLI ship `curl | sh` installers.
//! [`ScriptInstaller`] downloads the script, runs it with `sh`, and then
//! probes a fixed list of install locations for the binary instead of
//! trusting whatever the script prints.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use url::Url;

use crate::error::{DabError, Result};
use crate::process::CommandSpec;

/// Official installer for the platform CLI.
pub const DATABRICKS_INSTALL_SCRIPT: &str =
    "https://raw.githubusercontent.com/databricks/setup-cli/main/install.sh";

/// webi installer for the GitHub CLI.
pub const GH_INSTALL_SCRIPT: &str = "https://webi.sh/gh";

/// Downloads and runs an installer script, then locates the binary.
#[derive(Debug, Clone)]
pub struct ScriptInstaller {
    binary_name: String,
    script_url: String,
    install_dirs: Vec<PathBuf>,
    search_path: bool,
}

impl ScriptInstaller {
    pub fn new(binary_name: impl Into<String>, script_url: impl Into<String>) -> Self {
        Self {
            binary_name: binary_name.into(),
            script_url: script_url.into(),
            install_dirs: Vec::new(),
            search_path: true,
        }
    }

    /// Installer for the `databricks` CLI.
    ///
    /// The setup script writes to `/usr/local/bin` when it can, falling back
    /// to a user-owned bin directory otherwise.
    pub fn databricks() -> Self {
        let mut installer = Self::new("databricks", DATABRICKS_INSTALL_SCRIPT)
            .with_install_dir("/usr/local/bin");
        if let Some(home) = dirs::home_dir() {
            installer = installer
                .with_install_dir(home.join("bin"))
                .with_install_dir(home.join(".local").join("bin"));
        }
        installer
    }

    /// Installer for the `gh` CLI (webi installs into `~/.local/bin`).
    pub fn gh() -> Self {
        let mut installer = Self::new("gh", GH_INSTALL_SCRIPT);
        if let Some(home) = dirs::home_dir() {
            installer = installer.with_install_dir(home.join(".local").join("bin"));
        }
        installer
    }

    pub fn with_script_url(mut self, url: impl Into<String>) -> Self {
        self.script_url = url.into();
        self
    }

    /// Add a directory to probe. Directories added first win.
    pub fn with_install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.install_dirs.push(dir.into());
        self
    }

    /// Probe `dir` before every other location.
    pub fn with_preferred_install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.install_dirs.insert(0, dir.into());
        self
    }

    /// Whether to fall back to searching `PATH`.
    pub fn with_path_search(mut self, enabled: bool) -> Self {
        self.search_path = enabled;
        self
    }

    pub fn binary_name(&self) -> &str {
        &self.binary_name
    }

    pub fn script_url(&self) -> &str {
        &self.script_url
    }

    /// Candidate binary paths in probe order, excluding `PATH`.
    pub fn candidate_paths(&self) -> Vec<PathBuf> {
        self.install_dirs
            .iter()
            .map(|dir| dir.join(&self.binary_name))
            .collect()
    }

    /// Find an installed, executable binary.
    ///
    /// The returned path is always absolute, even when an install directory
    /// or a `PATH` entry is relative.
    pub fn locate(&self) -> Option<PathBuf> {
        let found = self
            .candidate_paths()
            .into_iter()
            .find(|p| is_executable(p))
            .or_else(|| {
                self.search_path
                    .then(|| which::which(&self.binary_name).ok())
                    .flatten()
            })?;
        Some(std::path::absolute(&found).unwrap_or(found))
    }

    /// Install the binary unless it is already present.
    ///
    /// Returns the absolute path of the executable.
    pub fn install(&self) -> Result<PathBuf> {
        if let Some(existing) = self.locate() {
            info!(binary = %self.binary_name, path = %existing.display(), "already installed");
            return Ok(existing);
        }

        let script = self.fetch_script()?;
        let workdir = tempfile::tempdir()?;
        let script_path = workdir.path().join("install.sh");
        std::fs::write(&script_path, script)?;

        info!(binary = %self.binary_name, url = %self.script_url, "running installer");
        let outcome = CommandSpec::new("sh")
            .arg(script_path.to_string_lossy())
            .current_dir(workdir.path())
            .run()?;

        match self.locate() {
            Some(path) => {
                info!(binary = %self.binary_name, path = %path.display(), "installed");
                Ok(path)
            }
            None => Err(DabError::InstallFailed(format!(
                "{} not found in {} after running installer (exit {:?}):\n{}",
                self.binary_name,
                self.describe_locations(),
                outcome.exit_code,
                outcome.combined().trim()
            ))),
        }
    }

    fn describe_locations(&self) -> String {
        let mut places: Vec<String> = self
            .install_dirs
            .iter()
            .map(|d| d.display().to_string())
            .collect();
        if self.search_path {
            places.push("PATH".to_string());
        }
        places.join(", ")
    }

    /// Read the installer script from an http(s) or file URL.
    fn fetch_script(&self) -> Result<String> {
        let url = Url::parse(&self.script_url).map_err(|source| DabError::InvalidUrl {
            input: self.script_url.clone(),
            source,
        })?;

        if url.scheme() == "file" {
            let path = url
                .to_file_path()
                .map_err(|_| DabError::Download(format!("Invalid file URL: {url}")))?;
            debug!(path = %path.display(), "reading installer from disk");
            return Ok(std::fs::read_to_string(path)?);
        }

        // Block on async fetch using tokio runtime
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(download(url))
    }
}

async fn download(url: Url) -> Result<String> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("dabkit/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| DabError::Download(format!("Failed to build HTTP client: {e}")))?;

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| DabError::Download(format!("Failed to fetch {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(DabError::Download(format!(
            "HTTP {} from {url}",
            response.status()
        )));
    }

    response
        .text()
        .await
        .map_err(|e| DabError::Download(format!("Failed to read body from {url}: {e}")))
}

/// Whether `path` is a regular file the current user can execute.
pub fn is_executable(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    fn write_executable(path: &Path, body: &str) {
        use std::os::unix::fs::PermissionsExt;
        std::fs::write(path, body).unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn candidate_paths_follow_insertion_order() {
        let installer = ScriptInstaller::new("databricks", "https://example.com/install.sh")
            .with_install_dir("/opt/a")
            .with_install_dir("/opt/b")
            .with_preferred_install_dir("/opt/first");

        assert_eq!(
            installer.candidate_paths(),
            vec![
                PathBuf::from("/opt/first/databricks"),
                PathBuf::from("/opt/a/databricks"),
                PathBuf::from("/opt/b/databricks"),
            ]
        );
    }

    #[test]
    fn databricks_installer_probes_usr_local_first() {
        let installer = ScriptInstaller::databricks();
        assert_eq!(
            installer.candidate_paths().first(),
            Some(&PathBuf::from("/usr/local/bin/databricks"))
        );
        assert_eq!(installer.script_url(), DATABRICKS_INSTALL_SCRIPT);
    }

    #[cfg(unix)]
    #[test]
    fn locate_ignores_non_executable_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("databricks"), "not a binary").unwrap();

        let installer = ScriptInstaller::new("databricks", "file:///dev/null")
            .with_install_dir(temp.path())
            .with_path_search(false);

        assert_eq!(installer.locate(), None);
    }

    #[cfg(unix)]
    #[test]
    fn locate_returns_absolute_path_for_relative_dir() {
        let temp = TempDir::new_in(".").unwrap();
        let relative = temp.path().strip_prefix(".").unwrap_or(temp.path());
        assert!(relative.is_relative());
        write_executable(&relative.join("dbxlocal"), "#!/bin/sh\n");

        let installer = ScriptInstaller::new("dbxlocal", "file:///dev/null")
            .with_install_dir(relative)
            .with_path_search(false);

        let found = installer.locate().unwrap();
        assert!(found.is_absolute());
        assert!(found.ends_with(relative.join("dbxlocal")));
    }

    #[cfg(unix)]
    #[test]
    fn locate_falls_back_to_path() {
        let installer = ScriptInstaller::new("sh", "file:///dev/null");
        let found = installer.locate().unwrap();
        assert!(found.is_absolute());
        assert!(found.ends_with("sh"));
    }

    #[cfg(unix)]
    #[test]
    fn install_skips_download_when_present() {
        let temp = TempDir::new().unwrap();
        let binary = temp.path().join("databricks");
        write_executable(&binary, "#!/bin/sh\necho ok\n");

        let installer = ScriptInstaller::new("databricks", "https://invalid.example/install.sh")
            .with_install_dir(temp.path())
            .with_path_search(false);

        assert_eq!(installer.install().unwrap(), binary);
    }

    #[cfg(unix)]
    #[test]
    fn install_runs_local_script_and_probes() {
        let temp = TempDir::new().unwrap();
        let bin_dir = temp.path().join("bin");
        let script = temp.path().join("install.sh");
        std::fs::write(
            &script,
            format!(
                "mkdir -p {dir}\nprintf '#!/bin/sh\\necho v1\\n' > {dir}/databricks\nchmod +x {dir}/databricks\necho \"Installed at somewhere odd.\"\n",
                dir = bin_dir.display()
            ),
        )
        .unwrap();

        let url = Url::from_file_path(&script).unwrap();
        let installer = ScriptInstaller::new("databricks", url.as_str())
            .with_install_dir(&bin_dir)
            .with_path_search(false);

        let path = installer.install().unwrap();
        assert_eq!(path, bin_dir.join("databricks"));
        assert!(is_executable(&path));
    }

    #[cfg(unix)]
    #[test]
    fn install_fails_when_script_produces_nothing() {
        let temp = TempDir::new().unwrap();
        let script = temp.path().join("install.sh");
        std::fs::write(&script, "echo 'Installed Databricks CLI at /nowhere.'\n").unwrap();

        let url = Url::from_file_path(&script).unwrap();
        let installer = ScriptInstaller::new("databricks", url.as_str())
            .with_install_dir(temp.path().join("bin"))
            .with_path_search(false);

        let err = installer.install().unwrap_err();
        assert!(matches!(err, DabError::InstallFailed(_)));
        assert!(err.to_string().contains("Installed Databricks CLI at /nowhere."));
    }

    #[test]
    fn invalid_script_url_is_rejected() {
        let temp = TempDir::new().unwrap();
        let installer = ScriptInstaller::new("gh", "not a url")
            .with_install_dir(temp.path())
            .with_path_search(false);

        assert!(matches!(
            installer.install().unwrap_err(),
            DabError::InvalidUrl { .. }
        ));
    }
}
