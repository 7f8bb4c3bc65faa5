//! Config store for loading and saving dabkit.toml.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{DabConfig, parser};

/// File name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "dabkit.toml";

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    /// Store at `~/.config/dabkit/dabkit.toml` (platform equivalent).
    pub fn from_default_location() -> anyhow::Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("dabkit");
        Ok(Self::from_path(dir.join(CONFIG_FILE_NAME)))
    }

    pub fn from_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }

    /// Load the config, or defaults when the file does not exist.
    pub fn load(&self) -> anyhow::Result<DabConfig> {
        if !self.config_path.exists() {
            return Ok(DabConfig::new());
        }
        parser::parse_dab_toml(&self.config_path)
    }

    pub fn save(&self, config: &DabConfig) -> anyhow::Result<()> {
        let content = parser::to_toml(config).context("Failed to serialize config to TOML")?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.config_path, content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;
        Ok(())
    }
}
