//! TOML parser with helpful error messages

use super::schema::DabConfig;
use anyhow::{Context, Result};
use std::path::Path;

/// Parse dabkit.toml with detailed error messages
pub fn parse_dab_toml(path: &Path) -> Result<DabConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_dab_toml_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse dabkit.toml content from string
pub fn parse_dab_toml_str(content: &str) -> Result<DabConfig> {
    let config: DabConfig =
        toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;

    config.validate()?;

    Ok(config)
}

/// Add the offending lines to a TOML error
fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let error_msg = error.message().to_string();

    let line_num = error
        .span()
        .map(|span| content[..span.start.min(content.len())].matches('\n').count() + 1);

    match line_num {
        Some(line_num) => anyhow::anyhow!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line_num,
            get_line_context(content, line_num),
            error_msg
        ),
        None => anyhow::anyhow!("TOML parsing error: {}", error_msg),
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2);
    let end = (line_num + 2).min(lines.len());

    lines[start.min(end)..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serialize a configuration to TOML string
pub fn to_toml(config: &DabConfig) -> Result<String> {
    toml::to_string_pretty(config).context("Failed to serialize configuration to TOML")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::Visibility;

    #[test]
    fn test_parse_valid_config() {
        let toml = r#"
[workspace]
host = "https://adb-123.azuredatabricks.net"
profile = "analytics"

[bundle]
target = "prod"
repo_url = "https://github.com/org/demo.git"

[github]
visibility = "public"
user_name = "Ada"
user_email = "ada@example.com"
"#;

        let config = parse_dab_toml_str(toml).unwrap();
        assert_eq!(
            config.workspace.host.as_deref(),
            Some("https://adb-123.azuredatabricks.net")
        );
        assert_eq!(config.workspace.token_env, "DATABRICKS_TOKEN");
        assert_eq!(config.bundle.target, "prod");
        assert_eq!(config.bundle.template, "default-python");
        assert_eq!(config.github.visibility, Visibility::Public);
        assert_eq!(config.github.remote, "upstream");
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_dab_toml_str("").unwrap();
        assert_eq!(config, DabConfig::default());
        assert_eq!(config.bundle.target, "dev");
    }

    #[test]
    fn test_parse_invalid_toml_reports_line() {
        let toml = "[workspace]\nhost = \"https://example.com\"\n[bundle\ntarget = \"dev\"\n";

        let err = parse_dab_toml_str(toml).unwrap_err().to_string();
        assert!(err.contains("line 3"), "unexpected error: {err}");
        assert!(err.contains(">>>"));
    }

    #[test]
    fn test_invalid_min_version_rejected() {
        let toml = "[install]\nmin_version = \"latest\"\n";
        assert!(parse_dab_toml_str(toml).is_err());
    }

    #[test]
    fn test_blank_target_rejected() {
        let toml = "[bundle]\ntarget = \" \"\n";
        let err = parse_dab_toml_str(toml).unwrap_err().to_string();
        assert!(err.contains("bundle.target"));
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let mut config = DabConfig::new();
        config.workspace.host = Some("https://example.com".to_string());
        config.github.user_email = Some("ada@example.com".to_string());

        let content = to_toml(&config).unwrap();
        let parsed = parse_dab_toml_str(&content).unwrap();
        assert_eq!(parsed, config);
    }
}
