//! Parsing of `databricks --version` output.

use semver::Version;

use crate::error::{DabError, Result};

/// First CLI release that ships the `bundle` command group.
pub const MIN_BUNDLE_VERSION: Version = Version::new(0, 205, 0);

/// Extract the version from output like `Databricks CLI v0.218.0`.
pub fn parse_cli_version(output: &str) -> Result<Version> {
    output
        .split_whitespace()
        .filter_map(|token| {
            let token = token.trim_start_matches('v').trim_end_matches([',', '.']);
            Version::parse(token).ok()
        })
        .next()
        .ok_or_else(|| DabError::VersionParse(output.trim().to_string()))
}

/// Reject versions older than `required`.
pub fn ensure_min_version(found: &Version, required: &Version) -> Result<()> {
    if found < required {
        return Err(DabError::UnsupportedCliVersion {
            found: found.clone(),
            required: required.clone(),
        });
    }
    Ok(())
}
