//! Identity payload returned by `current-user me`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    #[serde(default)]
    pub id: Option<String>,
    pub user_name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    /// Remaining SCIM fields (emails, groups, entitlements, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CurrentUser {
    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The part of the user name before `@`, with dots replaced by dashes.
    ///
    /// Matches the per-user secret scope naming used on shared clusters.
    pub fn scope_name(&self) -> String {
        self.user_name
            .split('@')
            .next()
            .unwrap_or_default()
            .replace('.', "-")
    }
}
