//! Template parameters for `bundle init`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// File name the parameters are written under.
pub const INIT_CONFIG_FILE: &str = "dab_init_config.json";

/// Template answers for `default-python` and compatible templates.
///
/// Unknown template parameters go in `extra` and are written as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitConfig {
    pub project_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_notebook: Option<YesNo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_dlt: Option<YesNo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_python: Option<YesNo>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Template schema booleans are the strings `yes` / `no`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YesNo {
    Yes,
    No,
}

impl From<bool> for YesNo {
    fn from(value: bool) -> Self {
        if value { YesNo::Yes } else { YesNo::No }
    }
}

impl InitConfig {
    /// Only the project name; every other answer is left to the template.
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            include_notebook: None,
            include_dlt: None,
            include_python: None,
            extra: Map::new(),
        }
    }

    /// Notebook-only layout for `default-python`: a notebook, no DLT
    /// pipeline, no Python wheel.
    pub fn default_python(project_name: impl Into<String>) -> Self {
        Self::new(project_name)
            .with_notebook(true)
            .with_dlt(false)
            .with_python(false)
    }

    pub fn with_notebook(mut self, include: bool) -> Self {
        self.include_notebook = Some(include.into());
        self
    }

    pub fn with_dlt(mut self, include: bool) -> Self {
        self.include_dlt = Some(include.into());
        self
    }

    pub fn with_python(mut self, include: bool) -> Self {
        self.include_python = Some(include.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
