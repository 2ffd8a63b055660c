//! User-authored tool definitions.
//!
//! The file is JSON, either a bare array or `{ "tools": [...] }`:
//!
//! ```json
//! [{
//!   "toolName": "deploy",
//!   "description": "Deploy a service",
//!   "command": "./deploy.sh {{service}}",
//!   "output": "deployment log",
//!   "input": [{ "name": "service", "type": "string" }],
//!   "enabled": true
//! }]
//! ```
//!
//! Loading never fails: unreadable files and invalid entries are skipped
//! with a warning.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// One user-defined tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfig {
    pub tool_name: String,

    #[serde(default)]
    pub description: String,

    /// Shell template with `{{param}}` placeholders
    pub command: String,

    /// Free-form description of what the command prints
    #[serde(default)]
    pub output: String,

    #[serde(default)]
    pub input: Vec<ToolInputDef>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// One declared input parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInputDef {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default = "default_true")]
    pub required: bool,
}

fn default_true() -> bool {
    true
}

impl ToolConfig {
    /// Why this entry is unusable, if it is.
    pub fn validate(&self) -> Result<(), String> {
        if self.tool_name.trim().is_empty() {
            return Err("toolName is empty".into());
        }
        if self.command.trim().is_empty() {
            return Err(format!("{}: command is empty", self.tool_name));
        }
        for (i, input) in self.input.iter().enumerate() {
            if input.name.trim().is_empty() {
                return Err(format!("{}: input #{i} has no name", self.tool_name));
            }
            if input.kind.trim().is_empty() {
                return Err(format!("{}: input {} has no type", self.tool_name, input.name));
            }
        }
        Ok(())
    }

    /// JSON-Schema object built from the declared inputs.
    pub fn input_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for input in &self.input {
            let mut prop = serde_json::Map::new();
            prop.insert("type".into(), serde_json::Value::String(input.kind.clone()));
            if let Some(desc) = &input.description {
                prop.insert("description".into(), serde_json::Value::String(desc.clone()));
            }
            properties.insert(input.name.clone(), serde_json::Value::Object(prop));
            if input.required {
                required.push(serde_json::Value::String(input.name.clone()));
            }
        }
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ToolFile {
    List(Vec<serde_json::Value>),
    Wrapped {
        #[serde(default)]
        tools: Vec<serde_json::Value>,
    },
}

/// Parse tool configs from JSON text, keeping only enabled, valid entries.
pub fn parse_tool_configs(text: &str) -> Vec<ToolConfig> {
    let file: ToolFile = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!(error = %e, "Could not parse tool config");
            return Vec::new();
        }
    };
    let raw = match file {
        ToolFile::List(v) => v,
        ToolFile::Wrapped { tools } => tools,
    };

    raw.into_iter()
        .enumerate()
        .filter_map(|(i, value)| {
            let config: ToolConfig = match serde_json::from_value(value) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(index = i, error = %e, "Skipping malformed tool config entry");
                    return None;
                }
            };
            if let Err(reason) = config.validate() {
                tracing::warn!(index = i, %reason, "Skipping invalid tool config entry");
                return None;
            }
            if !config.enabled {
                tracing::debug!(tool = %config.tool_name, "Tool disabled in config");
                return None;
            }
            Some(config)
        })
        .collect()
}

/// Load tool configs from a file. A missing file yields no tools silently;
/// an unreadable one yields no tools and a warning.
pub fn load_tool_configs(path: &Path) -> Vec<ToolConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No tool config file");
        return Vec::new();
    }
    match std::fs::read_to_string(path) {
        Ok(text) => parse_tool_configs(&text),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not load tool config");
            Vec::new()
        }
    }
}
