//! User-configured command tools.
//!
//! Each `{{param}}` in the command template is replaced with the matching
//! input value and the result runs through the shared [`ShellTool`].

use async_trait::async_trait;
use shellpilot_config::ToolConfig;
use shellpilot_core::error::ToolError;
use shellpilot_core::tool::{Tool, ToolOutput};
use std::sync::Arc;

use crate::shell::ShellTool;

pub struct DynamicTool {
    config: ToolConfig,
    description: String,
    shell: Arc<ShellTool>,
}

impl DynamicTool {
    pub fn new(config: ToolConfig, shell: Arc<ShellTool>) -> Self {
        let description = if config.output.is_empty() {
            config.description.clone()
        } else {
            format!("{} Output: {}", config.description, config.output)
        };
        Self {
            config,
            description,
            shell,
        }
    }

    /// Fill the command template from `input`.
    pub fn render_command(&self, input: &serde_json::Value) -> Result<String, String> {
        let mut command = self.config.command.clone();
        for param in &self.config.input {
            let value = match input.get(&param.name) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Null) | None if param.required => {
                    return Err(format!("Missing required parameter: {}", param.name));
                }
                Some(serde_json::Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            command = command.replace(&format!("{{{{{}}}}}", param.name), &value);
        }
        Ok(command)
    }
}

#[async_trait]
impl Tool for DynamicTool {
    fn name(&self) -> &str {
        &self.config.tool_name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> serde_json::Value {
        self.config.input_schema()
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        match self.render_command(&input) {
            Ok(command) => self.shell.run_command(self.name(), &command).await,
            Err(e) => Ok(ToolOutput::error(e)),
        }
    }
}
