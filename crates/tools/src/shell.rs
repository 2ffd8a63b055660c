//! Shell tool: execute commands with `bash -c`.
//!
//! The environment is snapshotted when the tool is built and reused for
//! every command; `restart` re-captures it. Dry-run mode never spawns.

use async_trait::async_trait;
use shellpilot_config::AppConfig;
use shellpilot_core::error::ToolError;
use shellpilot_core::tool::{Tool, ToolOutput};
use std::collections::HashMap;
use std::process::Output;
use std::sync::Mutex;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

pub const DRY_RUN_TEXT: &str = "in mock mode, command did not run";
pub const RESTARTED_TEXT: &str = "Bash session restarted.";

/// Execute shell commands against a captured environment.
pub struct ShellTool {
    env: Mutex<HashMap<String, String>>,
    dry_run: bool,
    /// 0 = no bound
    timeout_secs: u64,
}

impl ShellTool {
    pub fn new(dry_run: bool, timeout_secs: u64) -> Self {
        Self {
            env: Mutex::new(std::env::vars().collect()),
            dry_run,
            timeout_secs,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.dry_run, config.shell.timeout_secs)
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Re-capture the process environment.
    pub fn restart(&self) {
        let fresh: HashMap<String, String> = std::env::vars().collect();
        *self.env.lock().unwrap_or_else(|e| e.into_inner()) = fresh;
        info!("Shell environment re-captured");
    }

    fn snapshot(&self) -> HashMap<String, String> {
        self.env.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Run one command line and map its exit status to a tool output.
    ///
    /// Shared by the `bash` tool and user-configured command tools.
    pub async fn run_command(&self, tool_name: &str, command: &str) -> Result<ToolOutput, ToolError> {
        if self.dry_run {
            debug!(tool = %tool_name, command = %command, "Dry run; not executing");
            return Ok(ToolOutput::text(DRY_RUN_TEXT));
        }

        debug!(tool = %tool_name, command = %command, "Executing shell command");
        let env = self.snapshot();

        let output = match self.spawn("bash", command, &env).await {
            Ok(output) => output,
            Err(SpawnError::Io(e)) => {
                let fallback = env
                    .get("SHELL")
                    .cloned()
                    .unwrap_or_else(|| "sh".to_string());
                warn!(error = %e, shell = %fallback, "bash unavailable; falling back");
                self.spawn(&fallback, command, &env)
                    .await
                    .map_err(|e| e.into_tool_error(tool_name, self.timeout_secs))?
            }
            Err(e) => return Err(e.into_tool_error(tool_name, self.timeout_secs)),
        };

        Ok(map_output(tool_name, command, &output))
    }

    async fn spawn(
        &self,
        program: &str,
        command: &str,
        env: &HashMap<String, String>,
    ) -> Result<Output, SpawnError> {
        let mut cmd = Command::new(program);
        cmd.arg("-c")
            .arg(command)
            .env_clear()
            .envs(env)
            .kill_on_drop(true);

        if self.timeout_secs == 0 {
            return cmd.output().await.map_err(SpawnError::Io);
        }
        match tokio::time::timeout(Duration::from_secs(self.timeout_secs), cmd.output()).await {
            Ok(result) => result.map_err(SpawnError::Io),
            Err(_) => Err(SpawnError::TimedOut),
        }
    }
}

enum SpawnError {
    Io(std::io::Error),
    TimedOut,
}

impl SpawnError {
    fn into_tool_error(self, tool_name: &str, timeout_secs: u64) -> ToolError {
        match self {
            SpawnError::Io(e) => ToolError::ExecutionFailed {
                tool_name: tool_name.to_string(),
                reason: e.to_string(),
            },
            SpawnError::TimedOut => ToolError::Timeout {
                tool_name: tool_name.to_string(),
                timeout_secs,
            },
        }
    }
}

fn map_output(tool_name: &str, command: &str, output: &Output) -> ToolOutput {
    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            ToolOutput::text("Command executed successfully.")
        } else {
            ToolOutput::text(trimmed)
        }
    } else {
        let code = output.status.code().unwrap_or(-1);
        warn!(tool = %tool_name, command = %command, exit_code = code, "Command failed");
        let stderr = String::from_utf8_lossy(&output.stderr);
        let trimmed = stderr.trim();
        if trimmed.is_empty() {
            ToolOutput::error("Command execution failed.")
        } else {
            ToolOutput::error(trimmed)
        }
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "bash"
    }

    fn description(&self) -> &str {
        "Execute a shell command in the user's environment and return its output. \
         Set `restart` to true to reset the shell environment."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                },
                "restart": {
                    "type": "boolean",
                    "description": "Restart the shell session instead of running a command"
                }
            }
        })
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        if input["restart"].as_bool().unwrap_or(false) {
            self.restart();
            return Ok(ToolOutput::text(RESTARTED_TEXT));
        }

        match input["command"].as_str() {
            Some(command) if !command.trim().is_empty() => self.run_command("bash", command).await,
            _ => Ok(ToolOutput::error("No command provided to execute.")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn execute_echo() {
        let tool = ShellTool::new(false, 0);
        let out = tool.execute(json!({"command": "echo hello"})).await.unwrap();
        assert!(!out.is_error);
        assert_eq!(out.joined(), "hello");
    }

    #[tokio::test]
    async fn empty_stdout_reports_success() {
        let tool = ShellTool::new(false, 0);
        let out = tool.execute(json!({"command": "true"})).await.unwrap();
        assert_eq!(out.joined(), "Command executed successfully.");
    }

    #[tokio::test]
    async fn non_zero_exit_returns_stderr() {
        let tool = ShellTool::new(false, 0);
        let out = tool
            .execute(json!({"command": "echo boom >&2; exit 3"}))
            .await
            .unwrap();
        assert!(out.is_error);
        assert_eq!(out.joined(), "boom");

        let silent = tool.execute(json!({"command": "exit 1"})).await.unwrap();
        assert!(silent.is_error);
        assert_eq!(silent.joined(), "Command execution failed.");
    }

    #[tokio::test]
    async fn dry_run_never_spawns() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("touched");
        let tool = ShellTool::new(true, 0);

        let out = tool
            .execute(json!({"command": format!("touch {}", marker.display())}))
            .await
            .unwrap();
        assert_eq!(out.joined(), DRY_RUN_TEXT);
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn missing_command_is_error() {
        let tool = ShellTool::new(false, 0);
        let out = tool.execute(json!({})).await.unwrap();
        assert!(out.is_error);
        assert_eq!(out.joined(), "No command provided to execute.");
    }

    #[tokio::test]
    async fn restart_does_not_run_command() {
        let tool = ShellTool::new(false, 0);
        let out = tool
            .execute(json!({"restart": true, "command": "exit 1"}))
            .await
            .unwrap();
        assert_eq!(out.joined(), RESTARTED_TEXT);
    }

    #[tokio::test]
    async fn timeout_is_reported() {
        let tool = ShellTool::new(false, 1);
        let result = tool.execute(json!({"command": "sleep 5"})).await;
        assert!(matches!(result, Err(ToolError::Timeout { timeout_secs: 1, .. })));
    }
}
