//! Clipboard tool: read the system clipboard through platform utilities.

use async_trait::async_trait;
use shellpilot_core::error::ToolError;
use shellpilot_core::tool::{Tool, ToolOutput};
use tokio::process::Command;
use tracing::debug;

/// Where the clipboard is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardBackend {
    /// Windows, or Linux under WSL
    PowerShell,
    MacOs,
    /// xclip, falling back to xsel
    X11,
    Unsupported(&'static str),
}

impl ClipboardBackend {
    pub fn detect() -> Self {
        let wsl = std::env::var_os("WSL_DISTRO_NAME").is_some();
        Self::for_platform(std::env::consts::OS, wsl)
    }

    pub fn for_platform(os: &'static str, wsl: bool) -> Self {
        match os {
            "windows" => Self::PowerShell,
            "linux" if wsl => Self::PowerShell,
            "macos" => Self::MacOs,
            "linux" => Self::X11,
            other => Self::Unsupported(other),
        }
    }
}

async fn capture(program: &str, args: &[&str]) -> Result<String, String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| format!("{program}: {e}"))?;
    if !output.status.success() {
        return Err(format!(
            "{program} exited with {}",
            output.status.code().unwrap_or(-1)
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Read the clipboard contents as text.
pub async fn read_clipboard(backend: ClipboardBackend) -> Result<String, String> {
    debug!(?backend, "Reading clipboard");
    let text = match backend {
        ClipboardBackend::PowerShell => {
            capture("powershell.exe", &["-Command", "Get-Clipboard"]).await
        }
        ClipboardBackend::MacOs => capture("pbpaste", &[]).await,
        ClipboardBackend::X11 => match capture("xclip", &["-o", "-selection", "clipboard"]).await {
            Ok(text) => Ok(text),
            Err(_) => capture("xsel", &["--clipboard", "--output"])
                .await
                .map_err(|_| "Clipboard access requires xclip or xsel to be installed".to_string()),
        },
        ClipboardBackend::Unsupported(os) => Err(format!("Unsupported platform: {os}")),
    };
    text.map_err(|e| format!("Failed to read clipboard: {e}"))
}

pub struct ClipboardTool {
    backend: ClipboardBackend,
}

impl ClipboardTool {
    pub fn new(backend: ClipboardBackend) -> Self {
        Self { backend }
    }
}

impl Default for ClipboardTool {
    fn default() -> Self {
        Self::new(ClipboardBackend::detect())
    }
}

#[async_trait]
impl Tool for ClipboardTool {
    fn name(&self) -> &str {
        "read_clipboard"
    }

    fn description(&self) -> &str {
        "Read content from system clipboard"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        Ok(match read_clipboard(self.backend).await {
            Ok(text) => ToolOutput::text(text),
            Err(e) => ToolOutput::error(e),
        })
    }
}
