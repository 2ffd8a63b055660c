//! `shellpilot edit`: open a config file in the user's editor.

use crate::commands::load_config;
use anyhow::Context;
use std::path::Path;
use std::process::Command;

const EMPTY_TOOLS: &str = "[]\n";
const EMPTY_MEMORY: &str = "{\n  \"memories\": []\n}\n";

pub fn tools() -> anyhow::Result<()> {
    let config = load_config()?;
    open_in_editor(&config.editor(), &config.tool_config_file(), EMPTY_TOOLS)
}

pub fn memory() -> anyhow::Result<()> {
    let config = load_config()?;
    open_in_editor(&config.editor(), &config.memory_file(), EMPTY_MEMORY)
}

/// Seed `path` with `seed` if it is missing, then run the editor on it.
fn open_in_editor(editor: &str, path: &Path, seed: &str) -> anyhow::Result<()> {
    ensure_file(path, seed)?;

    // The editor setting may carry arguments, e.g. `code --wait`
    let mut parts = editor.split_whitespace();
    let program = parts.next().context("Editor command is empty")?;
    let status = Command::new(program)
        .args(parts)
        .arg(path)
        .status()
        .with_context(|| format!("Failed to launch editor `{editor}`"))?;
    if !status.success() {
        anyhow::bail!("Editor exited with {status}");
    }
    Ok(())
}

fn ensure_file(path: &Path, seed: &str) -> anyhow::Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, seed).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "Created empty file");
    Ok(())
}
