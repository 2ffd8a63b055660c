//! `shellpilot export`: write a session as markdown.

use crate::commands::{load_config, open_log_store};
use anyhow::Context;
use chrono::Utc;
use shellpilot_store::export_session_markdown;
use std::path::{Path, PathBuf};

pub async fn run(session_id: &str, out: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config()?;
    let store = open_log_store(&config).await?;

    let markdown = export_session_markdown(&store, session_id).await?;
    let dir = out.unwrap_or_else(|| config.export_directory());
    let path = write_export(&dir, session_id, &markdown)?;
    println!("Exported session {session_id} to {}", path.display());
    Ok(())
}

pub(crate) fn export_file_name(session_id: &str) -> String {
    format!("session_{session_id}_{}.md", Utc::now().format("%Y%m%d_%H%M%S"))
}

fn write_export(dir: &Path, session_id: &str, markdown: &str) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(export_file_name(session_id));
    std::fs::write(&path, markdown).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
