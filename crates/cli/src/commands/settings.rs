//! `shellpilot settings`: configuration management.

use crate::commands::load_config;
use anyhow::Context;
use shellpilot_config::AppConfig;

pub fn list() -> anyhow::Result<()> {
    let config = load_config()?;
    println!("# {}", AppConfig::config_path().display());
    println!("{}", config.render_redacted()?);
    Ok(())
}

pub fn get(key: &str) -> anyhow::Result<()> {
    let config = load_config()?;
    match config.get_value(key)? {
        Some(value) => println!("{value}"),
        None => anyhow::bail!("Unknown setting: {key}"),
    }
    Ok(())
}

/// Reads the file without environment overrides so they are never persisted.
pub fn set(key: &str, value: &str) -> anyhow::Result<()> {
    let path = AppConfig::config_path();
    let mut config = AppConfig::load_from(&path).context("Failed to load config")?;
    config.set_value(key, value)?;
    config.save_to(&path)?;
    println!("{key} updated");
    Ok(())
}
