pub mod edit;
pub mod export;
pub mod history;
pub mod pricing;
pub mod run;
pub mod settings;

use anyhow::Context;
use shellpilot_config::AppConfig;
use shellpilot_store::SqliteLogStore;

pub(crate) fn load_config() -> anyhow::Result<AppConfig> {
    AppConfig::load().context("Failed to load config")
}

pub(crate) async fn open_log_store(config: &AppConfig) -> anyhow::Result<SqliteLogStore> {
    let path = config.history_db_file();
    SqliteLogStore::open(&path)
        .await
        .with_context(|| format!("Failed to open history at {}", path.display()))
}
