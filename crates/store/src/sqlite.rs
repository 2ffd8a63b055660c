//! SQLite history store.
//!
//! Uses a single SQLite database file with two tables:
//! - `prompts`: one row per top-level invocation
//! - `session_logs`: one row per executed plan step
//!
//! Timestamps are stored as RFC 3339 text; `tools_used` as a JSON array.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shellpilot_core::error::StoreError;
use shellpilot_core::history::{LogStore, NewPromptEntry, NewStepLog, PromptEntry, SessionLogEntry};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// A SQLite-backed [`LogStore`].
pub struct SqliteLogStore {
    pool: SqlitePool,
}

impl SqliteLogStore {
    /// Open (or create) the database at a filesystem path, creating parent
    /// directories as needed.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Storage(format!("Failed to create {}: {e}", parent.display())))?;
        }
        let options = SqliteConnectOptions::new().filename(path);
        Self::connect(options, 4, &path.display().to_string()).await
    }

    /// Create a store from a connection string.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database.
    pub async fn new(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?;
        // Every in-memory connection is its own database
        let max_connections = if url.contains(":memory:") { 1 } else { 4 };
        Self::connect(options, max_connections, url).await
    }

    async fn connect(
        options: SqliteConnectOptions,
        max_connections: u32,
        label: &str,
    ) -> Result<Self, StoreError> {
        let options = options
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite history store initialized at {label}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS prompts (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp   TEXT NOT NULL,
                mode        TEXT NOT NULL,
                prompt      TEXT NOT NULL,
                result      TEXT,
                tokens_used INTEGER,
                cost        REAL,
                session_id  TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("prompts table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS session_logs (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id       TEXT NOT NULL,
                timestamp        TEXT NOT NULL,
                step_number      INTEGER NOT NULL,
                step_description TEXT NOT NULL,
                tools_used       TEXT NOT NULL,
                result           TEXT,
                error            TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("session_logs table: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_prompts_session ON prompts(session_id)")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("prompts index: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_session_logs_session ON session_logs(session_id, step_number)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("session_logs index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn parse_timestamp(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_prompt(row: &sqlx::sqlite::SqliteRow) -> Result<PromptEntry, StoreError> {
        let col = |name: &str, e: sqlx::Error| StoreError::QueryFailed(format!("{name} column: {e}"));

        let timestamp: String = row.try_get("timestamp").map_err(|e| col("timestamp", e))?;
        let tokens: Option<i64> = row.try_get("tokens_used").map_err(|e| col("tokens_used", e))?;
        Ok(PromptEntry {
            id: row.try_get("id").map_err(|e| col("id", e))?,
            timestamp: Self::parse_timestamp(&timestamp),
            mode: row.try_get("mode").map_err(|e| col("mode", e))?,
            prompt: row.try_get("prompt").map_err(|e| col("prompt", e))?,
            result: row
                .try_get::<Option<String>, _>("result")
                .map_err(|e| col("result", e))?
                .unwrap_or_default(),
            tokens_used: tokens.unwrap_or(0).max(0) as u64,
            cost: row
                .try_get::<Option<f64>, _>("cost")
                .map_err(|e| col("cost", e))?
                .unwrap_or(0.0),
            session_id: row.try_get("session_id").map_err(|e| col("session_id", e))?,
        })
    }

    fn row_to_step(row: &sqlx::sqlite::SqliteRow) -> Result<SessionLogEntry, StoreError> {
        let col = |name: &str, e: sqlx::Error| StoreError::QueryFailed(format!("{name} column: {e}"));

        let timestamp: String = row.try_get("timestamp").map_err(|e| col("timestamp", e))?;
        let tools_json: String = row.try_get("tools_used").map_err(|e| col("tools_used", e))?;
        let step_number: i64 = row.try_get("step_number").map_err(|e| col("step_number", e))?;
        Ok(SessionLogEntry {
            id: row.try_get("id").map_err(|e| col("id", e))?,
            session_id: row.try_get("session_id").map_err(|e| col("session_id", e))?,
            timestamp: Self::parse_timestamp(&timestamp),
            step_number: step_number.max(0) as u32,
            step_description: row
                .try_get("step_description")
                .map_err(|e| col("step_description", e))?,
            tools_used: serde_json::from_str(&tools_json).unwrap_or_default(),
            result: row
                .try_get::<Option<String>, _>("result")
                .map_err(|e| col("result", e))?
                .unwrap_or_default(),
            error: row.try_get("error").map_err(|e| col("error", e))?,
        })
    }
}

#[async_trait]
impl LogStore for SqliteLogStore {
    async fn save_prompt(&self, entry: NewPromptEntry) -> Result<i64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO prompts (timestamp, mode, prompt, result, tokens_used, cost, session_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(Utc::now().to_rfc3339())
        .bind(&entry.mode)
        .bind(&entry.prompt)
        .bind(&entry.result)
        .bind(entry.tokens_used as i64)
        .bind(entry.cost)
        .bind(&entry.session_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT prompt failed: {e}")))?;

        let id = result.last_insert_rowid();
        debug!(id, mode = %entry.mode, "Saved prompt");
        Ok(id)
    }

    async fn list_prompts(&self, limit: usize) -> Result<Vec<PromptEntry>, StoreError> {
        let rows = sqlx::query("SELECT * FROM prompts ORDER BY id DESC LIMIT ?1")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("List prompts: {e}")))?;
        rows.iter().map(Self::row_to_prompt).collect()
    }

    async fn get_prompt(&self, id: i64) -> Result<Option<PromptEntry>, StoreError> {
        let row = sqlx::query("SELECT * FROM prompts WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Get prompt: {e}")))?;
        row.as_ref().map(Self::row_to_prompt).transpose()
    }

    async fn get_prompt_by_session(&self, session_id: &str) -> Result<Option<PromptEntry>, StoreError> {
        let row = sqlx::query("SELECT * FROM prompts WHERE session_id = ?1 ORDER BY id DESC LIMIT 1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Get prompt by session: {e}")))?;
        row.as_ref().map(Self::row_to_prompt).transpose()
    }

    async fn log_step(&self, step: NewStepLog) -> Result<SessionLogEntry, StoreError> {
        let timestamp = Utc::now();
        let tools_json = serde_json::to_string(&step.tools_used)
            .map_err(|e| StoreError::Storage(format!("tools_used serialization: {e}")))?;

        let result = sqlx::query(
            r#"
            INSERT INTO session_logs (session_id, timestamp, step_number, step_description, tools_used, result, error)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&step.session_id)
        .bind(timestamp.to_rfc3339())
        .bind(step.step_number as i64)
        .bind(&step.step_description)
        .bind(&tools_json)
        .bind(&step.result)
        .bind(&step.error)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT step failed: {e}")))?;

        debug!(session_id = %step.session_id, step = step.step_number, "Logged step");
        Ok(SessionLogEntry {
            id: result.last_insert_rowid(),
            session_id: step.session_id,
            timestamp,
            step_number: step.step_number,
            step_description: step.step_description,
            tools_used: step.tools_used,
            result: step.result,
            error: step.error,
        })
    }

    async fn session_logs(&self, session_id: &str) -> Result<Vec<SessionLogEntry>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM session_logs WHERE session_id = ?1 ORDER BY step_number ASC, id ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Session logs: {e}")))?;
        rows.iter().map(Self::row_to_step).collect()
    }
}
