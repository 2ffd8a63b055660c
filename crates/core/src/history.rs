//! Prompt and step history.
//!
//! Every top-level invocation leaves one [`PromptEntry`]; every executed
//! plan step leaves one [`SessionLogEntry`]. Storage backends implement
//! [`LogStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A persisted top-level invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub mode: String,
    pub prompt: String,
    pub result: String,
    pub tokens_used: u64,
    pub cost: f64,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// A prompt entry about to be saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPromptEntry {
    pub mode: String,
    pub prompt: String,
    pub result: String,
    pub tokens_used: u64,
    pub cost: f64,
    pub session_id: Option<String>,
}

/// A persisted plan step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLogEntry {
    pub id: i64,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub step_number: u32,
    pub step_description: String,
    pub tools_used: Vec<String>,
    pub result: String,
    #[serde(default)]
    pub error: Option<String>,
}

/// A step log about to be saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStepLog {
    pub session_id: String,
    pub step_number: u32,
    pub step_description: String,
    pub tools_used: Vec<String>,
    pub result: String,
    pub error: Option<String>,
}

/// Relational log store.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Save a prompt; returns its id.
    async fn save_prompt(&self, entry: NewPromptEntry) -> Result<i64, StoreError>;

    /// Most recent prompts first.
    async fn list_prompts(&self, limit: usize) -> Result<Vec<PromptEntry>, StoreError>;

    async fn get_prompt(&self, id: i64) -> Result<Option<PromptEntry>, StoreError>;

    async fn get_prompt_by_session(&self, session_id: &str) -> Result<Option<PromptEntry>, StoreError>;

    /// Append a step entry; returns it with id and timestamp filled in.
    async fn log_step(&self, step: NewStepLog) -> Result<SessionLogEntry, StoreError>;

    /// Steps of one session, ordered by step number then insertion.
    async fn session_logs(&self, session_id: &str) -> Result<Vec<SessionLogEntry>, StoreError>;
}
