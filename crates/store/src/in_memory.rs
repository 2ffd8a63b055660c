//! In-memory stores: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chrono::Utc;
use shellpilot_core::error::StoreError;
use shellpilot_core::history::{LogStore, NewPromptEntry, NewStepLog, PromptEntry, SessionLogEntry};
use shellpilot_core::memory::{Memory, MemoryStore};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct LogTables {
    prompts: Vec<PromptEntry>,
    steps: Vec<SessionLogEntry>,
}

/// A log store that keeps prompts and step logs in Vecs.
#[derive(Default, Clone)]
pub struct InMemoryLogStore {
    tables: Arc<RwLock<LogTables>>,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every step log across sessions, in insertion order.
    pub async fn all_steps(&self) -> Vec<SessionLogEntry> {
        self.tables.read().await.steps.clone()
    }
}

#[async_trait]
impl LogStore for InMemoryLogStore {
    async fn save_prompt(&self, entry: NewPromptEntry) -> Result<i64, StoreError> {
        let mut tables = self.tables.write().await;
        let id = tables.prompts.len() as i64 + 1;
        tables.prompts.push(PromptEntry {
            id,
            timestamp: Utc::now(),
            mode: entry.mode,
            prompt: entry.prompt,
            result: entry.result,
            tokens_used: entry.tokens_used,
            cost: entry.cost,
            session_id: entry.session_id,
        });
        Ok(id)
    }

    async fn list_prompts(&self, limit: usize) -> Result<Vec<PromptEntry>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.prompts.iter().rev().take(limit).cloned().collect())
    }

    async fn get_prompt(&self, id: i64) -> Result<Option<PromptEntry>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.prompts.iter().find(|p| p.id == id).cloned())
    }

    async fn get_prompt_by_session(&self, session_id: &str) -> Result<Option<PromptEntry>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .prompts
            .iter()
            .rev()
            .find(|p| p.session_id.as_deref() == Some(session_id))
            .cloned())
    }

    async fn log_step(&self, step: NewStepLog) -> Result<SessionLogEntry, StoreError> {
        let mut tables = self.tables.write().await;
        let entry = SessionLogEntry {
            id: tables.steps.len() as i64 + 1,
            session_id: step.session_id,
            timestamp: Utc::now(),
            step_number: step.step_number,
            step_description: step.step_description,
            tools_used: step.tools_used,
            result: step.result,
            error: step.error,
        };
        tables.steps.push(entry.clone());
        Ok(entry)
    }

    async fn session_logs(&self, session_id: &str) -> Result<Vec<SessionLogEntry>, StoreError> {
        let tables = self.tables.read().await;
        let mut logs: Vec<SessionLogEntry> = tables
            .steps
            .iter()
            .filter(|s| s.session_id == session_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order within a step number
        logs.sort_by_key(|s| s.step_number);
        Ok(logs)
    }
}

/// A memory store that lives only as long as the process.
#[derive(Default, Clone)]
pub struct InMemoryMemoryStore {
    memories: Arc<RwLock<Vec<Memory>>>,
}

impl InMemoryMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn add(&self, content: &str) -> Result<Memory, StoreError> {
        let memory = Memory::new(content);
        self.memories.write().await.push(memory.clone());
        Ok(memory)
    }

    async fn get_all(&self) -> Result<Vec<Memory>, StoreError> {
        Ok(self.memories.read().await.clone())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.memories.write().await.clear();
        Ok(())
    }
}
