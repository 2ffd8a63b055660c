//! Memory trait: the small persistent note list the memory tools manage.
//!
//! Memories survive across sessions. The on-disk layout is
//! `{ "memories": [ { id, content, timestamp } ] }`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A single memory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    /// UUID v4
    pub id: String,

    pub content: String,

    /// Unix milliseconds
    pub timestamp: i64,
}

impl Memory {
    /// A fresh memory stamped with the current time.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Storage for memories.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Append a memory and return it.
    async fn add(&self, content: &str) -> Result<Memory, StoreError>;

    /// All memories in insertion order.
    async fn get_all(&self) -> Result<Vec<Memory>, StoreError>;

    /// Remove every memory.
    async fn clear(&self) -> Result<(), StoreError>;
}
