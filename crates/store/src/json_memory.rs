//! File-based memory store: a single pretty-printed JSON document.
//!
//! Layout: `{ "memories": [ { "id", "content", "timestamp" } ] }`.
//! The file is re-read on every operation so edits made with
//! `shellpilot edit memory` are picked up immediately. An unreadable or
//! corrupt file reads as empty.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shellpilot_core::error::StoreError;
use shellpilot_core::memory::{Memory, MemoryStore};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Default, Serialize, Deserialize)]
struct MemoryFile {
    #[serde(default)]
    memories: Vec<Memory>,
}

/// A [`MemoryStore`] persisted to one JSON file.
pub struct JsonMemoryStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl JsonMemoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> MemoryFile {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "Memory file unreadable; treating as empty");
                return MemoryFile::default();
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Memory file is corrupt; treating as empty");
            MemoryFile::default()
        })
    }

    async fn write(&self, file: &MemoryFile) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Storage(format!("Failed to create memory directory: {e}")))?;
        }
        let body = serde_json::to_string_pretty(file)
            .map_err(|e| StoreError::Storage(format!("Failed to serialize memories: {e}")))?;
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to write memory file: {e}")))
    }
}

#[async_trait]
impl MemoryStore for JsonMemoryStore {
    async fn add(&self, content: &str) -> Result<Memory, StoreError> {
        let _guard = self.lock.lock().await;
        let mut file = self.read().await;
        let memory = Memory::new(content);
        file.memories.push(memory.clone());
        self.write(&file).await?;
        debug!(id = %memory.id, total = file.memories.len(), "Memory added");
        Ok(memory)
    }

    async fn get_all(&self) -> Result<Vec<Memory>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.read().await.memories)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        self.write(&MemoryFile::default()).await?;
        debug!("Memories cleared");
        Ok(())
    }
}
