//! Memory tools: add, list, and clear persisted memories.

use async_trait::async_trait;
use shellpilot_core::error::{StoreError, ToolError};
use shellpilot_core::memory::MemoryStore;
use shellpilot_core::tool::{Tool, ToolOutput};
use std::sync::Arc;

fn store_failure(tool_name: &str, e: StoreError) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: tool_name.to_string(),
        reason: e.to_string(),
    }
}

fn to_json<T: serde::Serialize>(tool_name: &str, value: &T) -> Result<ToolOutput, ToolError> {
    serde_json::to_string(value)
        .map(ToolOutput::text)
        .map_err(|e| ToolError::ExecutionFailed {
            tool_name: tool_name.to_string(),
            reason: e.to_string(),
        })
}

pub struct AddMemoryTool {
    store: Arc<dyn MemoryStore>,
}

impl AddMemoryTool {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for AddMemoryTool {
    fn name(&self) -> &str {
        "add_memory"
    }

    fn description(&self) -> &str {
        "Add a new memory to the system"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "The content to remember"
                }
            },
            "required": ["content"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let content = input["content"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'content' argument".into()))?;
        let memory = self
            .store
            .add(content)
            .await
            .map_err(|e| store_failure(self.name(), e))?;
        to_json(self.name(), &memory)
    }
}

pub struct GetMemoriesTool {
    store: Arc<dyn MemoryStore>,
}

impl GetMemoriesTool {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetMemoriesTool {
    fn name(&self) -> &str {
        "get_memories"
    }

    fn description(&self) -> &str {
        "Retrieve all stored memories"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let memories = self
            .store
            .get_all()
            .await
            .map_err(|e| store_failure(self.name(), e))?;
        to_json(self.name(), &memories)
    }
}

pub struct ClearMemoriesTool {
    store: Arc<dyn MemoryStore>,
}

impl ClearMemoriesTool {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ClearMemoriesTool {
    fn name(&self) -> &str {
        "clear_memories"
    }

    fn description(&self) -> &str {
        "Clear all stored memories"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        self.store
            .clear()
            .await
            .map_err(|e| store_failure(self.name(), e))?;
        to_json(
            self.name(),
            &serde_json::json!({ "message": "Memories cleared successfully" }),
        )
    }
}
