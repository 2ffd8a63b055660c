//! Tool dispatch: turns one `tool_use` request into exactly one result.
//!
//! Dispatch never fails: unknown tools, handler errors, and handler panics
//! all become `is_error` results the model can see.

use futures::FutureExt;
use shellpilot_core::message::{ContentBlock, ResultSegment, ToolUse};
use shellpilot_core::tool::{ToolOutput, ToolRegistry, ToolResult};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn dispatch(&self, call: &ToolUse) -> ToolResult {
        let start = Instant::now();

        let output = match self.registry.get(&call.name) {
            None => {
                warn!(tool = %call.name, "Model requested an unknown tool");
                ToolOutput::error(format!("Unknown tool: {}", call.name))
            }
            Some(tool) => {
                match AssertUnwindSafe(tool.execute(call.input.clone()))
                    .catch_unwind()
                    .await
                {
                    Ok(Ok(output)) => output,
                    Ok(Err(e)) => ToolOutput::error(e.to_string()),
                    Err(panic) => {
                        let reason = panic_message(panic.as_ref());
                        warn!(tool = %call.name, %reason, "Tool handler panicked");
                        ToolOutput::error(format!("{} panicked: {reason}", call.name))
                    }
                }
            }
        };

        info!(
            tool = %call.name,
            success = !output.is_error,
            duration_ms = start.elapsed().as_millis() as u64,
            "Tool dispatched"
        );

        ToolResult {
            tool_call_id: call.id.clone(),
            output,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// The `tool_result` block answering a dispatched call.
pub fn result_block(result: &ToolResult) -> ContentBlock {
    ContentBlock::ToolResult {
        tool_use_id: result.tool_call_id.clone(),
        content: result
            .output
            .content
            .iter()
            .map(|text| ResultSegment::Text { text: text.clone() })
            .collect(),
        is_error: result.output.is_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingTool, PanickingTool, tool_use};
    use serde_json::json;

    fn dispatcher() -> ToolDispatcher {
        let mut registry = ToolRegistry::new();
        registry.register_builtin(Arc::new(FailingTool));
        registry.register_builtin(Arc::new(PanickingTool));
        ToolDispatcher::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn unknown_tool_is_error_result() {
        let result = dispatcher().dispatch(&tool_use("t1", "frobnicate", json!({}))).await;
        assert_eq!(result.tool_call_id, "t1");
        assert!(result.output.is_error);
        assert_eq!(result.output.joined(), "Unknown tool: frobnicate");
    }

    #[tokio::test]
    async fn handler_error_becomes_result() {
        let result = dispatcher().dispatch(&tool_use("t2", "failing", json!({}))).await;
        assert!(result.output.is_error);
        assert_eq!(result.output.joined(), "failing failed: disk on fire");
    }

    #[tokio::test]
    async fn handler_panic_is_caught() {
        let result = dispatcher().dispatch(&tool_use("t3", "panicking", json!({}))).await;
        assert!(result.output.is_error);
        assert!(result.output.joined().contains("handler exploded"));
    }

    #[test]
    fn result_block_preserves_id_and_flag() {
        let block = result_block(&ToolResult {
            tool_call_id: "abc".into(),
            output: ToolOutput::error("nope"),
        });
        assert_eq!(
            serde_json::to_value(&block).unwrap(),
            json!({
                "type": "tool_result",
                "tool_use_id": "abc",
                "content": [{"type": "text", "text": "nope"}],
                "is_error": true
            })
        );
    }
}
