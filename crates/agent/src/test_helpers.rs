//! Shared test helpers for agent tests.

use async_trait::async_trait;
use shellpilot_core::error::{ProviderError, ToolError};
use shellpilot_core::message::{ContentBlock, ToolUse};
use shellpilot_core::provider::{ModelRequest, ModelResponse, Provider, StopReason, Usage};
use shellpilot_core::tool::{Tool, ToolOutput};
use std::sync::Mutex;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue and
/// records the request. Panics if more calls are made than responses
/// provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<Result<ModelResponse, ProviderError>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    pub fn with_results(responses: Vec<Result<ModelResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn single_text(text: &str) -> Self {
        Self::new(vec![text_response(text)])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len() - 1
        };
        // Release the lock before panicking so later calls don't see a poisoned mutex
        let next = {
            let responses = self.responses.lock().unwrap();
            responses.get(call).cloned().ok_or(responses.len())
        };
        match next {
            Ok(response) => response,
            Err(have) => panic!("SequentialMockProvider: no more responses (call #{call}, have {have})"),
        }
    }
}

fn usage() -> Usage {
    Usage {
        input_tokens: 10,
        output_tokens: 5,
    }
}

/// A final answer (end_turn).
pub fn text_response(text: &str) -> ModelResponse {
    ModelResponse {
        stop_reason: StopReason::EndTurn,
        content: vec![ContentBlock::text(text)],
        usage: usage(),
        model: "mock-model".into(),
    }
}

/// A tool_use turn with an optional leading thought.
pub fn tool_response(thought: &str, calls: Vec<ToolUse>) -> ModelResponse {
    let mut content = Vec::new();
    if !thought.is_empty() {
        content.push(ContentBlock::text(thought));
    }
    content.extend(calls.into_iter().map(|c| ContentBlock::ToolUse {
        id: c.id,
        name: c.name,
        input: c.input,
    }));
    ModelResponse {
        stop_reason: StopReason::ToolUse,
        content,
        usage: usage(),
        model: "mock-model".into(),
    }
}

pub fn tool_use(id: &str, name: &str, input: serde_json::Value) -> ToolUse {
    ToolUse {
        id: id.into(),
        name: name.into(),
        input,
    }
}

/// Echoes its `text` argument.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo the input text"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {"text": {"type": "string"}},
            "required": ["text"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput::text(input["text"].as_str().unwrap_or_default()))
    }
}

pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "failing"
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: "failing".into(),
            reason: "disk on fire".into(),
        })
    }
}

pub struct PanickingTool;

#[async_trait]
impl Tool for PanickingTool {
    fn name(&self) -> &str {
        "panicking"
    }

    fn description(&self) -> &str {
        "Always panics"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        panic!("handler exploded");
    }
}
