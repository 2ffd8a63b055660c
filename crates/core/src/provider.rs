//! Provider trait: the abstraction over the LLM backend.
//!
//! A Provider takes the full transcript plus tool declarations and returns
//! one complete model turn. Inference itself is out of scope; the agent
//! only depends on this contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::{ContentBlock, Message};
use crate::tool::ToolDeclaration;

/// One model call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    /// The model to use (e.g., "claude-sonnet-4-20250514")
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// The conversation so far
    pub messages: Vec<Message>,

    /// Tools the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDeclaration>,

    /// Top-level system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Extended-thinking token budget, when enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_budget: Option<u32>,
}

impl ModelRequest {
    pub fn new(model: impl Into<String>, max_tokens: u32, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            messages,
            tools: Vec::new(),
            system: None,
            thinking_budget: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDeclaration>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_thinking_budget(mut self, budget: Option<u32>) -> Self {
        self.thinking_budget = budget;
        self
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    ToolUse,
    EndTurn,
    MaxTokens,
    StopSequence,
    #[serde(untagged)]
    Other(String),
}

impl StopReason {
    pub fn parse(s: &str) -> Self {
        match s {
            "tool_use" => StopReason::ToolUse,
            "end_turn" => StopReason::EndTurn,
            "max_tokens" => StopReason::MaxTokens,
            "stop_sequence" => StopReason::StopSequence,
            other => StopReason::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StopReason::ToolUse => "tool_use",
            StopReason::EndTurn => "end_turn",
            StopReason::MaxTokens => "max_tokens",
            StopReason::StopSequence => "stop_sequence",
            StopReason::Other(other) => other,
        }
    }
}

/// Token usage for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A complete response from the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    pub stop_reason: StopReason,

    /// Ordered content blocks (text, tool_use, thinking, redacted_thinking)
    pub content: Vec<ContentBlock>,

    pub usage: Usage,

    /// Which model actually responded (may differ from requested)
    #[serde(default)]
    pub model: String,
}

impl ModelResponse {
    /// Text blocks joined by newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn has_text(&self) -> bool {
        self.content
            .iter()
            .any(|b| matches!(b, ContentBlock::Text { .. }))
    }
}

/// The core Provider trait.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name (e.g., "anthropic").
    fn name(&self) -> &str;

    /// Send a request and get one complete model turn.
    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError>;
}
