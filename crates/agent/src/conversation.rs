//! The conversation loop: model call → tool dispatch → repeat.
//!
//! The loop ends when the model stops for any reason other than
//! `tool_use`, when a tool result comes back as an error, when the model
//! call fails, or when the iteration bound is reached. Every `tool_use`
//! block of a turn is answered before the next model call.

use shellpilot_config::AppConfig;
use shellpilot_core::error::{Error, Result};
use shellpilot_core::message::{ContentBlock, ResultSegment, Transcript};
use shellpilot_core::provider::{ModelRequest, Provider, StopReason};
use shellpilot_core::tool::ToolDeclaration;
use shellpilot_telemetry::SessionAccounting;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::dispatcher::{ToolDispatcher, result_block};

/// Model parameters shared by every call in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSettings {
    pub model: String,
    pub max_tokens: u32,
    pub thinking_budget: Option<u32>,
    pub max_iterations: usize,
}

impl ModelSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            thinking_budget: config.thinking_budget,
            max_iterations: config.max_iterations,
        }
    }
}

/// What one run of the loop produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopOutcome {
    /// Text of the last model response
    pub text: String,
    /// Set when a tool error or the iteration bound ended the loop
    pub tool_error: Option<String>,
    pub model_calls: usize,
    pub tool_calls: usize,
    /// Distinct tool names dispatched, in first-use order
    pub tools_used: Vec<String>,
}

impl LoopOutcome {
    pub fn is_success(&self) -> bool {
        self.tool_error.is_none()
    }

    /// The error when there is one, otherwise the final text.
    pub fn result_text(&self) -> &str {
        self.tool_error.as_deref().unwrap_or(&self.text)
    }
}

pub struct ConversationLoop {
    provider: Arc<dyn Provider>,
    dispatcher: Arc<ToolDispatcher>,
    accounting: Arc<SessionAccounting>,
    settings: ModelSettings,
    tools: Vec<ToolDeclaration>,
    system: Option<String>,
    transcript: Transcript,
}

impl ConversationLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        dispatcher: Arc<ToolDispatcher>,
        accounting: Arc<SessionAccounting>,
        settings: ModelSettings,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            accounting,
            settings,
            tools: Vec::new(),
            system: None,
            transcript: Transcript::new(),
        }
    }

    /// Tools offered to the model on every call of this loop.
    pub fn with_tools(mut self, tools: Vec<ToolDeclaration>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Continue an existing conversation instead of starting empty.
    pub fn with_transcript(mut self, transcript: Transcript) -> Self {
        self.transcript = transcript;
        self
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn into_transcript(self) -> Transcript {
        self.transcript
    }

    fn request(&self) -> ModelRequest {
        let mut request = ModelRequest::new(
            self.settings.model.clone(),
            self.settings.max_tokens,
            self.transcript.messages().to_vec(),
        )
        .with_tools(self.tools.clone())
        .with_thinking_budget(self.settings.thinking_budget);
        if let Some(system) = &self.system {
            request = request.with_system(system.clone());
        }
        request
    }

    /// Append `prompt` as a user message and drive the loop to a terminal state.
    ///
    /// A model-call failure is returned as [`Error::ModelCall`]; the
    /// transcript keeps everything appended before it.
    pub async fn run(&mut self, prompt: &str) -> Result<LoopOutcome> {
        self.transcript.push_user_text(prompt);
        let mut outcome = LoopOutcome::default();

        loop {
            if outcome.model_calls >= self.settings.max_iterations {
                warn!(
                    max_iterations = self.settings.max_iterations,
                    "Max model calls reached, stopping loop"
                );
                outcome.tool_error = Some(format!(
                    "Reached maximum of {} model calls",
                    self.settings.max_iterations
                ));
                return Ok(outcome);
            }

            debug!(
                iteration = outcome.model_calls + 1,
                messages = self.transcript.len(),
                tools = self.tools.len(),
                "Calling model"
            );
            let response = self.provider.complete(self.request()).await.map_err(|e| {
                warn!(error = %e, "Model call failed");
                Error::ModelCall(e)
            })?;
            outcome.model_calls += 1;

            let model = if response.model.is_empty() {
                self.settings.model.as_str()
            } else {
                response.model.as_str()
            };
            self.accounting
                .record(model, response.usage.input_tokens, response.usage.output_tokens);

            let calls: Vec<_> = response
                .content
                .iter()
                .filter_map(|b| b.as_tool_use())
                .collect();
            outcome.text = response.text();
            let stop_reason = response.stop_reason.clone();
            self.transcript.push_assistant(response.content);

            if stop_reason != StopReason::ToolUse {
                // A truncated turn can still carry tool_use blocks; answer them
                if !calls.is_empty() {
                    let reason = format!(
                        "Tool call not executed: response ended with {}",
                        stop_reason.as_str()
                    );
                    warn!(
                        calls = calls.len(),
                        stop_reason = stop_reason.as_str(),
                        "Model stopped mid tool call"
                    );
                    self.transcript.push_tool_results(
                        calls
                            .iter()
                            .map(|c| ContentBlock::ToolResult {
                                tool_use_id: c.id.clone(),
                                content: vec![ResultSegment::Text { text: reason.clone() }],
                                is_error: true,
                            })
                            .collect::<Vec<_>>(),
                    );
                    outcome.tool_error = Some(reason);
                }
                info!(
                    model_calls = outcome.model_calls,
                    tool_calls = outcome.tool_calls,
                    "Conversation finished"
                );
                return Ok(outcome);
            }

            let mut results = Vec::with_capacity(calls.len());
            let mut first_error = None;
            for call in &calls {
                let result = self.dispatcher.dispatch(call).await;
                outcome.tool_calls += 1;
                if !outcome.tools_used.contains(&call.name) {
                    outcome.tools_used.push(call.name.clone());
                }
                if result.output.is_error && first_error.is_none() {
                    first_error = Some(result.output.joined());
                }
                results.push(result_block(&result));
            }
            self.transcript.push_tool_results(results);

            if let Some(error) = first_error {
                warn!(%error, "Tool returned an error, ending conversation");
                outcome.tool_error = Some(error);
                return Ok(outcome);
            }
        }
    }
}
