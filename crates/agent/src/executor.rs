//! Step executor: runs a plan one step at a time.
//!
//! Each step gets its own conversation loop scoped to the step's tools
//! plus the always-available ones. The transcript is carried from step to
//! step. A failing step is logged and the plan continues.

use chrono::Utc;
use futures::FutureExt;
use shellpilot_core::error::Error;
use shellpilot_core::history::{LogStore, NewStepLog, SessionLogEntry};
use shellpilot_core::message::Transcript;
use shellpilot_core::plan::{Plan, PlanStep};
use shellpilot_core::provider::Provider;
use shellpilot_telemetry::SessionAccounting;
use shellpilot_tools::ALWAYS_AVAILABLE;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::conversation::{ConversationLoop, ModelSettings};
use crate::dispatcher::ToolDispatcher;

pub struct StepExecutor {
    provider: Arc<dyn Provider>,
    dispatcher: Arc<ToolDispatcher>,
    accounting: Arc<SessionAccounting>,
    settings: ModelSettings,
    log_store: Arc<dyn LogStore>,
    session_id: String,
    system: Option<String>,
    transcript: Transcript,
}

impl StepExecutor {
    pub fn new(
        provider: Arc<dyn Provider>,
        dispatcher: Arc<ToolDispatcher>,
        accounting: Arc<SessionAccounting>,
        settings: ModelSettings,
        log_store: Arc<dyn LogStore>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            accounting,
            settings,
            log_store,
            session_id: session_id.into(),
            system: None,
            transcript: Transcript::new(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Tool names a step may use, in registry order.
    fn step_tools(&self, step: &PlanStep) -> Vec<String> {
        let registry = self.dispatcher.registry();
        registry
            .names()
            .into_iter()
            .filter(|n| ALWAYS_AVAILABLE.contains(&n.as_str()) || step.tools.contains(n))
            .collect()
    }

    /// Run every step in order and return one log entry per step.
    pub async fn run_plan(&mut self, plan: &Plan) -> Vec<SessionLogEntry> {
        let mut entries = Vec::with_capacity(plan.len());
        for step in &plan.steps {
            entries.push(self.run_step(step).await);
        }
        entries
    }

    async fn run_step(&mut self, step: &PlanStep) -> SessionLogEntry {
        let tool_names = self.step_tools(step);
        info!(step = step.step, action = %step.action, tools = ?tool_names, "Executing step");

        let mut lp = ConversationLoop::new(
            self.provider.clone(),
            self.dispatcher.clone(),
            self.accounting.clone(),
            self.settings.clone(),
        )
        .with_tools(self.dispatcher.registry().subset(&tool_names))
        .with_transcript(std::mem::take(&mut self.transcript));
        if let Some(system) = &self.system {
            lp = lp.with_system(system.clone());
        }

        let run = AssertUnwindSafe(lp.run(&step.action)).catch_unwind().await;
        let (result, failure) = match run {
            Ok(Ok(outcome)) => {
                self.transcript = lp.into_transcript();
                (outcome.text, outcome.tool_error)
            }
            Ok(Err(e)) => {
                self.transcript = lp.into_transcript();
                (String::new(), Some(e.to_string()))
            }
            Err(_) => {
                warn!(step = step.step, "Step panicked; continuing with a fresh transcript");
                self.transcript = Transcript::new();
                (String::new(), Some("step panicked".to_string()))
            }
        };

        let error = failure.map(|reason| {
            let err = Error::StepExecution {
                step: step.step,
                reason,
            };
            warn!(error = %err, "Step failed");
            err.to_string()
        });

        let log = NewStepLog {
            session_id: self.session_id.clone(),
            step_number: step.step,
            step_description: step.action.clone(),
            tools_used: tool_names,
            result,
            error,
        };
        match self.log_store.log_step(log.clone()).await {
            Ok(entry) => entry,
            Err(e) => {
                error!(step = step.step, error = %e, "Failed to persist step log");
                SessionLogEntry {
                    id: 0,
                    session_id: log.session_id,
                    timestamp: Utc::now(),
                    step_number: log.step_number,
                    step_description: log.step_description,
                    tools_used: log.tools_used,
                    result: log.result,
                    error: log.error,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use async_trait::async_trait;
    use serde_json::json;
    use shellpilot_core::error::{ProviderError, StoreError};
    use shellpilot_core::history::{NewPromptEntry, PromptEntry};
    use shellpilot_core::message::ContentBlock;
    use shellpilot_core::provider::StopReason;
    use shellpilot_core::tool::ToolRegistry;
    use shellpilot_store::InMemoryLogStore;

    fn settings() -> ModelSettings {
        ModelSettings {
            model: "mock-model".into(),
            max_tokens: 1024,
            thinking_budget: None,
            max_iterations: 10,
        }
    }

    fn registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register_builtin(Arc::new(EchoTool));
        registry.register_builtin(Arc::new(FailingTool));
        Arc::new(registry)
    }

    fn executor(
        provider: Arc<SequentialMockProvider>,
        store: Arc<dyn LogStore>,
    ) -> StepExecutor {
        StepExecutor::new(
            provider,
            Arc::new(ToolDispatcher::new(registry())),
            Arc::new(SessionAccounting::new()),
            settings(),
            store,
            "sess-1",
        )
    }

    fn plan() -> Plan {
        Plan::new(vec![
            PlanStep::new(1, "first").with_tools(vec!["echo".into()]),
            PlanStep::new(2, "second"),
            PlanStep::new(3, "third"),
        ])
    }

    #[tokio::test]
    async fn failing_middle_step_does_not_abort_plan() {
        let provider = Arc::new(SequentialMockProvider::with_results(vec![
            Ok(text_response("did first")),
            Err(ProviderError::Network("connection reset".into())),
            Ok(text_response("did third")),
        ]));
        let store = Arc::new(InMemoryLogStore::new());
        let mut exec = executor(provider, store.clone());

        let entries = exec.run_plan(&plan()).await;
        assert_eq!(entries.len(), 3);
        assert!(entries[0].error.is_none());
        assert!(entries[1].error.as_deref().unwrap().starts_with("Step 2 failed"));
        assert!(entries[2].error.is_none());
        assert_eq!(entries[2].result, "did third");
        assert_eq!(store.session_logs("sess-1").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn step_tools_are_scoped() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            text_response("a"),
            text_response("b"),
            text_response("c"),
        ]));
        let mut exec = executor(provider.clone(), Arc::new(InMemoryLogStore::new()));
        let entries = exec.run_plan(&plan()).await;

        // Neither always-available tool is registered here, so only the subset remains
        assert_eq!(entries[0].tools_used, vec!["echo"]);
        assert!(entries[1].tools_used.is_empty());
        let requests = provider.requests();
        assert_eq!(requests[0].tools.len(), 1);
        assert!(requests[1].tools.is_empty());
    }

    #[tokio::test]
    async fn transcript_is_threaded_between_steps() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            tool_response("", vec![tool_use("t1", "echo", json!({"text": "x"}))]),
            text_response("first done"),
            text_response("second done"),
            text_response("third done"),
        ]));
        let mut exec = executor(provider.clone(), Arc::new(InMemoryLogStore::new()));
        exec.run_plan(&plan()).await;

        let requests = provider.requests();
        // Step 2's request sees step 1's whole exchange
        assert_eq!(requests[2].messages.len(), 5);
        assert_eq!(requests[2].messages[4].text(), "second");
        assert!(exec.transcript().unanswered_tool_uses().is_empty());
    }

    #[tokio::test]
    async fn truncated_step_leaves_no_dangling_tool_use() {
        let mut truncated = tool_response("", vec![tool_use("t1", "echo", json!({"text": "x"}))]);
        truncated.stop_reason = StopReason::MaxTokens;
        let provider = Arc::new(SequentialMockProvider::new(vec![
            truncated,
            text_response("second done"),
        ]));
        let mut exec = executor(provider.clone(), Arc::new(InMemoryLogStore::new()));
        let two_steps = Plan::new(vec![PlanStep::new(1, "first"), PlanStep::new(2, "second")]);

        let entries = exec.run_plan(&two_steps).await;
        assert_eq!(
            entries[0].error.as_deref(),
            Some("Step 1 failed: Tool call not executed: response ended with max_tokens")
        );
        assert!(entries[1].error.is_none());

        let messages = provider.requests()[1].messages.clone();
        for (i, msg) in messages.iter().enumerate() {
            for call in msg.tool_uses() {
                let answered = messages.get(i + 1).is_some_and(|next| {
                    next.content.iter().any(|b| {
                        matches!(b, ContentBlock::ToolResult { tool_use_id, .. } if *tool_use_id == call.id)
                    })
                });
                assert!(answered, "tool_use {} sent without a result", call.id);
            }
        }
    }

    #[tokio::test]
    async fn tool_error_is_recorded_on_the_step() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            tool_response("", vec![tool_use("t1", "failing", json!({}))]),
            text_response("ok"),
            text_response("ok"),
        ]));
        let mut exec = executor(provider, Arc::new(InMemoryLogStore::new()));
        let entries = exec.run_plan(&plan()).await;
        assert_eq!(
            entries[0].error.as_deref(),
            Some("Step 1 failed: failing failed: disk on fire")
        );
        assert!(entries[1].error.is_none());
    }

    #[tokio::test]
    async fn panicking_step_is_contained() {
        // Two responses for three steps: the provider panics on step 3
        let provider = Arc::new(SequentialMockProvider::new(vec![
            text_response("one"),
            text_response("two"),
        ]));
        let mut exec = executor(provider, Arc::new(InMemoryLogStore::new()));
        let entries = exec.run_plan(&plan()).await;
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].error.as_deref(), Some("Step 3 failed: step panicked"));
        assert!(exec.transcript().is_empty());
    }

    struct BrokenStore;

    #[async_trait]
    impl LogStore for BrokenStore {
        async fn save_prompt(&self, _entry: NewPromptEntry) -> Result<i64, StoreError> {
            Err(StoreError::Storage("read-only".into()))
        }
        async fn list_prompts(&self, _limit: usize) -> Result<Vec<PromptEntry>, StoreError> {
            Ok(Vec::new())
        }
        async fn get_prompt(&self, _id: i64) -> Result<Option<PromptEntry>, StoreError> {
            Ok(None)
        }
        async fn get_prompt_by_session(&self, _id: &str) -> Result<Option<PromptEntry>, StoreError> {
            Ok(None)
        }
        async fn log_step(&self, _step: NewStepLog) -> Result<SessionLogEntry, StoreError> {
            Err(StoreError::Storage("read-only".into()))
        }
        async fn session_logs(&self, _id: &str) -> Result<Vec<SessionLogEntry>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn store_failure_does_not_abort_plan() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            text_response("a"),
            text_response("b"),
            text_response("c"),
        ]));
        let mut exec = executor(provider.clone(), Arc::new(BrokenStore));
        let entries = exec.run_plan(&plan()).await;
        assert_eq!(entries.len(), 3);
        assert_eq!(provider.call_count(), 3);
        assert_eq!(entries[1].result, "b");
    }
}
