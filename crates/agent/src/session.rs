//! One top-level invocation: a direct conversation or a planned run.
//!
//! Whatever happens inside, a session flushes its token accounting and
//! saves exactly one prompt entry before returning.

use chrono::Utc;
use futures::FutureExt;
use shellpilot_core::error::{Error, Result};
use shellpilot_core::history::{LogStore, NewPromptEntry, SessionLogEntry};
use shellpilot_core::provider::Provider;
use shellpilot_core::tool::{ToolDeclaration, ToolRegistry};
use shellpilot_telemetry::{CostReport, PricingTable, SessionAccounting};
use shellpilot_tools::MEMORY_TOOLS;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};

use crate::conversation::{ConversationLoop, ModelSettings};
use crate::dispatcher::ToolDispatcher;
use crate::executor::StepExecutor;
use crate::planner::{PlanPrompter, Planner, review_plan};
use crate::prompts::{SystemInfo, bash_prompt, combined_prompt, editor_prompt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// File editing with the editor and memory tools
    Editor,
    /// Shell commands with the bash and memory tools
    Bash,
    /// Every registered tool
    Hybrid,
    /// Plan first, then run each step
    Planner,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Editor => "editor",
            Mode::Bash => "bash",
            Mode::Hybrid => "hybrid",
            Mode::Planner => "planner",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "editor" => Ok(Mode::Editor),
            "bash" => Ok(Mode::Bash),
            "hybrid" => Ok(Mode::Hybrid),
            "planner" => Ok(Mode::Planner),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

/// `yyyyMMdd-HHmmss-xxxxxx`
pub fn new_session_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().format("%Y%m%d-%H%M%S"), &suffix[..6])
}

/// Everything a session talks to.
pub struct SessionDeps {
    pub provider: Arc<dyn Provider>,
    pub registry: Arc<ToolRegistry>,
    pub log_store: Arc<dyn LogStore>,
    pub pricing: Arc<PricingTable>,
    pub settings: ModelSettings,
    pub user_name: String,
    pub system_info: SystemInfo,
}

#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub session_id: String,
    pub mode: Mode,
    pub text: String,
    pub tool_error: Option<String>,
    /// Step logs of a planned run; empty for direct modes
    pub steps: Vec<SessionLogEntry>,
    pub cost: CostReport,
    /// Id of the saved prompt entry, if saving succeeded
    pub prompt_id: Option<i64>,
}

struct Finished {
    text: String,
    tool_error: Option<String>,
    steps: Vec<SessionLogEntry>,
}

impl Finished {
    fn result_text(&self) -> &str {
        self.tool_error.as_deref().unwrap_or(&self.text)
    }
}

pub struct Session {
    id: String,
    deps: SessionDeps,
    dispatcher: Arc<ToolDispatcher>,
    accounting: Arc<SessionAccounting>,
}

impl Session {
    pub fn new(id: impl Into<String>, deps: SessionDeps) -> Self {
        let dispatcher = Arc::new(ToolDispatcher::new(deps.registry.clone()));
        Self {
            id: id.into(),
            deps,
            dispatcher,
            accounting: Arc::new(SessionAccounting::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn tools_for(&self, mode: Mode) -> Vec<ToolDeclaration> {
        let registry = &self.deps.registry;
        match mode {
            Mode::Editor => {
                let mut names = vec!["str_replace_editor"];
                names.extend(MEMORY_TOOLS);
                registry.subset(&names)
            }
            Mode::Bash => {
                let mut names = vec!["bash"];
                names.extend(MEMORY_TOOLS);
                registry.subset(&names)
            }
            Mode::Hybrid | Mode::Planner => registry.list_tools(),
        }
    }

    fn system_for(&self, mode: Mode) -> String {
        let info = &self.deps.system_info;
        match mode {
            Mode::Editor => editor_prompt(info),
            Mode::Bash => bash_prompt(info),
            Mode::Hybrid | Mode::Planner => combined_prompt(
                info,
                &self.deps.registry.list_tools(),
                &self.deps.user_name,
                None,
            ),
        }
    }

    /// Run `prompt` in a direct mode. `Mode::Planner` runs the plan unreviewed.
    pub async fn run(&self, mode: Mode, prompt: &str) -> Result<SessionOutcome> {
        if mode == Mode::Planner {
            return self.run_planned(prompt, None).await;
        }
        info!(session = %self.id, %mode, "Starting session");
        let inner = AssertUnwindSafe(self.direct(mode, prompt)).catch_unwind().await;
        self.finish(mode, prompt, flatten_panic(inner)).await
    }

    /// Plan, optionally review, then execute every step.
    pub async fn run_planned(
        &self,
        prompt: &str,
        prompter: Option<&mut dyn PlanPrompter>,
    ) -> Result<SessionOutcome> {
        info!(session = %self.id, mode = "planner", "Starting session");
        let inner = AssertUnwindSafe(self.planned(prompt, prompter))
            .catch_unwind()
            .await;
        self.finish(Mode::Planner, prompt, flatten_panic(inner)).await
    }

    async fn direct(&self, mode: Mode, prompt: &str) -> Result<Finished> {
        let mut lp = ConversationLoop::new(
            self.deps.provider.clone(),
            self.dispatcher.clone(),
            self.accounting.clone(),
            self.deps.settings.clone(),
        )
        .with_tools(self.tools_for(mode))
        .with_system(self.system_for(mode));

        let outcome = lp.run(prompt).await?;
        Ok(Finished {
            text: outcome.text,
            tool_error: outcome.tool_error,
            steps: Vec::new(),
        })
    }

    async fn planned(
        &self,
        prompt: &str,
        prompter: Option<&mut dyn PlanPrompter>,
    ) -> Result<Finished> {
        let planner = Planner::new(
            self.deps.provider.clone(),
            self.accounting.clone(),
            self.deps.settings.clone(),
        );
        let plan = planner
            .generate_plan(
                &self.deps.system_info.describe(),
                &self.deps.registry.names(),
                prompt,
            )
            .await?;

        let plan = match prompter {
            Some(prompter) => review_plan(plan, prompter)?,
            None => plan,
        };
        if plan.is_empty() {
            info!(session = %self.id, "Plan is empty after review; nothing to run");
            return Ok(Finished {
                text: "Plan is empty; nothing was executed.".into(),
                tool_error: None,
                steps: Vec::new(),
            });
        }

        let mut executor = StepExecutor::new(
            self.deps.provider.clone(),
            self.dispatcher.clone(),
            self.accounting.clone(),
            self.deps.settings.clone(),
            self.deps.log_store.clone(),
            self.id.clone(),
        )
        .with_system(self.system_for(Mode::Planner));
        let steps = executor.run_plan(&plan).await;

        let failed = steps.iter().filter(|s| s.error.is_some()).count();
        let text = steps
            .iter()
            .map(|s| match &s.error {
                Some(e) => e.clone(),
                None => format!("Step {}: {}", s.step_number, s.result),
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        info!(session = %self.id, steps = steps.len(), failed, "Plan executed");

        Ok(Finished {
            text,
            tool_error: None,
            steps,
        })
    }

    async fn finish(
        &self,
        mode: Mode,
        prompt: &str,
        inner: Result<Finished>,
    ) -> Result<SessionOutcome> {
        let cost = self.accounting.flush(&self.deps.pricing);
        info!(
            session = %self.id,
            tokens = cost.total_tokens,
            cost_usd = cost.total_cost_usd,
            "Session finished"
        );

        let result = match &inner {
            Ok(finished) => finished.result_text().to_string(),
            Err(e) => e.to_string(),
        };
        let entry = NewPromptEntry {
            mode: mode.as_str().to_string(),
            prompt: prompt.to_string(),
            result,
            tokens_used: cost.total_tokens,
            cost: cost.total_cost_usd,
            session_id: Some(self.id.clone()),
        };
        let prompt_id = match self.deps.log_store.save_prompt(entry).await {
            Ok(id) => Some(id),
            Err(e) => {
                error!(session = %self.id, error = %e, "Failed to save prompt entry");
                None
            }
        };

        let finished = inner?;
        Ok(SessionOutcome {
            session_id: self.id.clone(),
            mode,
            text: finished.text,
            tool_error: finished.tool_error,
            steps: finished.steps,
            cost,
            prompt_id,
        })
    }
}

fn flatten_panic(
    run: std::result::Result<Result<Finished>, Box<dyn std::any::Any + Send>>,
) -> Result<Finished> {
    run.unwrap_or_else(|_| {
        error!("Session panicked");
        Err(Error::Internal("session panicked".into()))
    })
}
