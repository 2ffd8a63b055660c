//! Planning layer: turn a request into ordered steps, then let the user
//! revise them.

use serde::Deserialize;
use shellpilot_core::error::{Error, Result};
use shellpilot_core::message::Message;
use shellpilot_core::plan::{Plan, PlanStep};
use shellpilot_core::provider::{ModelRequest, Provider};
use shellpilot_telemetry::SessionAccounting;
use std::sync::Arc;
use tracing::{debug, info};

use crate::conversation::ModelSettings;
use crate::prompts::PLANNER_SYSTEM_PROMPT;

pub struct Planner {
    provider: Arc<dyn Provider>,
    accounting: Arc<SessionAccounting>,
    settings: ModelSettings,
}

impl Planner {
    pub fn new(
        provider: Arc<dyn Provider>,
        accounting: Arc<SessionAccounting>,
        settings: ModelSettings,
    ) -> Self {
        Self {
            provider,
            accounting,
            settings,
        }
    }

    /// One model call producing a plan.
    ///
    /// `system_info` is the untagged system description; `available_tools`
    /// are the registry names a step may reference.
    pub async fn generate_plan(
        &self,
        system_info: &str,
        available_tools: &[String],
        user_prompt: &str,
    ) -> Result<Plan> {
        let tools_json = serde_json::to_string(available_tools)?;
        let content = format!(
            "<SystemInfo>{system_info}</SystemInfo>\n<Tools>{tools_json}</Tools>\n<UserRequest>{user_prompt}</UserRequest>"
        );
        let request = ModelRequest::new(
            self.settings.model.clone(),
            self.settings.max_tokens,
            vec![Message::user(content)],
        )
        .with_system(PLANNER_SYSTEM_PROMPT);

        let response = self.provider.complete(request).await?;
        let model = if response.model.is_empty() {
            self.settings.model.as_str()
        } else {
            response.model.as_str()
        };
        self.accounting
            .record(model, response.usage.input_tokens, response.usage.output_tokens);

        if !response.has_text() {
            return Err(Error::PlanParse("model returned no text".into()));
        }
        let plan = parse_plan(&response.text(), available_tools)?;
        info!(steps = plan.len(), "Plan generated");
        Ok(plan)
    }
}

#[derive(Deserialize)]
struct RawStep {
    #[serde(default)]
    step: i64,
    action: String,
    #[serde(default)]
    tools: Vec<String>,
}

/// Parse the planner's reply: a bare JSON array of `{step, action, tools?}`.
///
/// Only surrounding whitespace is tolerated. Tool names not in `known`
/// are dropped and ordinals are renumbered from 1.
pub fn parse_plan(text: &str, known: &[String]) -> Result<Plan> {
    let raw: Vec<RawStep> =
        serde_json::from_str(text.trim()).map_err(|e| Error::PlanParse(e.to_string()))?;
    if raw.is_empty() {
        return Err(Error::PlanParse("plan has no steps".into()));
    }

    let steps = raw
        .into_iter()
        .map(|s| {
            let (tools, unknown): (Vec<String>, Vec<String>) =
                s.tools.into_iter().partition(|t| known.contains(t));
            if !unknown.is_empty() {
                debug!(step = s.step, ?unknown, "Dropping unknown tools from plan step");
            }
            PlanStep::new(0, s.action).with_tools(tools)
        })
        .collect();

    let mut plan = Plan::new(steps);
    plan.renumber();
    Ok(plan)
}

/// What to do with one step during review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEdit {
    Keep,
    Modify,
    Delete,
    InsertBefore,
}

impl StepEdit {
    pub const ALL: [StepEdit; 4] = [
        StepEdit::Keep,
        StepEdit::Modify,
        StepEdit::Delete,
        StepEdit::InsertBefore,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StepEdit::Keep => "keep",
            StepEdit::Modify => "modify",
            StepEdit::Delete => "delete",
            StepEdit::InsertBefore => "insert_before",
        }
    }
}

/// Interactive input used by [`review_plan`].
pub trait PlanPrompter {
    /// Display the proposed plan before the first question.
    fn show_plan(&mut self, _plan: &Plan) {}

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool>;

    fn select_step_action(&mut self, step: &PlanStep) -> Result<StepEdit>;

    fn input(&mut self, message: &str, default: Option<&str>) -> Result<String>;
}

/// Let the user accept the plan or revise it step by step.
pub fn review_plan(plan: Plan, prompter: &mut dyn PlanPrompter) -> Result<Plan> {
    prompter.show_plan(&plan);
    if prompter.confirm("Do you want to proceed with this plan?", true)? {
        return Ok(plan);
    }

    let mut revised: Vec<PlanStep> = Vec::with_capacity(plan.len());
    let mut current = 0;
    while let Some(step) = plan.steps.get(current) {
        match prompter.select_step_action(step)? {
            StepEdit::Keep => {
                revised.push(step.clone());
                current += 1;
            }
            StepEdit::Modify => {
                let action = prompter.input("Enter modified step", Some(&step.action))?;
                revised.push(PlanStep::new(0, action).with_tools(step.tools.clone()));
                current += 1;
            }
            StepEdit::Delete => current += 1,
            StepEdit::InsertBefore => {
                let action = prompter.input("Enter new step to insert", None)?;
                revised.push(PlanStep::new(0, action));
            }
        }
    }

    if prompter.confirm("Do you want to add more steps?", false)? {
        loop {
            let action = prompter.input("Enter new step", None)?;
            revised.push(PlanStep::new(0, action));
            if !prompter.confirm("Add another step?", false)? {
                break;
            }
        }
    }

    let mut plan = Plan::new(revised);
    plan.renumber();
    debug!(steps = plan.len(), "Plan revised");
    Ok(plan)
}
