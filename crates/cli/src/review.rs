//! Interactive plan review on the terminal.

use dialoguer::{Confirm, Input, Select};
use shellpilot_agent::{PlanPrompter, StepEdit};
use shellpilot_core::error::{Error, Result};
use shellpilot_core::plan::{Plan, PlanStep};

pub struct DialoguerPrompter;

fn prompt_err(e: dialoguer::Error) -> Error {
    Error::Prompt(e.to_string())
}

impl PlanPrompter for DialoguerPrompter {
    fn show_plan(&mut self, plan: &Plan) {
        println!();
        println!("  Proposed plan:");
        for step in &plan.steps {
            if step.tools.is_empty() {
                println!("    {}. {}", step.step, step.action);
            } else {
                println!("    {}. {}  [{}]", step.step, step.action, step.tools.join(", "));
            }
        }
        println!();
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        Confirm::new()
            .with_prompt(message)
            .default(default)
            .interact()
            .map_err(prompt_err)
    }

    fn select_step_action(&mut self, step: &PlanStep) -> Result<StepEdit> {
        let labels: Vec<&str> = StepEdit::ALL.iter().map(|e| e.label()).collect();
        let index = Select::new()
            .with_prompt(format!("Step {}: {}", step.step, step.action))
            .items(&labels)
            .default(0)
            .interact()
            .map_err(prompt_err)?;
        Ok(StepEdit::ALL[index])
    }

    fn input(&mut self, message: &str, default: Option<&str>) -> Result<String> {
        let mut input = Input::<String>::new().with_prompt(message);
        if let Some(default) = default {
            input = input.with_initial_text(default);
        }
        input.interact_text().map_err(prompt_err)
    }
}
