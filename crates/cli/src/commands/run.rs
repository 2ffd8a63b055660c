//! `shellpilot run`: one request, start to finish.

use crate::commands::{load_config, open_log_store};
use crate::review::DialoguerPrompter;
use shellpilot_agent::{Mode, ModelSettings, Session, SessionDeps, SessionOutcome, SystemInfo, new_session_id};
use shellpilot_config::load_tool_configs;
use shellpilot_core::MemoryStore;
use shellpilot_store::JsonMemoryStore;
use shellpilot_telemetry::PricingTable;
use shellpilot_tools::build_registry;
use std::sync::Arc;

pub async fn run(mode: Mode, no_agi: bool, yes: bool, prompt: String) -> anyhow::Result<()> {
    let mut config = load_config()?;
    if no_agi {
        config.dry_run = true;
    }

    let provider = shellpilot_providers::from_config(&config)?;
    let memory: Arc<dyn MemoryStore> = Arc::new(JsonMemoryStore::new(config.memory_file()));
    let tool_configs = load_tool_configs(&config.tool_config_file());
    let registry = build_registry(&config, tool_configs, memory);
    let log_store = open_log_store(&config).await?;

    let session = Session::new(
        new_session_id(),
        SessionDeps {
            provider: Arc::new(provider),
            registry: Arc::new(registry),
            log_store: Arc::new(log_store),
            pricing: Arc::new(PricingTable::from_config(&config)),
            settings: ModelSettings::from_config(&config),
            user_name: config.user_name.clone(),
            system_info: SystemInfo::detect(),
        },
    );

    let outcome = if mode == Mode::Planner && !yes {
        session.run_planned(&prompt, Some(&mut DialoguerPrompter)).await?
    } else {
        session.run(mode, &prompt).await?
    };

    print_outcome(&outcome)
}

fn print_outcome(outcome: &SessionOutcome) -> anyhow::Result<()> {
    if outcome.mode == Mode::Planner {
        for step in &outcome.steps {
            match &step.error {
                Some(error) => eprintln!("  [{}] {error}", step.step_number),
                None => println!("  [{}] {}", step.step_number, step.result),
            }
        }
        if outcome.steps.is_empty() {
            println!("{}", outcome.text);
        }
    } else if !outcome.text.is_empty() {
        println!("{}", outcome.text);
    }

    eprintln!();
    eprintln!(
        "  session {}  |  {} tokens  |  ${:.6}",
        outcome.session_id, outcome.cost.total_tokens, outcome.cost.total_cost_usd
    );

    if let Some(error) = &outcome.tool_error {
        anyhow::bail!("{error}");
    }
    let failed = outcome.steps.iter().filter(|s| s.error.is_some()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} steps failed", outcome.steps.len());
    }
    Ok(())
}
