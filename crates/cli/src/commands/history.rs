//! `shellpilot history`: browse saved prompts and plan steps.

use crate::commands::{load_config, open_log_store};
use shellpilot_core::{LogStore, PromptEntry, SessionLogEntry};

pub async fn run(limit: usize, view: Option<i64>, session: Option<String>) -> anyhow::Result<()> {
    let config = load_config()?;
    let store = open_log_store(&config).await?;

    if let Some(id) = view {
        let Some(entry) = store.get_prompt(id).await? else {
            anyhow::bail!("No prompt with id {id}");
        };
        let steps = match &entry.session_id {
            Some(sid) => store.session_logs(sid).await?,
            None => Vec::new(),
        };
        print_entry(&entry, &steps);
        return Ok(());
    }

    if let Some(sid) = session {
        let Some(entry) = store.get_prompt_by_session(&sid).await? else {
            anyhow::bail!("Session {sid} not found");
        };
        let steps = store.session_logs(&sid).await?;
        print_entry(&entry, &steps);
        return Ok(());
    }

    let entries = store.list_prompts(limit).await?;
    if entries.is_empty() {
        println!("No history yet.");
        return Ok(());
    }
    println!("{:>5}  {:<19}  {:<8}  {:>8}  {:>10}  Prompt", "ID", "Time", "Mode", "Tokens", "Cost");
    for e in &entries {
        println!(
            "{:>5}  {:<19}  {:<8}  {:>8}  {:>10}  {}",
            e.id,
            e.timestamp.format("%Y-%m-%d %H:%M:%S"),
            e.mode,
            e.tokens_used,
            format!("${:.6}", e.cost),
            preview(&e.prompt, 60)
        );
    }
    Ok(())
}

fn print_entry(entry: &PromptEntry, steps: &[SessionLogEntry]) {
    println!("Prompt #{}  ({})", entry.id, entry.timestamp.to_rfc3339());
    if let Some(sid) = &entry.session_id {
        println!("Session:  {sid}");
    }
    println!("Mode:     {}", entry.mode);
    println!("Tokens:   {}", entry.tokens_used);
    println!("Cost:     ${:.6}", entry.cost);
    println!();
    println!("Prompt:");
    println!("{}", entry.prompt);
    println!();
    println!("Result:");
    println!("{}", entry.result);

    for step in steps {
        println!();
        println!("Step {}: {}", step.step_number, step.step_description);
        if !step.tools_used.is_empty() {
            println!("  tools: {}", step.tools_used.join(", "));
        }
        match &step.error {
            Some(error) => println!("  error: {error}"),
            None => println!("  result: {}", step.result),
        }
    }
}

/// First line of `text`, cut to `max` characters.
fn preview(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > max {
        let cut: String = line.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}
