//! shellpilot CLI, the main entry point.
//!
//! Commands:
//! - `run`       Send a request to the assistant (editor, bash, hybrid or planner mode)
//! - `history`   Browse saved prompts and plan steps
//! - `export`    Write a session as markdown
//! - `settings`  List, read or change configuration values
//! - `edit`      Open the tool config or memory file in an editor
//! - `pricing`   Show per-model token prices

use clap::{Parser, Subcommand};
use shellpilot_agent::Mode;
use std::path::PathBuf;

mod commands;
mod review;

#[derive(Parser)]
#[command(
    name = "shellpilot",
    about = "shellpilot - edit files and run shell commands by asking in plain language",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a request to the assistant
    Run {
        /// editor, bash, hybrid or planner
        #[arg(short, long, default_value = "hybrid")]
        mode: Mode,

        /// Don't execute shell commands; the bash tool answers with a canned reply
        #[arg(long)]
        no_agi: bool,

        /// Run a generated plan without reviewing it
        #[arg(short, long)]
        yes: bool,

        /// The request
        #[arg(required = true, trailing_var_arg = true)]
        prompt: Vec<String>,
    },

    /// Browse saved prompts
    History {
        /// How many recent prompts to list
        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        /// Show one prompt in full
        #[arg(long)]
        view: Option<i64>,

        /// Show a session's prompt and plan steps
        #[arg(long)]
        session: Option<String>,
    },

    /// Export a session as markdown
    Export {
        #[arg(long)]
        session: String,

        /// Output directory (default: ~/.shellpilot/exports)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Manage settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Open a config file in your editor
    Edit {
        #[command(subcommand)]
        target: EditTarget,
    },

    /// Show model pricing
    Pricing,
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print all settings (secrets redacted)
    List,
    /// Print one setting by dotted key
    Get { key: String },
    /// Change one setting by dotted key
    Set { key: String, value: String },
}

#[derive(Subcommand)]
enum EditTarget {
    /// The custom tool definitions (JSON)
    Tools,
    /// The memory document (JSON)
    Memory,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            mode,
            no_agi,
            yes,
            prompt,
        } => commands::run::run(mode, no_agi, yes, prompt.join(" ")).await?,
        Commands::History {
            limit,
            view,
            session,
        } => commands::history::run(limit, view, session).await?,
        Commands::Export { session, out } => commands::export::run(&session, out).await?,
        Commands::Settings { action } => match action {
            SettingsAction::List => commands::settings::list()?,
            SettingsAction::Get { key } => commands::settings::get(&key)?,
            SettingsAction::Set { key, value } => commands::settings::set(&key, &value)?,
        },
        Commands::Edit { target } => match target {
            EditTarget::Tools => commands::edit::tools()?,
            EditTarget::Memory => commands::edit::memory()?,
        },
        Commands::Pricing => commands::pricing::run()?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_collects_prompt_words() {
        let cli = Cli::try_parse_from(["shellpilot", "run", "--mode", "bash", "list", "the", "files"])
            .unwrap();
        match cli.command {
            Commands::Run { mode, prompt, no_agi, yes } => {
                assert_eq!(mode, Mode::Bash);
                assert_eq!(prompt.join(" "), "list the files");
                assert!(!no_agi);
                assert!(!yes);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(Cli::try_parse_from(["shellpilot", "run", "--mode", "vim", "x"]).is_err());
    }

    #[test]
    fn settings_set_parses() {
        let cli = Cli::try_parse_from(["shellpilot", "settings", "set", "shell.timeout_secs", "30"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Settings {
                action: SettingsAction::Set { .. }
            }
        ));
    }
}
