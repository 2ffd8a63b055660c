//! The agent layer of shellpilot.
//!
//! A [`Session`] runs one user request either directly, as a single
//! [`ConversationLoop`] over a scoped tool set, or as a plan: the
//! [`Planner`] asks the model for ordered steps, the user may revise
//! them, and the [`StepExecutor`] runs each step in its own loop while
//! carrying the transcript forward.

pub mod conversation;
pub mod dispatcher;
pub mod executor;
pub mod planner;
pub mod prompts;
pub mod session;

#[cfg(test)]
mod test_helpers;

pub use conversation::{ConversationLoop, LoopOutcome, ModelSettings};
pub use dispatcher::ToolDispatcher;
pub use executor::StepExecutor;
pub use planner::{PlanPrompter, Planner, StepEdit, parse_plan, review_plan};
pub use prompts::SystemInfo;
pub use session::{Mode, Session, SessionDeps, SessionOutcome, new_session_id};
