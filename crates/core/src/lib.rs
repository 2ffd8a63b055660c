//! # shellpilot Core
//!
//! Domain types, traits, and error definitions for the shellpilot agent.
//! This crate has **no I/O of its own**: it defines the domain model that
//! the provider, tool, store, and agent crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator the orchestration core talks to is a trait here:
//! - [`Provider`]: the LLM oracle
//! - [`Tool`]: one named handler in the [`ToolRegistry`]
//! - [`LogStore`]: prompt and step history
//! - [`MemoryStore`]: the memory document the memory tools operate on
//!
//! Implementations live in their respective crates, so tests can swap any
//! of them for an in-memory fake.

pub mod error;
pub mod history;
pub mod memory;
pub mod message;
pub mod plan;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use history::{LogStore, NewPromptEntry, NewStepLog, PromptEntry, SessionLogEntry};
pub use memory::{Memory, MemoryStore};
pub use message::{ContentBlock, Message, ResultSegment, Role, ToolUse, Transcript};
pub use plan::{Plan, PlanStep};
pub use provider::{ModelRequest, ModelResponse, Provider, StopReason, Usage};
pub use tool::{Tool, ToolDeclaration, ToolOutput, ToolRegistry, ToolResult};
