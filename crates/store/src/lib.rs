//! Storage implementations for shellpilot.
//!
//! - [`SqliteLogStore`]: prompt and step history in SQLite
//! - [`InMemoryLogStore`] / [`InMemoryMemoryStore`]: ephemeral stores for tests
//! - [`JsonMemoryStore`]: the `{ "memories": [...] }` document
//! - [`export`]: session history as markdown, and back

pub mod export;
pub mod in_memory;
pub mod json_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use export::{
    ExportParseError, ExportedSession, ExportedStep, export_session_markdown, parse_session_markdown,
    render_session_markdown,
};
pub use in_memory::{InMemoryLogStore, InMemoryMemoryStore};
pub use json_memory::JsonMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteLogStore;
