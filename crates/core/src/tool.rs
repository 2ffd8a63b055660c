//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act: run shell commands,
//! edit files, keep memories, read the clipboard, fetch web content, and
//! run user-configured commands.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ToolError;

/// A tool declaration sent to the model so it knows what it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,

    /// JSON Schema object describing the input
    pub input_schema: serde_json::Value,
}

/// What a handler produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub content: Vec<String>,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![text.into()],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![text.into()],
            is_error: true,
        }
    }

    /// All content segments joined by newlines.
    pub fn joined(&self) -> String {
        self.content.join("\n")
    }
}

/// The answer to one tool-use request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub output: ToolOutput,
}

/// The core Tool trait.
///
/// Each handler (bash, str_replace_editor, add_memory, ...) implements this
/// trait and is registered in the [`ToolRegistry`] at startup.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "bash").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's input.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool. Recoverable failures the model should see are
    /// returned as `Ok(ToolOutput::error(..))`.
    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError>;

    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Name-keyed handler map, populated once at startup.
///
/// Built-in tools always win lookup over dynamic (user-configured) ones,
/// and declarations are listed in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    builtin: Vec<Arc<dyn Tool>>,
    dynamic: Vec<Arc<dyn Tool>>,
    index: HashMap<String, (bool, usize)>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a built-in tool. Replaces an earlier built-in with the same name.
    pub fn register_builtin(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some((true, pos)) => self.builtin[*pos] = tool,
            Some((false, _)) => {
                tracing::warn!(tool = %name, "Built-in tool shadows a dynamic tool; dropping the dynamic one");
                self.dynamic.retain(|t| t.name() != name);
                self.reindex();
                self.builtin.push(tool);
                self.index.insert(name, (true, self.builtin.len() - 1));
            }
            None => {
                self.builtin.push(tool);
                self.index.insert(name, (true, self.builtin.len() - 1));
            }
        }
    }

    /// Register a dynamic tool. Returns `false` (and registers nothing) when
    /// the name is already taken.
    pub fn register_dynamic(&mut self, tool: Arc<dyn Tool>) -> bool {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            tracing::warn!(tool = %name, "Dynamic tool name collides with an existing tool; skipping");
            return false;
        }
        self.dynamic.push(tool);
        self.index.insert(name, (false, self.dynamic.len() - 1));
        true
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (i, t) in self.builtin.iter().enumerate() {
            self.index.insert(t.name().to_string(), (true, i));
        }
        for (i, t) in self.dynamic.iter().enumerate() {
            self.index.insert(t.name().to_string(), (false, i));
        }
    }

    fn ordered(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.builtin.iter().chain(self.dynamic.iter())
    }

    /// Look up a handler by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        match self.index.get(name)? {
            (true, pos) => self.builtin.get(*pos).cloned(),
            (false, pos) => self.dynamic.get(*pos).cloned(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn is_dynamic(&self, name: &str) -> bool {
        matches!(self.index.get(name), Some((false, _)))
    }

    /// Every declaration: built-ins first, then dynamic tools.
    pub fn list_tools(&self) -> Vec<ToolDeclaration> {
        self.ordered().map(|t| t.declaration()).collect()
    }

    pub fn declaration_for(&self, name: &str) -> Option<ToolDeclaration> {
        self.get(name).map(|t| t.declaration())
    }

    /// Declarations whose names appear in `names`, in registry order.
    pub fn subset<S: AsRef<str>>(&self, names: &[S]) -> Vec<ToolDeclaration> {
        self.ordered()
            .filter(|t| names.iter().any(|n| n.as_ref() == t.name()))
            .map(|t| t.declaration())
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.ordered().map(|t| t.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
