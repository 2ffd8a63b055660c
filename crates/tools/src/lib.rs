//! Built-in tool implementations for shellpilot.
//!
//! Tools give the agent the ability to act on the user's machine:
//! run shell commands, edit files, keep memories, read the clipboard,
//! fetch web content, and run user-configured command templates.

pub mod clipboard;
pub mod dynamic;
pub mod editor;
pub mod memory;
pub mod shell;
pub mod web;

use shellpilot_config::{AppConfig, ToolConfig};
use shellpilot_core::memory::MemoryStore;
use shellpilot_core::tool::ToolRegistry;
use std::sync::Arc;

pub use clipboard::{ClipboardBackend, ClipboardTool};
pub use dynamic::DynamicTool;
pub use editor::{EditorTool, FileEditor};
pub use memory::{AddMemoryTool, ClearMemoriesTool, GetMemoriesTool};
pub use shell::ShellTool;
pub use web::{JinaClient, JinaEndpoints, JinaTool};

/// Tool names every plan step may use regardless of its own subset.
pub const ALWAYS_AVAILABLE: [&str; 2] = ["bash", "str_replace_editor"];

pub const MEMORY_TOOLS: [&str; 3] = ["add_memory", "get_memories", "clear_memories"];

/// Build the registry: built-ins in a fixed order, then enabled dynamic tools.
///
/// Web tools are only registered when a Jina key is configured. Dynamic
/// tools that collide with a built-in name are dropped with a warning.
pub fn build_registry(
    config: &AppConfig,
    tool_configs: Vec<ToolConfig>,
    memory: Arc<dyn MemoryStore>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    let shell = Arc::new(ShellTool::from_config(config));

    registry.register_builtin(shell.clone());
    registry.register_builtin(Arc::new(EditorTool::default()));
    registry.register_builtin(Arc::new(AddMemoryTool::new(memory.clone())));
    registry.register_builtin(Arc::new(GetMemoriesTool::new(memory.clone())));
    registry.register_builtin(Arc::new(ClearMemoriesTool::new(memory)));
    registry.register_builtin(Arc::new(ClipboardTool::default()));

    if let Some(key) = config.jina_api_key.as_deref().filter(|k| !k.is_empty()) {
        let client = Arc::new(JinaClient::new(key));
        registry.register_builtin(Arc::new(JinaTool::read_page(client.clone())));
        registry.register_builtin(Arc::new(JinaTool::search(client.clone())));
        registry.register_builtin(Arc::new(JinaTool::search_grounding(client)));
    }

    let builtin_count = registry.len();
    for tool_config in tool_configs {
        registry.register_dynamic(Arc::new(DynamicTool::new(tool_config, shell.clone())));
    }
    tracing::info!(
        builtin = builtin_count,
        dynamic = registry.len() - builtin_count,
        "Tool registry built"
    );
    registry
}
