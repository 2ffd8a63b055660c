//! System prompts and the `<SystemInfo>` block.

use shellpilot_core::tool::ToolDeclaration;
use std::path::PathBuf;

/// Facts about the host that every prompt carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    pub shell: String,
    pub is_wsl: bool,
    pub cwd: PathBuf,
}

impl SystemInfo {
    pub fn detect() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            shell: std::env::var("SHELL").unwrap_or_else(|_| "Unknown".to_string()),
            is_wsl: std::env::var_os("WSL_DISTRO_NAME").is_some(),
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// The bullet list without surrounding tags.
    pub fn describe(&self) -> String {
        format!(
            "System Context:\n- Operating System: {}\n- Architecture: {}\n- Shell: {}\n- WSL: {}\n- Current Directory: {}",
            self.os,
            self.arch,
            self.shell,
            if self.is_wsl { "Yes" } else { "No" },
            self.cwd.display()
        )
    }

    pub fn tagged(&self) -> String {
        format!("<SystemInfo>\n{}\n</SystemInfo>", self.describe())
    }
}

pub fn editor_prompt(info: &SystemInfo) -> String {
    format!(
        "You are a helpful assistant that helps users edit and work with text files.
You have access to the full file system, and you are currently in the {cwd} directory.
Some rules to follow:
- All paths you provide and use should be relative to the current directory.
- If the user asks you to work with the current directory or a file in it, use '.' or './' as prefix.
- If the user asks you to work with a subdirectory, it should be relative to the current directory.
- If the user asks you to refer to memory, use the get_memories tool.",
        cwd = info.cwd.display()
    )
}

pub fn bash_prompt(info: &SystemInfo) -> String {
    format!(
        "You are a helpful assistant that can execute shell commands.
You operate in the environment described in the <SystemInfo> tag.
Please ensure all commands are compatible with this environment.

{}",
        info.tagged()
    )
}

pub const PLANNER_SYSTEM_PROMPT: &str = r#"Think step by step and prepare a plan for an agent running on a CLI.
You will pass the generated plan to the agent and it will execute it according to the steps you give it.

Make sure your steps fulfill the user request. The user's request and the current system information are provided in their respective tags.

The agent has access to bash and file editing in every step. Other tools it may use are listed by name in the <Tools> tag; list the ones a step needs in that step's "tools" array.

Evaluate the user's request. If it is a simple request like a greeting, a request for information, or advice that needs no tools, respond with [{"step":1,"action":"Reply to the user"}].
For anything more complex, reflect on the system information to create a step-by-step plan the agent can follow.
Each step must be executable on its own while still building on the previous steps, and must respect the system information and the user request.

Respond with a JSON array of this shape:
[{"step":1,"action":"Action to be taken to achieve the goal","tools":["tool_name"]}]
ONLY respond with JSON, without code fences or any other text."#;

/// Names documented by the fixed part of the combined prompt.
const DOCUMENTED_TOOLS: [&str; 6] = [
    "bash",
    "str_replace_editor",
    "add_memory",
    "get_memories",
    "clear_memories",
    "read_clipboard",
];

/// `- NAME:` section for one extra tool, listing its arguments from the schema.
fn render_tool(decl: &ToolDeclaration) -> String {
    let required: Vec<&str> = decl.input_schema["required"]
        .as_array()
        .map(|r| r.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    let mut args = String::new();
    if let Some(props) = decl.input_schema["properties"].as_object() {
        for (name, prop) in props {
            args.push_str(&format!(
                "\n        - {name}: {}{} - {}",
                prop["type"].as_str().unwrap_or("any"),
                if required.contains(&name.as_str()) { " (required)" } else { "" },
                prop["description"].as_str().unwrap_or_default()
            ));
        }
    }

    format!(
        "- {}:\n    - Name: \"{}\"\n    - Description: {}\n    - Arguments:{args}",
        decl.name.to_uppercase(),
        decl.name,
        decl.description
    )
}

/// The hybrid/planner-step prompt: every tool documented, plus user context.
pub fn combined_prompt(
    info: &SystemInfo,
    tools: &[ToolDeclaration],
    user_name: &str,
    extra_instructions: Option<&str>,
) -> String {
    let additional = tools
        .iter()
        .filter(|t| !DOCUMENTED_TOOLS.contains(&t.name.as_str()))
        .map(render_tool)
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"You are a versatile assistant with full system access.
You are currently operating in the {cwd} directory.

{system}

You have access to the following tools:

- BASH_TOOL:
    - Name: "bash"
    - Description: Execute shell commands
    - Arguments:
        - command: string (required) - The shell command to execute
        - restart: boolean - Restart the shell session if true

- EDITOR_TOOL:
    - Name: "str_replace_editor"
    - Description: File manipulation operations
    - Commands:
        - view: path
        - create: path, file_text
        - str_replace: path, old_str, new_str
        - insert: path, insert_line, new_str

- MEMORY_TOOLS:
    - Name: "add_memory" - Arguments: {{content: string}}
    - Name: "get_memories" - Arguments: none
    - Name: "clear_memories" - Arguments: none

- CLIPBOARD_TOOLS:
    - Name: "read_clipboard" - Arguments: none

{additional}

User Context:
- Name: {user_name}
{extra}

Follow these rules:

1. File and directory discovery: use BASH_TOOL with `rg --type-not=lock --hidden -l 'pattern'` for content and `tree` for directories.
2. File editing: use EDITOR_TOOL for all file modifications, with exact paths (discover them with BASH_TOOL first if needed).
3. Data management: use MEMORY_TOOLS when something you find will be needed later.
4. Use CLIPBOARD_TOOLS only when the user asks you to read from the clipboard.
5. Use the web tools, when present, for web content and online searches.

When chaining operations, use separate BASH_TOOL commands and store intermediate results with MEMORY_TOOLS if needed."#,
        cwd = info.cwd.display(),
        system = info.tagged(),
        extra = extra_instructions.unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn info() -> SystemInfo {
        SystemInfo {
            os: "linux".into(),
            arch: "x86_64".into(),
            shell: "/bin/zsh".into(),
            is_wsl: false,
            cwd: PathBuf::from("/work"),
        }
    }

    #[test]
    fn system_info_block() {
        assert_eq!(
            info().tagged(),
            "<SystemInfo>\nSystem Context:\n- Operating System: linux\n- Architecture: x86_64\n- Shell: /bin/zsh\n- WSL: No\n- Current Directory: /work\n</SystemInfo>"
        );
    }

    #[test]
    fn combined_prompt_documents_extra_tools_only() {
        let tools = vec![
            ToolDeclaration {
                name: "bash".into(),
                description: "shell".into(),
                input_schema: json!({}),
            },
            ToolDeclaration {
                name: "disk_usage".into(),
                description: "Show disk usage".into(),
                input_schema: json!({
                    "type": "object",
                    "properties": {"path": {"type": "string", "description": "Directory"}},
                    "required": ["path"]
                }),
            },
        ];
        let prompt = combined_prompt(&info(), &tools, "Ada", None);
        assert!(prompt.contains("- DISK_USAGE:\n    - Name: \"disk_usage\""));
        assert!(prompt.contains("- path: string (required) - Directory"));
        assert!(!prompt.contains("- BASH:"));
        assert!(prompt.contains("User Context:\n- Name: Ada"));
        assert!(prompt.contains("<SystemInfo>"));
    }

    #[test]
    fn bash_prompt_carries_system_info() {
        let prompt = bash_prompt(&info());
        assert!(prompt.ends_with("</SystemInfo>"));
        assert!(editor_prompt(&info()).contains("/work"));
    }
}
