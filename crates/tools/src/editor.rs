//! File editor tool: view, create, and patch text files.
//!
//! Relative paths resolve against the process working directory.
//! Every rejected edit leaves the file untouched.

use async_trait::async_trait;
use serde::Deserialize;
use shellpilot_core::error::ToolError;
use shellpilot_core::tool::{Tool, ToolOutput};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
struct EditorInput {
    command: Option<String>,
    path: Option<String>,
    file_text: Option<String>,
    old_str: Option<String>,
    new_str: Option<String>,
    insert_line: Option<usize>,
}

/// Result of one editor operation, before it becomes a [`ToolOutput`].
type EditResult = Result<String, String>;

/// The file operations behind `str_replace_editor`.
#[derive(Debug, Default, Clone)]
pub struct FileEditor {
    root: Option<PathBuf>,
}

impl FileEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `root` instead of the working directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        match &self.root {
            Some(root) if Path::new(path).is_relative() => root.join(path),
            _ => PathBuf::from(path),
        }
    }

    pub async fn view(&self, path: &str) -> EditResult {
        let full = self.resolve(path);
        if !full.exists() {
            return Err(format!("File {path} does not exist"));
        }
        tokio::fs::read_to_string(&full)
            .await
            .map_err(|e| format!("Failed to read {path}: {e}"))
    }

    pub async fn create(&self, path: &str, text: &str) -> EditResult {
        let full = self.resolve(path);
        if let Some(parent) = full.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("Failed to create directory for {path}: {e}"))?;
        }
        tokio::fs::write(&full, text)
            .await
            .map_err(|e| format!("Failed to write {path}: {e}"))?;
        Ok(format!("File created at {path}"))
    }

    pub async fn str_replace(&self, path: &str, old: Option<&str>, new: &str) -> EditResult {
        let content = self.view(path).await?;
        let old = match old {
            Some(old) if !old.is_empty() && content.contains(old) => old,
            _ => return Err("old_str not found in file".to_string()),
        };
        let updated = content.replacen(old, new, 1);
        tokio::fs::write(self.resolve(path), updated)
            .await
            .map_err(|e| format!("Failed to write {path}: {e}"))?;
        Ok("File updated successfully".to_string())
    }

    /// Insert `text` after line `after` (0 = top of file).
    pub async fn insert(&self, path: &str, after: Option<usize>, text: &str) -> EditResult {
        let content = self.view(path).await?;
        let mut lines: Vec<&str> = content.split('\n').collect();
        let after = match after {
            Some(n) if n <= lines.len() => n,
            _ => return Err("insert_line beyond file length".to_string()),
        };
        lines.insert(after, text);
        tokio::fs::write(self.resolve(path), lines.join("\n"))
            .await
            .map_err(|e| format!("Failed to write {path}: {e}"))?;
        Ok("Content inserted successfully".to_string())
    }
}

/// `str_replace_editor`: the model-facing wrapper around [`FileEditor`].
#[derive(Default)]
pub struct EditorTool {
    editor: FileEditor,
}

impl EditorTool {
    pub fn new(editor: FileEditor) -> Self {
        Self { editor }
    }
}

#[async_trait]
impl Tool for EditorTool {
    fn name(&self) -> &str {
        "str_replace_editor"
    }

    fn description(&self) -> &str {
        "View, create, and edit text files. Commands: view, create, str_replace, insert."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "enum": ["view", "create", "str_replace", "insert"],
                    "description": "The operation to perform"
                },
                "path": {
                    "type": "string",
                    "description": "Path to the file, relative to the current directory"
                },
                "file_text": {
                    "type": "string",
                    "description": "Content for `create`"
                },
                "old_str": {
                    "type": "string",
                    "description": "Text to replace for `str_replace`"
                },
                "new_str": {
                    "type": "string",
                    "description": "Replacement text for `str_replace`, or the text to add for `insert`"
                },
                "insert_line": {
                    "type": "integer",
                    "description": "Line number after which `insert` adds text"
                }
            },
            "required": ["command", "path"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let input: EditorInput = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let (Some(command), Some(path)) = (input.command.as_deref(), input.path.as_deref()) else {
            return Ok(ToolOutput::error("Missing required fields"));
        };
        debug!(command = %command, path = %path, "Editor command");

        let new_str = input.new_str.as_deref().unwrap_or_default();
        let result = match command {
            "view" => self.editor.view(path).await,
            "create" => {
                self.editor
                    .create(path, input.file_text.as_deref().unwrap_or_default())
                    .await
            }
            "str_replace" => {
                self.editor
                    .str_replace(path, input.old_str.as_deref(), new_str)
                    .await
            }
            "insert" => self.editor.insert(path, input.insert_line, new_str).await,
            other => Err(format!("Unknown command {other}")),
        };

        Ok(match result {
            Ok(text) => ToolOutput::text(text),
            Err(text) => ToolOutput::error(text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool_in(dir: &Path) -> EditorTool {
        EditorTool::new(FileEditor::with_root(dir))
    }

    #[tokio::test]
    async fn create_then_view() {
        let dir = tempfile::tempdir().unwrap();
        let tool = tool_in(dir.path());

        let out = tool
            .execute(json!({"command": "create", "path": "nested/a.txt", "file_text": "hello"}))
            .await
            .unwrap();
        assert_eq!(out.joined(), "File created at nested/a.txt");

        let view = tool
            .execute(json!({"command": "view", "path": "nested/a.txt"}))
            .await
            .unwrap();
        assert_eq!(view.joined(), "hello");
    }

    #[tokio::test]
    async fn view_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = tool_in(dir.path())
            .execute(json!({"command": "view", "path": "nope.txt"}))
            .await
            .unwrap();
        assert!(out.is_error);
        assert_eq!(out.joined(), "File nope.txt does not exist");
    }

    #[tokio::test]
    async fn str_replace_first_occurrence_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), "a b a").unwrap();
        let out = tool_in(dir.path())
            .execute(json!({"command": "str_replace", "path": "f.txt", "old_str": "a", "new_str": "z"}))
            .await
            .unwrap();
        assert_eq!(out.joined(), "File updated successfully");
        assert_eq!(std::fs::read_to_string(dir.path().join("f.txt")).unwrap(), "z b a");
    }

    #[tokio::test]
    async fn str_replace_without_match_leaves_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, "unchanged").unwrap();
        let tool = tool_in(dir.path());

        let out = tool
            .execute(json!({"command": "str_replace", "path": "f.txt", "old_str": "missing", "new_str": "x"}))
            .await
            .unwrap();
        assert!(out.is_error);
        assert_eq!(out.joined(), "old_str not found in file");

        let absent = tool
            .execute(json!({"command": "str_replace", "path": "f.txt", "new_str": "x"}))
            .await
            .unwrap();
        assert!(absent.is_error);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "unchanged");
    }

    #[tokio::test]
    async fn insert_after_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, "one\ntwo\nthree").unwrap();
        let out = tool_in(dir.path())
            .execute(json!({"command": "insert", "path": "f.txt", "insert_line": 1, "new_str": "inserted"}))
            .await
            .unwrap();
        assert_eq!(out.joined(), "Content inserted successfully");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ninserted\ntwo\nthree");
    }

    #[tokio::test]
    async fn insert_at_line_zero_prepends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, "one\ntwo").unwrap();
        let out = tool_in(dir.path())
            .execute(json!({"command": "insert", "path": "f.txt", "insert_line": 0, "new_str": "zero"}))
            .await
            .unwrap();
        assert!(!out.is_error);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "zero\none\ntwo");
    }

    #[tokio::test]
    async fn insert_beyond_length_leaves_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, "one\ntwo").unwrap();
        let tool = tool_in(dir.path());

        for input in [
            json!({"command": "insert", "path": "f.txt", "insert_line": 3, "new_str": "x"}),
            json!({"command": "insert", "path": "f.txt", "new_str": "x"}),
        ] {
            let out = tool.execute(input).await.unwrap();
            assert!(out.is_error);
            assert_eq!(out.joined(), "insert_line beyond file length");
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo");
    }

    #[tokio::test]
    async fn missing_fields_and_unknown_command() {
        let dir = tempfile::tempdir().unwrap();
        let tool = tool_in(dir.path());

        let missing = tool.execute(json!({"command": "view"})).await.unwrap();
        assert_eq!(missing.joined(), "Missing required fields");

        let unknown = tool
            .execute(json!({"command": "delete", "path": "f.txt"}))
            .await
            .unwrap();
        assert!(unknown.is_error);
        assert_eq!(unknown.joined(), "Unknown command delete");
    }
}
