//! Session export as markdown, and the parser that reads it back.
//!
//! ```text
//! # Session Log: 20250301-142233-a1b2c3
//!
//! - **Prompt ID**: 7
//! - **Timestamp**: 2025-03-01T14:22:33+00:00
//! - **Mode**: planner
//! - **Total Tokens**: 5120
//! - **Total Cost**: $0.021000
//!
//! ## Original Prompt
//! ## Execution Steps
//! ### Step 1: <first line of the action>
//! ```
//!
//! Every free-text field sits in a fenced block whose fence is longer than
//! any backtick run inside it, so the text comes back byte-for-byte.

use shellpilot_core::error::StoreError;
use shellpilot_core::history::{LogStore, PromptEntry, SessionLogEntry};

/// A session as read back from markdown.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedSession {
    pub session_id: String,
    pub prompt_id: Option<i64>,
    pub timestamp: String,
    pub mode: String,
    pub tokens_used: u64,
    pub cost: f64,
    pub prompt: String,
    pub steps: Vec<ExportedStep>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportedStep {
    pub step_number: u32,
    pub description: String,
    pub time: String,
    pub tools_used: Vec<String>,
    pub result: String,
    pub error: Option<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("Malformed session export at line {line}: {reason}")]
pub struct ExportParseError {
    pub line: usize,
    pub reason: String,
}

/// Load a session from the store and render it.
pub async fn export_session_markdown(
    store: &dyn LogStore,
    session_id: &str,
) -> Result<String, StoreError> {
    let prompt = store
        .get_prompt_by_session(session_id)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("Session {session_id} not found")))?;
    let logs = store.session_logs(session_id).await?;
    Ok(render_session_markdown(&prompt, &logs))
}

fn fence_for(text: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in text.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

fn push_block(out: &mut String, label: Option<&str>, text: &str) {
    if let Some(label) = label {
        out.push_str(&format!("**{label}**:\n"));
    }
    let fence = fence_for(text);
    out.push_str(&format!("{fence}\n{text}\n{fence}\n\n"));
}

/// Render a prompt entry and its step logs.
pub fn render_session_markdown(prompt: &PromptEntry, logs: &[SessionLogEntry]) -> String {
    let session_id = prompt.session_id.as_deref().unwrap_or("");
    let mut md = format!("# Session Log: {session_id}\n\n");
    md.push_str(&format!("- **Prompt ID**: {}\n", prompt.id));
    md.push_str(&format!("- **Timestamp**: {}\n", prompt.timestamp.to_rfc3339()));
    md.push_str(&format!("- **Mode**: {}\n", prompt.mode));
    md.push_str(&format!("- **Total Tokens**: {}\n", prompt.tokens_used));
    md.push_str(&format!("- **Total Cost**: ${:.6}\n\n", prompt.cost));

    md.push_str("## Original Prompt\n\n");
    push_block(&mut md, None, &prompt.prompt);

    md.push_str("## Execution Steps\n\n");
    for log in logs {
        let headline = log.step_description.lines().next().unwrap_or("");
        md.push_str(&format!("### Step {}: {headline}\n\n", log.step_number));
        md.push_str(&format!("- **Time**: {}\n", log.timestamp.to_rfc3339()));
        md.push_str(&format!("- **Tools Used**: {}\n\n", log.tools_used.join(", ")));

        push_block(&mut md, Some("Action"), &log.step_description);
        if !log.result.is_empty() {
            push_block(&mut md, Some("Result"), &log.result);
        }
        if let Some(err) = &log.error {
            push_block(&mut md, Some("Error"), err);
        }
    }
    md
}

struct Cursor<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<&'a str> {
        let line = self.peek()?;
        self.pos += 1;
        Some(line)
    }

    fn skip_blank(&mut self) {
        while matches!(self.peek(), Some(l) if l.trim().is_empty()) {
            self.pos += 1;
        }
    }

    fn err(&self, reason: impl Into<String>) -> ExportParseError {
        ExportParseError {
            line: self.pos + 1,
            reason: reason.into(),
        }
    }

    /// Read a fenced block starting at the current line.
    fn block(&mut self) -> Result<String, ExportParseError> {
        let fence = self.next().ok_or_else(|| self.err("expected code fence"))?;
        if fence.len() < 3 || !fence.chars().all(|c| c == '`') {
            return Err(self.err(format!("expected code fence, found {fence:?}")));
        }
        let mut body = Vec::new();
        loop {
            let line = self.next().ok_or_else(|| self.err("unterminated code fence"))?;
            if line == fence {
                break;
            }
            body.push(line);
        }
        Ok(body.join("\n"))
    }

    fn field(&mut self, name: &str) -> Result<String, ExportParseError> {
        self.skip_blank();
        let prefix = format!("- **{name}**:");
        let line = self.next().ok_or_else(|| self.err(format!("expected {name}")))?;
        line.strip_prefix(prefix.as_str())
            .map(|v| v.trim().to_string())
            .ok_or_else(|| self.err(format!("expected {name}, found {line:?}")))
    }

    fn labelled_block(&mut self, label: &str) -> Result<Option<String>, ExportParseError> {
        self.skip_blank();
        if self.peek() == Some(format!("**{label}**:").as_str()) {
            self.pos += 1;
            return self.block().map(Some);
        }
        Ok(None)
    }
}

/// Parse a document produced by [`render_session_markdown`].
pub fn parse_session_markdown(text: &str) -> Result<ExportedSession, ExportParseError> {
    let mut cur = Cursor {
        lines: text.split('\n').collect(),
        pos: 0,
    };

    cur.skip_blank();
    let title = cur.next().unwrap_or("");
    let session_id = title
        .strip_prefix("# Session Log:")
        .map(|s| s.trim().to_string())
        .ok_or_else(|| cur.err("missing `# Session Log:` title"))?;

    let prompt_id = cur.field("Prompt ID")?.parse().ok();
    let timestamp = cur.field("Timestamp")?;
    let mode = cur.field("Mode")?;
    let tokens_used = cur
        .field("Total Tokens")?
        .parse()
        .map_err(|_| cur.err("Total Tokens is not a number"))?;
    let cost = cur
        .field("Total Cost")?
        .trim_start_matches('$')
        .parse()
        .map_err(|_| cur.err("Total Cost is not a number"))?;

    cur.skip_blank();
    if cur.next() != Some("## Original Prompt") {
        return Err(cur.err("expected `## Original Prompt`"));
    }
    cur.skip_blank();
    let prompt = cur.block()?;

    cur.skip_blank();
    if cur.next() != Some("## Execution Steps") {
        return Err(cur.err("expected `## Execution Steps`"));
    }

    let mut steps = Vec::new();
    loop {
        cur.skip_blank();
        let Some(heading) = cur.next() else { break };
        let rest = heading
            .strip_prefix("### Step ")
            .ok_or_else(|| cur.err(format!("expected step heading, found {heading:?}")))?;
        let number = rest.split(':').next().unwrap_or("");
        let step_number = number
            .trim()
            .parse()
            .map_err(|_| cur.err("step number is not a number"))?;

        let time = cur.field("Time")?;
        let tools_used = cur
            .field("Tools Used")?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        let description = cur
            .labelled_block("Action")?
            .ok_or_else(|| cur.err("missing **Action** block"))?;
        let result = cur.labelled_block("Result")?.unwrap_or_default();
        let error = cur.labelled_block("Error")?;

        steps.push(ExportedStep {
            step_number,
            description,
            time,
            tools_used,
            result,
            error,
        });
    }

    Ok(ExportedSession {
        session_id,
        prompt_id,
        timestamp,
        mode,
        tokens_used,
        cost,
        prompt,
        steps,
    })
}
