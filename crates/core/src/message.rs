//! Message and Transcript domain types.
//!
//! These are the value objects that flow through every conversation loop:
//! user prompt → model response (text / tool_use blocks) → tool results → …
//!
//! The block layout matches the Anthropic Messages API so a transcript can be
//! serialized onto the wire without conversion.

use serde::{Deserialize, Serialize};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user (and tool results, which the protocol sends as user turns)
    User,
    /// The model
    Assistant,
}

/// A text segment inside a `tool_result` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResultSegment {
    Text { text: String },
}

impl ResultSegment {
    pub fn text(&self) -> &str {
        match self {
            ResultSegment::Text { text } => text,
        }
    }
}

/// One block of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: Vec<ResultSegment>,
        #[serde(default)]
        is_error: bool,
    },
    /// Extended reasoning; must be replayed unchanged on the next request.
    Thinking {
        thinking: String,
        #[serde(default)]
        signature: String,
    },
    /// Encrypted reasoning; replayed like `Thinking`.
    RedactedThinking {
        data: String,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    /// The tool-use request carried by this block, if any.
    pub fn as_tool_use(&self) -> Option<ToolUse> {
        match self {
            ContentBlock::ToolUse { id, name, input } => Some(ToolUse {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            }),
            _ => None,
        }
    }
}

/// A structured request from the model to run one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUse {
    /// Call id, echoed back as `tool_use_id` in the result
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub input: serde_json::Value,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// Create a user message holding one text block.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// Create an assistant message from response blocks.
    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    /// Concatenated text blocks, newline separated.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// All tool-use requests in this message, in order.
    pub fn tool_uses(&self) -> Vec<ToolUse> {
        self.content.iter().filter_map(ContentBlock::as_tool_use).collect()
    }
}

/// An append-only, ordered conversation transcript.
///
/// Order defines causality for the model. Every `tool_use` must be answered
/// by a `tool_result` with the same id before the next model call;
/// [`Transcript::unanswered_tool_uses`] reports violations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Append user text. Merges into a trailing user message so roles keep
    /// alternating (e.g. a new step after a step that ended on tool results).
    pub fn push_user_text(&mut self, text: impl Into<String>) {
        self.push_user_blocks(vec![ContentBlock::text(text)]);
    }

    /// Append the results answering the previous assistant turn.
    pub fn push_tool_results(&mut self, results: impl IntoIterator<Item = ContentBlock>) {
        let blocks: Vec<ContentBlock> = results.into_iter().collect();
        if !blocks.is_empty() {
            self.push_user_blocks(blocks);
        }
    }

    /// Append an assistant turn.
    pub fn push_assistant(&mut self, content: Vec<ContentBlock>) {
        self.messages.push(Message::assistant(content));
    }

    fn push_user_blocks(&mut self, mut blocks: Vec<ContentBlock>) {
        match self.messages.last_mut() {
            Some(last) if last.role == Role::User => last.content.append(&mut blocks),
            _ => self.messages.push(Message {
                role: Role::User,
                content: blocks,
            }),
        }
    }

    /// Ids of `tool_use` blocks in the last assistant turn with no matching
    /// `tool_result` after it.
    pub fn unanswered_tool_uses(&self) -> Vec<String> {
        let Some(pos) = self.messages.iter().rposition(|m| m.role == Role::Assistant) else {
            return Vec::new();
        };
        let answered: Vec<&str> = self.messages[pos + 1..]
            .iter()
            .flat_map(|m| m.content.iter())
            .filter_map(|b| match b {
                ContentBlock::ToolResult { tool_use_id, .. } => Some(tool_use_id.as_str()),
                _ => None,
            })
            .collect();
        self.messages[pos]
            .tool_uses()
            .into_iter()
            .map(|u| u.id)
            .filter(|id| !answered.contains(&id.as_str()))
            .collect()
    }
}
