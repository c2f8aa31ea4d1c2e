//! Message and content-block domain types.
//!
//! A message's content is always an ordered sequence of blocks, never a
//! bare string — scalar text is normalized into a one-element sequence by
//! the constructors. This mirrors the remote service's wire shape and
//! keeps cache-anchor annotation uniform at request-rendering time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user (also carries folded tool results back to the model)
    User,
    /// The AI assistant
    Assistant,
}

/// One segment of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text { text: String },
    /// A model-issued request to run a tool.
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    /// The outcome of a tool run, referencing the originating call.
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl ContentBlock {
    /// Build a text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// The text payload, if this is a text block.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn is_tool_use(&self) -> bool {
        matches!(self, Self::ToolUse { .. })
    }
}

/// A single message in a conversation.
///
/// Immutable once committed to the durable [`Conversation`]; the per-turn
/// working copy may push additional blocks during review retries.
///
/// [`Conversation`]: crate::conversation::Conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// Ordered content blocks (never empty once committed)
    pub content: Vec<ContentBlock>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message from pre-built blocks.
    pub fn from_blocks(role: Role, content: Vec<ContentBlock>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message from scalar text.
    pub fn user(text: impl Into<String>) -> Self {
        Self::from_blocks(Role::User, vec![ContentBlock::text(text)])
    }

    /// Create a new assistant message from scalar text.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::from_blocks(Role::Assistant, vec![ContentBlock::text(text)])
    }

    /// Concatenated text of all text blocks, newline-joined.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Whether any block is a tool-use request.
    pub fn has_tool_use(&self) -> bool {
        self.content.iter().any(ContentBlock::is_tool_use)
    }

    /// Append an extra text block (used for review feedback on the
    /// working copy).
    pub fn push_text(&mut self, text: impl Into<String>) {
        self.content.push(ContentBlock::text(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_normalizes_scalar_text() {
        let msg = Message::user("Hello, assistant!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content.len(), 1);
        assert_eq!(msg.content[0].as_text(), Some("Hello, assistant!"));
    }

    #[test]
    fn text_content_joins_text_blocks_only() {
        let msg = Message::from_blocks(
            Role::Assistant,
            vec![
                ContentBlock::text("first"),
                ContentBlock::ToolUse {
                    id: "toolu_1".into(),
                    name: "read_file".into(),
                    input: serde_json::json!({"file_path": "a.txt"}),
                },
                ContentBlock::text("second"),
            ],
        );
        assert_eq!(msg.text_content(), "first\nsecond");
        assert!(msg.has_tool_use());
    }

    #[test]
    fn push_text_appends_block() {
        let mut msg = Message::user("question");
        msg.push_text("[FEEDBACK]: be more specific");
        assert_eq!(msg.content.len(), 2);
    }

    #[test]
    fn content_block_serialization_matches_wire_shape() {
        let block = ContentBlock::ToolResult {
            tool_use_id: "toolu_9".into(),
            content: "{\"ok\":true}".into(),
            is_error: false,
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "tool_result");
        assert_eq!(json["tool_use_id"], "toolu_9");

        let roundtrip: ContentBlock = serde_json::from_value(json).unwrap();
        assert_eq!(roundtrip, block);
    }

    #[test]
    fn tool_result_is_error_defaults_false() {
        let block: ContentBlock = serde_json::from_str(
            r#"{"type": "tool_result", "tool_use_id": "toolu_1", "content": "done"}"#,
        )
        .unwrap();
        match block {
            ContentBlock::ToolResult { is_error, .. } => assert!(!is_error),
            _ => panic!("Expected tool_result block"),
        }
    }
}
