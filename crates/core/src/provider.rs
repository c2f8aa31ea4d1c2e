//! Provider trait — the abstraction over the remote model service.
//!
//! A request carries the rendered preamble and message history with
//! cache-anchor annotations; the response surfaces content blocks, the
//! stop reason, and token usage including cache counters. The engine
//! awaits each call to completion — there is no streaming path.

use crate::error::ProviderError;
use crate::message::{ContentBlock, Role};
use crate::tool::ToolCall;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A preamble segment, optionally marked as a cache anchor.
///
/// Anchored segments tell the remote service the content is eligible for
/// reuse across calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreambleBlock {
    pub text: String,
    pub cache_anchor: bool,
}

impl PreambleBlock {
    pub fn anchored(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cache_anchor: true,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cache_anchor: false,
        }
    }
}

/// A rendered content block with its anchor annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestBlock {
    pub block: ContentBlock,
    pub cache_anchor: bool,
}

/// A rendered message ready for the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestMessage {
    pub role: Role,
    pub content: Vec<RequestBlock>,
}

/// A tool definition sent to the model so it knows what it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's input
    pub input_schema: serde_json::Value,
}

/// How the model may select tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// The model decides on its own whether to call a tool.
    #[default]
    Auto,
    /// Tools are disabled for this call.
    None,
}

/// A fully rendered request for one remote call.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// Model identifier (e.g. "claude-sonnet-4-20250514")
    pub model: String,

    /// Maximum output tokens
    pub max_tokens: u32,

    /// Preamble content blocks, each optionally a cache anchor
    pub system: Vec<PreambleBlock>,

    /// Rendered message history
    pub messages: Vec<RequestMessage>,

    /// Available tools
    pub tools: Vec<ToolDefinition>,

    /// Tool selection policy
    pub tool_choice: ToolChoice,
}

/// Why the model stopped producing output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Normal completion.
    EndTurn,
    /// The model is requesting one or more tool calls.
    ToolUse,
    /// Output hit the token limit — the content is a truncated partial.
    MaxTokens,
    /// Anything else the service reports.
    Other(String),
}

/// Token usage counters for one call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_read_tokens: u64,
    #[serde(default)]
    pub cache_creation_tokens: u64,
}

/// A complete response from the remote service.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// Ordered content blocks (text and/or tool_use)
    pub content: Vec<ContentBlock>,

    /// Why generation stopped
    pub stop_reason: StopReason,

    /// Token usage for this call
    pub usage: Usage,

    /// Which model actually responded
    pub model: String,
}

impl ProviderResponse {
    /// Concatenated text of all text blocks, newline-joined.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// All tool-use blocks as executable calls, in order.
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => Some(ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    arguments: input.clone(),
                }),
                _ => None,
            })
            .collect()
    }
}

/// The core Provider trait.
///
/// The orchestration engine calls `complete()` without knowing which
/// backend is configured.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g. "anthropic").
    fn name(&self) -> &str;

    /// Send a request and await the complete response.
    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError>;
}
