//! # Codevet Core
//!
//! Domain types, traits, and error definitions for the codevet assistant.
//! This crate has **zero framework dependencies** — it defines the domain
//! model that all other crates implement against.
//!
//! The model follows the remote service's content-block shape throughout:
//! a [`Message`] is an ordered sequence of [`ContentBlock`]s, a
//! [`Conversation`] is the durable history of committed messages, and the
//! [`ContextCache`] tracks which project files have already been shipped
//! to the remote model.

pub mod context;
pub mod conversation;
pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use context::{ContextCache, FileArtifact};
pub use conversation::Conversation;
pub use error::{ContextError, Error, ProviderError, Result, ToolError};
pub use message::{ContentBlock, Message, Role};
pub use provider::{
    PreambleBlock, Provider, ProviderRequest, ProviderResponse, RequestBlock, RequestMessage,
    StopReason, ToolChoice, ToolDefinition, Usage,
};
pub use tool::{Tool, ToolCall, ToolOutput, ToolRegistry};
