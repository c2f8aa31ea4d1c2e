//! The codevet orchestration engine.
//!
//! One user turn becomes zero-or-more remote model calls, tool-call
//! round-trips, and a quality-gated final answer:
//!
//! 1. **Snapshot** the durable conversation into a working copy
//! 2. **Draft** via the configured provider (preamble rendered from the
//!    context cache)
//! 3. **If tool calls**: execute through the [`ToolBridge`], fold results
//!    into the cache and both histories, draft again
//! 4. **If text**: gate through the pre-filter and, when warranted, the
//!    full reviewer; rejected drafts retry on the working copy only
//! 5. **Commit** only the accepted answer to the durable store
//!
//! Truncation is terminal (partial answer, zero retries), and the retry
//! loop is bounded at [`MAX_ATTEMPTS`] drafts.

pub mod bridge;
pub mod orchestrator;

pub use bridge::ToolBridge;
pub use orchestrator::{MAX_ATTEMPTS, Orchestrator, Session, TurnOutcome};
