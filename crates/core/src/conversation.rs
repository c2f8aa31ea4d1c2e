//! The durable conversation store and request rendering.
//!
//! The store only ever receives messages from approved turns or tool
//! round-trips. The orchestrator takes a [`snapshot`] at the start of a
//! turn and runs its review/retry loop against that working copy; the
//! durable history is never touched by rejected drafts.
//!
//! [`snapshot`]: Conversation::snapshot

use crate::context::ContextCache;
use crate::message::{Message, Role};
use crate::provider::{PreambleBlock, RequestBlock, RequestMessage};

/// How many of the most recent user messages get a cache anchor.
///
/// Anchoring only the latest turns bounds the reusable window to content
/// likely to recur in the next call; older turns are resent in full.
const ANCHORED_USER_MESSAGES: usize = 2;

/// The ordered, durable turn history plus the static instruction text.
#[derive(Debug, Clone)]
pub struct Conversation {
    instructions: String,
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            messages: Vec::new(),
        }
    }

    /// The static instruction text rendered at the head of every request.
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// Add a message to the tail.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
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

    /// Take the per-turn working copy. Mutations during review retries
    /// operate on the snapshot; the durable store stays untouched.
    pub fn snapshot(&self) -> Conversation {
        self.clone()
    }

    /// Text of the most recent user message, if any.
    pub fn last_user_text(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(Message::text_content)
    }

    /// Append a review-feedback text block to the most recent user
    /// message. Intended for the working copy only.
    pub fn append_feedback(&mut self, feedback: &str) {
        if let Some(msg) = self.messages.iter_mut().rev().find(|m| m.role == Role::User) {
            msg.push_text(format!(
                "\n[FEEDBACK]: The previous response was not satisfactory. \
                 Please revise your answer, considering this feedback: {feedback}"
            ));
        } else {
            tracing::warn!("no user message to attach review feedback to");
        }
    }

    /// Render the history for the wire: a deep copy where exactly the
    /// `min(2, user message count)` most recent user messages carry the
    /// cache anchor on their first block.
    pub fn render_for_request(&self) -> Vec<RequestMessage> {
        let mut rendered: Vec<RequestMessage> = self
            .messages
            .iter()
            .map(|msg| RequestMessage {
                role: msg.role,
                content: msg
                    .content
                    .iter()
                    .map(|block| RequestBlock {
                        block: block.clone(),
                        cache_anchor: false,
                    })
                    .collect(),
            })
            .collect();

        let user_indices: Vec<usize> = rendered
            .iter()
            .enumerate()
            .filter(|(_, m)| m.role == Role::User)
            .map(|(i, _)| i)
            .collect();

        for &i in user_indices.iter().rev().take(ANCHORED_USER_MESSAGES) {
            if let Some(first) = rendered[i].content.first_mut() {
                first.cache_anchor = true;
            }
        }

        rendered
    }

    /// Render the preamble: the static instructions plus a textual
    /// rendering of the context cache's partition.
    ///
    /// The instructions and the unchanged-files section are anchored; the
    /// new-or-modified section is not, since it differs on every call.
    /// With an empty cache the preamble is the instructions alone, still
    /// anchored — it is the most stable, most reusable content.
    pub fn render_preamble(&self, cache: &ContextCache) -> Vec<PreambleBlock> {
        let mut blocks = vec![PreambleBlock::anchored(&self.instructions)];

        let (unchanged, fresh) = cache.partition_for_request();

        if !unchanged.is_empty() {
            blocks.push(PreambleBlock::anchored(render_file_section(
                "Existing files:",
                &unchanged,
            )));
        }
        if !fresh.is_empty() {
            blocks.push(PreambleBlock::plain(render_file_section(
                "New or modified files:",
                &fresh,
            )));
        }

        blocks
    }
}

fn render_file_section(heading: &str, files: &[&crate::context::FileArtifact]) -> String {
    let mut out = String::from(heading);
    for artifact in files {
        out.push_str(&format!(
            "\nFile: {}\nContent: {}",
            artifact.path, artifact.content
        ));
    }
    out
}
