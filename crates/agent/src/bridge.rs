//! The tool bridge — executes model-issued tool calls and folds their
//! results into the conversation and the context cache.

use codevet_core::provider::ToolDefinition;
use codevet_core::tool::ToolOutput;
use codevet_core::{ContentBlock, ContextCache, Message, Role, ToolCall, ToolRegistry};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Dispatches tool calls through the static registry and turns each
/// output into a `tool_result` block addressed to the originating call.
pub struct ToolBridge {
    registry: Arc<ToolRegistry>,
    workdir: PathBuf,
}

impl ToolBridge {
    pub fn new(registry: Arc<ToolRegistry>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            workdir: workdir.into(),
        }
    }

    /// Tool definitions for the model-call request.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    /// Execute every call in order and return the user-role message
    /// carrying one `tool_result` block per call. File-bearing results
    /// are upserted into the context cache along the way.
    pub async fn run_calls(&self, calls: &[ToolCall], cache: &mut ContextCache) -> Message {
        let mut blocks = Vec::with_capacity(calls.len());
        for call in calls {
            let output = self.registry.dispatch(call).await;
            blocks.push(self.fold(call, output, cache).await);
        }
        Message::from_blocks(Role::User, blocks)
    }

    async fn fold(
        &self,
        call: &ToolCall,
        output: ToolOutput,
        cache: &mut ContextCache,
    ) -> ContentBlock {
        if output.is_error {
            let error = output
                .error_message()
                .unwrap_or("Unknown error occurred")
                .to_string();
            warn!(tool = %call.name, %error, "tool returned an error");
            return ContentBlock::ToolResult {
                tool_use_id: call.id.clone(),
                content: json!({ "error": error }).to_string(),
                is_error: true,
            };
        }

        let Some(raw_path) = resolve_file_key(&output.payload).map(str::to_string) else {
            // No file in the payload — fold it through verbatim.
            return ContentBlock::ToolResult {
                tool_use_id: call.id.clone(),
                content: serde_json::Value::Object(output.payload).to_string(),
                is_error: false,
            };
        };

        let relative = self.relativize(&raw_path);
        let content = match output.get_str("file_content") {
            Some(content) => Some(content.to_string()),
            // The result carried no content; if the resolved file exists
            // on disk, read it.
            None => tokio::fs::read_to_string(self.absolutize(&raw_path))
                .await
                .ok(),
        };

        let body = match content {
            Some(content) => {
                cache.upsert(&relative, content, &call.name);
                info!(path = %relative, tool = %call.name, "context cache updated");
                json!({
                    "file_path": relative,
                    "message": format!(
                        "File content has been cached. Use this reference to \
                         access the content produced by tool: {}",
                        call.name
                    ),
                })
            }
            None => json!({
                "file_path": relative,
                "message": format!(
                    "File was created or referenced by {} but its content is \
                     not available in the context. Use the read_file tool to \
                     access it.",
                    call.name
                ),
            }),
        };

        ContentBlock::ToolResult {
            tool_use_id: call.id.clone(),
            content: body.to_string(),
            is_error: false,
        }
    }

    fn absolutize(&self, raw: &str) -> PathBuf {
        let path = Path::new(raw);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workdir.join(path)
        }
    }

    /// Normalize to an absolute path, then back to one relative to the
    /// working directory. Paths outside the working directory keep their
    /// absolute form.
    fn relativize(&self, raw: &str) -> String {
        let abs = self.absolutize(raw);
        abs.strip_prefix(&self.workdir)
            .map(|rel| rel.to_string_lossy().into_owned())
            .unwrap_or_else(|_| abs.to_string_lossy().into_owned())
    }
}

/// Locate a file path in a tool's payload: a literal `file_path` key
/// takes precedence, otherwise the first key containing "file"
/// (case-insensitive) with a string value is used.
fn resolve_file_key(payload: &serde_json::Map<String, serde_json::Value>) -> Option<&str> {
    if let Some(path) = payload.get("file_path").and_then(serde_json::Value::as_str) {
        return Some(path);
    }
    payload.iter().find_map(|(key, value)| {
        if key.to_lowercase().contains("file") {
            value.as_str()
        } else {
            None
        }
    })
}
