//! Anthropic native provider implementation.
//!
//! Uses Anthropic's Messages API directly:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header plus the prompt-caching beta header
//! - Preamble as top-level `system` content blocks
//! - `cache_control: {"type": "ephemeral"}` on anchored request segments
//! - Native tool use with `tool_use` / `tool_result` content blocks
//! - Stop reason and cache token counters surfaced to the caller

use async_trait::async_trait;
use codevet_core::error::ProviderError;
use codevet_core::message::ContentBlock;
use codevet_core::provider::{
    PreambleBlock, Provider, ProviderRequest, ProviderResponse, RequestMessage, StopReason,
    ToolChoice, Usage,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_BETA: &str = "prompt-caching-2024-07-31";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider.
    pub fn new(api_key: impl Into<String>) -> Self {
        // Transport hygiene only; the engine itself runs calls without a
        // turn-level timeout.
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Render the preamble as system content blocks, attaching
    /// `cache_control` to anchored segments.
    fn render_system(system: &[PreambleBlock]) -> serde_json::Value {
        let blocks: Vec<serde_json::Value> = system
            .iter()
            .map(|b| {
                let mut block = json!({"type": "text", "text": b.text});
                if b.cache_anchor {
                    block["cache_control"] = json!({"type": "ephemeral"});
                }
                block
            })
            .collect();
        serde_json::Value::Array(blocks)
    }

    /// Render the message history, attaching `cache_control` to anchored
    /// blocks.
    fn render_messages(messages: &[RequestMessage]) -> serde_json::Value {
        let rendered: Vec<serde_json::Value> = messages
            .iter()
            .map(|msg| {
                let content: Vec<serde_json::Value> = msg
                    .content
                    .iter()
                    .map(|rb| {
                        let mut block =
                            serde_json::to_value(&rb.block).unwrap_or(serde_json::Value::Null);
                        if rb.cache_anchor {
                            block["cache_control"] = json!({"type": "ephemeral"});
                        }
                        block
                    })
                    .collect();
                json!({
                    "role": match msg.role {
                        codevet_core::Role::User => "user",
                        codevet_core::Role::Assistant => "assistant",
                    },
                    "content": content,
                })
            })
            .collect();
        serde_json::Value::Array(rendered)
    }

    fn render_tool_choice(choice: ToolChoice) -> serde_json::Value {
        match choice {
            ToolChoice::Auto => json!({"type": "auto"}),
            ToolChoice::None => json!({"type": "none"}),
        }
    }

    fn parse_stop_reason(raw: Option<&str>) -> StopReason {
        match raw {
            None | Some("end_turn") | Some("stop_sequence") => StopReason::EndTurn,
            Some("tool_use") => StopReason::ToolUse,
            Some("max_tokens") => StopReason::MaxTokens,
            Some(other) => StopReason::Other(other.to_string()),
        }
    }

    fn into_provider_response(resp: WireResponse) -> ProviderResponse {
        let content = resp
            .content
            .into_iter()
            .map(|block| match block {
                WireBlock::Text { text } => ContentBlock::Text { text },
                WireBlock::ToolUse { id, name, input } => {
                    ContentBlock::ToolUse { id, name, input }
                }
            })
            .collect();

        ProviderResponse {
            content,
            stop_reason: Self::parse_stop_reason(resp.stop_reason.as_deref()),
            usage: Usage {
                input_tokens: resp.usage.input_tokens,
                output_tokens: resp.usage.output_tokens,
                cache_read_tokens: resp.usage.cache_read_input_tokens.unwrap_or(0),
                cache_creation_tokens: resp.usage.cache_creation_input_tokens.unwrap_or(0),
            },
            model: resp.model,
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);

        let mut body = json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "system": Self::render_system(&request.system),
            "messages": Self::render_messages(&request.messages),
        });

        if !request.tools.is_empty() {
            body["tools"] = serde_json::to_value(&request.tools)
                .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
            body["tool_choice"] = Self::render_tool_choice(request.tool_choice);
        }

        debug!(provider = "anthropic", model = %request.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("anthropic-beta", ANTHROPIC_BETA)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid Anthropic API key".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Anthropic API error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        Ok(Self::into_provider_response(wire))
    }
}

// --- Anthropic wire types ---

#[derive(Debug, Deserialize)]
struct WireResponse {
    model: String,
    content: Vec<WireBlock>,
    usage: WireUsage,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    input_tokens: u64,
    output_tokens: u64,
    #[serde(default)]
    cache_read_input_tokens: Option<u64>,
    #[serde(default)]
    cache_creation_input_tokens: Option<u64>,
}
