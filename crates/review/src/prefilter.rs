//! The cheap first-stage review: one lightweight model call scoring the
//! clarity of the user input and the draft answer.

use crate::verdict::{self, Assessment};
use codevet_core::provider::{
    PreambleBlock, Provider, ProviderRequest, RequestBlock, RequestMessage, ToolChoice,
};
use codevet_core::{ContentBlock, Role};
use std::sync::Arc;
use tracing::{debug, warn};

const ASSESSMENT_MAX_TOKENS: u32 = 1000;

const ASSESSMENT_PROMPT: &str = "\
You are an expert in assessing the simplicity and clarity of meaning and \
context in communication. Your task is to evaluate both a user's input and \
an AI's response, focusing on the underlying meaning and contextual \
relevance rather than just the surface-level text. Rate them on a scale \
from 1 to 100, where:

1 is extremely complex, unclear in meaning, or lacking contextual relevance.
100 is very simple, clear in meaning, and highly relevant to the context.

Consider factors such as:
- Coherence of ideas
- Relevance to the conversation context
- Ease of understanding the intended meaning
- Absence of ambiguity or confusion in the message

Provide your assessment in the following format:

<assessment>
<user_score>Score for user input</user_score>
<user_explanation>Brief explanation for the user input score</user_explanation>
<ai_score>Score for AI response</ai_score>
<ai_explanation>Brief explanation for the AI response score</ai_explanation>
</assessment>

Ensure that your scores are integers between 1 and 100.";

/// Scores user input and draft independently; full review runs only when
/// both score poorly.
pub struct Prefilter {
    provider: Arc<dyn Provider>,
    model: String,
}

impl Prefilter {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Assess one user input / draft pair. A failed call skips full
    /// review rather than erroring — this stage is advisory only.
    pub async fn assess(&self, user_input: &str, draft: &str) -> Assessment {
        let prompt = format!(
            "Please assess the simplicity and clarity of the following user \
             input and AI response:\n\nUser Input:\n{user_input}\n\n\
             AI Response:\n{draft}"
        );

        let request = ProviderRequest {
            model: self.model.clone(),
            max_tokens: ASSESSMENT_MAX_TOKENS,
            system: vec![PreambleBlock::plain(ASSESSMENT_PROMPT)],
            messages: vec![RequestMessage {
                role: Role::User,
                content: vec![RequestBlock {
                    block: ContentBlock::text(prompt),
                    cache_anchor: false,
                }],
            }],
            tools: Vec::new(),
            tool_choice: ToolChoice::None,
        };

        match self.provider.complete(request).await {
            Ok(response) => {
                let assessment = verdict::parse_assessment(&response.text());
                debug!(
                    user_score = assessment.user_score,
                    draft_score = assessment.draft_score,
                    full_review = assessment.full_review_required(),
                    "pre-filter assessment complete"
                );
                assessment
            }
            Err(e) => {
                warn!(error = %e, "pre-filter call failed, skipping full review");
                Assessment::skip_review()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use codevet_core::error::ProviderError;
    use codevet_core::provider::{ProviderResponse, StopReason, Usage};

    struct FixedProvider {
        response: Option<String>,
    }

    #[async_trait]
    impl Provider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            match &self.response {
                Some(text) => Ok(ProviderResponse {
                    content: vec![ContentBlock::text(text)],
                    stop_reason: StopReason::EndTurn,
                    usage: Usage::default(),
                    model: "fixed".into(),
                }),
                None => Err(ProviderError::Network("connection refused".into())),
            }
        }
    }

    #[tokio::test]
    async fn clear_scores_skip_full_review() {
        let prefilter = Prefilter::new(
            Arc::new(FixedProvider {
                response: Some(
                    "<assessment><user_score>80</user_score>\
                     <ai_score>90</ai_score></assessment>"
                        .into(),
                ),
            }),
            "test-model",
        );

        let assessment = prefilter.assess("list the files", "Here they are").await;
        assert_eq!(assessment.user_score, 80);
        assert!(!assessment.full_review_required());
    }

    #[tokio::test]
    async fn murky_scores_require_full_review() {
        let prefilter = Prefilter::new(
            Arc::new(FixedProvider {
                response: Some(
                    "<assessment><user_score>20</user_score>\
                     <ai_score>35</ai_score></assessment>"
                        .into(),
                ),
            }),
            "test-model",
        );

        let assessment = prefilter.assess("hm?", "well...").await;
        assert!(assessment.full_review_required());
    }

    #[tokio::test]
    async fn provider_failure_skips_full_review() {
        let prefilter = Prefilter::new(Arc::new(FixedProvider { response: None }), "test-model");
        let assessment = prefilter.assess("anything", "anything").await;
        assert!(!assessment.full_review_required());
    }
}
