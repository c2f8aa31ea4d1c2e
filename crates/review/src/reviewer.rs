//! The full second-stage review: a separate model call scoring a draft
//! against a ten-criterion rubric, self-reporting an approve/reject
//! verdict through mandatory tags.

use crate::verdict::{self, ReviewVerdict};
use codevet_core::provider::{
    PreambleBlock, Provider, ProviderRequest, RequestBlock, RequestMessage, ToolChoice,
};
use codevet_core::{ContentBlock, Role};
use std::sync::Arc;
use tracing::{info, warn};

/// Issues the rubric critique call and parses the verdict.
pub struct Reviewer {
    provider: Arc<dyn Provider>,
    model: String,
    max_tokens: u32,
}

impl Reviewer {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens,
        }
    }

    /// Review a terminal text draft against the conversation context and
    /// the base instructions. A failed call yields a rejection verdict —
    /// review problems consume a retry attempt, they never abort a turn.
    pub async fn review(&self, draft: &str, context: &str, instructions: &str) -> ReviewVerdict {
        let system = rubric_prompt(context, instructions);
        let user_message = format!(
            "Please conduct a rigorous and highly critical review of this AI \
             response:\n\n<ai_response>{draft}</ai_response>\n\nand compare \
             it meticulously against the provided base instructions and \
             context."
        );

        let request = ProviderRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: vec![PreambleBlock::plain(system)],
            messages: vec![RequestMessage {
                role: Role::User,
                content: vec![RequestBlock {
                    block: ContentBlock::text(user_message),
                    cache_anchor: false,
                }],
            }],
            tools: Vec::new(),
            tool_choice: ToolChoice::None,
        };

        match self.provider.complete(request).await {
            Ok(response) => {
                let v = verdict::parse_verdict(&response.text());
                info!(
                    approved = v.approved,
                    total_score = v.total_score,
                    "review complete"
                );
                v
            }
            Err(e) => {
                warn!(error = %e, "review call failed");
                ReviewVerdict::rejected(
                    "An error occurred during the review process.",
                    e.to_string(),
                )
            }
        }
    }
}

fn rubric_prompt(context: &str, instructions: &str) -> String {
    format!(
        "\
You are an extremely critical AI consultant tasked with meticulously \
reviewing AI-generated responses. Scrutinize the following response with \
the highest standards, considering these criteria:

1. Adherence to guidelines and context (Score 0-10)
2. Accuracy and correctness of information (Score 0-10)
3. Clarity and coherence of the response (Score 0-10)
4. Appropriateness of tone and style (Score 0-10)
5. Consistency with the base instructions (Score 0-10)
6. Depth and insightfulness of the response (Score 0-10)
7. Creativity and innovative thinking (Score 0-10)
8. Practical applicability of any suggestions or solutions (Score 0-10)
9. Anticipation of potential issues or edge cases (Score 0-10)
10. Overall impression and effectiveness (Score 0-10)

The context of the conversation is:
<context>
{context}
</context>

The base instructions used in the conversation are:
<base_prompt>
{instructions}
</base_prompt>

Provide your assessment in the following order:
1. A short evaluation of each criterion, including its score
2. Comparison with the base instructions
3. Specific suggestions for improvement
4. Final verdict and total score. This step is CRITICAL and MUST follow \
this format EXACTLY:

<final_verdict>
<total_score>total score: [YOUR CALCULATED SCORE]</total_score>
<approval_status>[APPROVAL DECISION]</approval_status>
[EXPLANATION IF NOT APPROVED]
</final_verdict>

Replace [YOUR CALCULATED SCORE] with the total out of 100. Replace \
[APPROVAL DECISION] with \"APPROVED\" only if the total score is 90 or \
above AND no individual criterion scores below 8; otherwise use \
\"NOT APPROVED\" and explain why it falls short immediately after the \
</approval_status> tag, still within the <final_verdict> tags.

All tags (<final_verdict>, <total_score>, and <approval_status>) are \
mandatory and are used for automated processing of your review. Be \
extremely picky and demanding: it is better to be too strict than too \
lenient."
    )
}
