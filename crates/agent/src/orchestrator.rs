//! The per-turn state machine: drafting, tool round-trips, review
//! gating, and commits to the durable store.

use crate::bridge::ToolBridge;
use codevet_core::provider::{
    Provider, ProviderRequest, ProviderResponse, StopReason, ToolChoice,
};
use codevet_core::{ContextCache, Conversation, Error, Message, Result, Role};
use codevet_review::{Prefilter, Reviewer};
use codevet_telemetry::UsageMeter;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Maximum reviewed drafts per turn. Tool round-trips are not counted
/// against this bound.
pub const MAX_ATTEMPTS: u32 = 5;

const TRUNCATION_NOTE: &str = "\n\n---\nNote: this answer was cut short by \
the output token limit. Ask for the remainder, or split the question into \
smaller parts to get a complete response.";

/// Terminal result of one user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// An approved final answer, committed to the durable store.
    Answered(String),
    /// The model hit the output token limit; the partial answer was
    /// committed with an explanatory suffix and no retry was made.
    Truncated(String),
    /// No draft survived review within the attempt bound. Nothing was
    /// committed for the assistant.
    Exhausted,
}

/// Durable per-conversation state: the committed history plus the
/// context cache. Mutated only by the orchestrator's single control
/// flow.
pub struct Session {
    pub conversation: Conversation,
    pub context: ContextCache,
}

impl Session {
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            conversation: Conversation::new(instructions),
            context: ContextCache::new(),
        }
    }
}

/// Drives one user turn to a terminal outcome.
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    bridge: ToolBridge,
    prefilter: Prefilter,
    reviewer: Reviewer,
    meter: UsageMeter,
    model: String,
    max_tokens: u32,
    max_attempts: u32,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        bridge: ToolBridge,
        prefilter: Prefilter,
        reviewer: Reviewer,
        model: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            provider,
            bridge,
            prefilter,
            reviewer,
            meter: UsageMeter::new(),
            model: model.into(),
            max_tokens,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Usage accounting for this orchestrator's main-loop calls.
    pub fn meter(&self) -> &UsageMeter {
        &self.meter
    }

    /// Process one user turn to completion.
    ///
    /// Remote call errors propagate via `Err` and end the turn; nothing
    /// beyond the user message and any completed tool round-trips is
    /// committed in that case.
    pub async fn run_turn(
        &mut self,
        session: &mut Session,
        user_input: &str,
    ) -> Result<TurnOutcome> {
        session.conversation.append(Message::user(user_input));

        // All review retries mutate this snapshot; the durable store only
        // sees approved content and tool round-trips.
        let mut working = session.conversation.snapshot();
        let mut attempts = 0u32;
        let mut first_draft = true;

        info!(
            history = session.conversation.len(),
            cached_files = session.context.len(),
            "processing turn"
        );

        loop {
            let response = self.call_model(&working, &mut session.context).await?;

            if response.stop_reason == StopReason::MaxTokens {
                // Retrying after a length-limit response risks repeating
                // the same truncation or corrupting an in-progress tool
                // call. Commit the partial and stop.
                warn!("response truncated by the output token limit");
                let answer = format!("{}{TRUNCATION_NOTE}", response.text());
                session.conversation.append(Message::assistant(&answer));
                return Ok(TurnOutcome::Truncated(answer));
            }

            let calls = response.tool_calls();
            if !calls.is_empty() {
                // Tool round-trips are the model's information gathering:
                // they bypass review and commit to the durable history as
                // they happen.
                debug!(count = calls.len(), "executing tool calls");
                let assistant = Message::from_blocks(Role::Assistant, response.content.clone());
                session.conversation.append(assistant.clone());
                working.append(assistant);

                let folded = self.bridge.run_calls(&calls, &mut session.context).await;
                session.conversation.append(folded.clone());
                working.append(folded);
                continue;
            }

            if response.content.is_empty() {
                return Err(Error::Internal("model returned an empty response".into()));
            }

            let draft = response.text();
            attempts += 1;

            if first_draft {
                first_draft = false;
                let user_text = working.last_user_text().unwrap_or_default();
                let assessment = self.prefilter.assess(&user_text, &draft).await;
                if !assessment.full_review_required() {
                    debug!("pre-filter cleared the draft without full review");
                    session.conversation.append(Message::assistant(&draft));
                    return Ok(TurnOutcome::Answered(draft));
                }
            }

            let context = serde_json::to_string(&working.render_for_request())?;
            let verdict = self
                .reviewer
                .review(&draft, &context, working.instructions())
                .await;

            if verdict.approved {
                info!(attempts, score = verdict.total_score, "draft approved");
                session.conversation.append(Message::assistant(&draft));
                return Ok(TurnOutcome::Answered(draft));
            }

            warn!(attempts, score = verdict.total_score, "draft rejected");
            if attempts >= self.max_attempts {
                warn!(attempts, "attempt bound exhausted, abandoning the turn");
                return Ok(TurnOutcome::Exhausted);
            }

            let feedback = if verdict.feedback.is_empty() {
                "No specific feedback provided."
            } else {
                verdict.feedback.as_str()
            };
            working.append_feedback(feedback);
        }
    }

    /// One main-loop remote call: render, send, then mark the cache
    /// synced and record usage. Synced before any tool results fold in,
    /// so artifacts produced during this turn classify as fresh on the
    /// next call.
    async fn call_model(
        &mut self,
        working: &Conversation,
        cache: &mut ContextCache,
    ) -> Result<ProviderResponse> {
        let request = ProviderRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: working.render_preamble(cache),
            messages: working.render_for_request(),
            tools: self.bridge.definitions(),
            tool_choice: ToolChoice::Auto,
        };

        let start = Instant::now();
        let response = self.provider.complete(request).await?;
        cache.mark_synced();
        self.meter.record(&response.usage, start.elapsed());
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use codevet_core::error::{ProviderError, ToolError};
    use codevet_core::provider::Usage;
    use codevet_core::tool::{Tool, ToolOutput};
    use codevet_core::{ContentBlock, ToolRegistry};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Pops one queued response per call and keeps every request it was
    /// sent; errors once the script runs dry.
    struct ScriptedProvider {
        responses: Mutex<VecDeque<ProviderResponse>>,
        requests: Mutex<Vec<ProviderRequest>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<ProviderResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn request(&self, index: usize) -> ProviderRequest {
            self.requests.lock().unwrap()[index].clone()
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ProviderError::Network("script exhausted".into()))
        }
    }

    fn request_text(request: &ProviderRequest) -> String {
        request
            .messages
            .iter()
            .flat_map(|m| m.content.iter())
            .filter_map(|rb| rb.block.as_text().map(String::from))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn usage() -> Usage {
        Usage {
            input_tokens: 100,
            output_tokens: 50,
            cache_read_tokens: 25,
            cache_creation_tokens: 10,
        }
    }

    fn text_response(text: &str) -> ProviderResponse {
        ProviderResponse {
            content: vec![ContentBlock::text(text)],
            stop_reason: StopReason::EndTurn,
            usage: usage(),
            model: "scripted".into(),
        }
    }

    fn tool_response(name: &str, id: &str) -> ProviderResponse {
        ProviderResponse {
            content: vec![ContentBlock::ToolUse {
                id: id.into(),
                name: name.into(),
                input: serde_json::json!({"path": "."}),
            }],
            stop_reason: StopReason::ToolUse,
            usage: usage(),
            model: "scripted".into(),
        }
    }

    fn truncated_response(text: &str) -> ProviderResponse {
        ProviderResponse {
            content: vec![ContentBlock::text(text)],
            stop_reason: StopReason::MaxTokens,
            usage: usage(),
            model: "scripted".into(),
        }
    }

    fn assessment_response(user_score: u32, draft_score: u32) -> ProviderResponse {
        text_response(&format!(
            "<assessment><user_score>{user_score}</user_score>\
             <ai_score>{draft_score}</ai_score></assessment>"
        ))
    }

    fn verdict_response(approved: bool, score: u32, feedback: &str) -> ProviderResponse {
        let status = if approved { "APPROVED" } else { "NOT APPROVED" };
        text_response(&format!(
            "<final_verdict>\
             <total_score>total score: {score}</total_score>\
             <approval_status>{status}</approval_status>\
             {feedback}\
             </final_verdict>"
        ))
    }

    struct StubTool {
        name: &'static str,
        output: ToolOutput,
    }

    #[async_trait]
    impl Tool for StubTool {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "stub"
        }
        fn input_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {}})
        }
        async fn execute(
            &self,
            _: serde_json::Value,
        ) -> std::result::Result<ToolOutput, ToolError> {
            Ok(self.output.clone())
        }
    }

    struct Harness {
        orchestrator: Orchestrator,
        session: Session,
        main: Arc<ScriptedProvider>,
        prefilter: Arc<ScriptedProvider>,
        reviewer: Arc<ScriptedProvider>,
        _workdir: tempfile::TempDir,
    }

    fn harness(
        main_responses: Vec<ProviderResponse>,
        prefilter_responses: Vec<ProviderResponse>,
        reviewer_responses: Vec<ProviderResponse>,
        tools: Vec<StubTool>,
    ) -> Harness {
        let workdir = tempfile::tempdir().unwrap();
        let main = ScriptedProvider::new(main_responses);
        let prefilter_provider = ScriptedProvider::new(prefilter_responses);
        let reviewer_provider = ScriptedProvider::new(reviewer_responses);

        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.register(Box::new(tool));
        }

        let orchestrator = Orchestrator::new(
            main.clone(),
            ToolBridge::new(Arc::new(registry), workdir.path()),
            Prefilter::new(prefilter_provider.clone(), "scripted"),
            Reviewer::new(reviewer_provider.clone(), "scripted", 2000),
            "scripted",
            8192,
        );

        Harness {
            orchestrator,
            session: Session::new("You are a careful assistant."),
            main,
            prefilter: prefilter_provider,
            reviewer: reviewer_provider,
            _workdir: workdir,
        }
    }

    fn roles(session: &Session) -> Vec<Role> {
        session
            .conversation
            .messages()
            .iter()
            .map(|m| m.role)
            .collect()
    }

    // Scenario A: a tool round-trip then a pre-filter-cleared answer.
    #[tokio::test]
    async fn tool_round_trip_then_prefiltered_answer() {
        let mut h = harness(
            vec![
                tool_response("list_files", "toolu_1"),
                text_response("Here are your files: src/, Cargo.toml"),
            ],
            vec![assessment_response(80, 90)],
            vec![],
            vec![StubTool {
                name: "list_files",
                output: ToolOutput::ok().with("listing", "src/\nCargo.toml"),
            }],
        );

        let outcome = h
            .orchestrator
            .run_turn(&mut h.session, "list the files")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TurnOutcome::Answered("Here are your files: src/, Cargo.toml".into())
        );
        // user, assistant/tool_use, user/tool_result, assistant text
        assert_eq!(h.session.conversation.len(), 4);
        assert_eq!(
            roles(&h.session),
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
        // The folder listing carried no file content: cache unchanged.
        assert!(h.session.context.is_empty());
        // Both main-loop calls were metered; the reviewer never ran.
        assert_eq!(h.orchestrator.meter().requests(), 2);
        assert_eq!(h.reviewer.calls(), 0);
        assert_eq!(h.prefilter.calls(), 1);
    }

    // Scenario B: two rejections, then approval on the third draft.
    #[tokio::test]
    async fn reject_reject_approve() {
        let mut h = harness(
            vec![
                text_response("draft one"),
                text_response("draft two"),
                text_response("draft three"),
            ],
            vec![assessment_response(10, 10)],
            vec![
                verdict_response(false, 70, "Too shallow."),
                verdict_response(false, 80, "Still shallow."),
                verdict_response(true, 95, ""),
            ],
            vec![],
        );

        let outcome = h
            .orchestrator
            .run_turn(&mut h.session, "explain the cache")
            .await
            .unwrap();

        assert_eq!(outcome, TurnOutcome::Answered("draft three".into()));
        // Exactly three drafting calls for this turn.
        assert_eq!(h.orchestrator.meter().requests(), 3);
        assert_eq!(h.main.calls(), 3);

        // The durable store gained exactly one assistant message, and no
        // rejected draft appears anywhere in it.
        assert_eq!(h.session.conversation.len(), 2);
        let committed = h.session.conversation.messages()[1].text_content();
        assert_eq!(committed, "draft three");
        for msg in h.session.conversation.messages() {
            assert!(!msg.text_content().contains("draft one"));
            assert!(!msg.text_content().contains("draft two"));
        }
        // Feedback stayed on the working copy: the durable user message
        // still has a single block.
        assert_eq!(h.session.conversation.messages()[0].content.len(), 1);
    }

    // Scenario C: truncation commits a partial answer with zero retries.
    #[tokio::test]
    async fn truncation_is_terminal() {
        let mut h = harness(
            vec![truncated_response("the first half of an ans")],
            vec![],
            vec![],
            vec![],
        );

        let outcome = h
            .orchestrator
            .run_turn(&mut h.session, "write an essay")
            .await
            .unwrap();

        let TurnOutcome::Truncated(answer) = outcome else {
            panic!("expected truncated outcome, got {outcome:?}");
        };
        assert!(answer.starts_with("the first half of an ans"));
        assert!(answer.contains("cut short"));

        // Exactly one remote call, no review of any kind, and the
        // partial answer is committed.
        assert_eq!(h.main.calls(), 1);
        assert_eq!(h.prefilter.calls(), 0);
        assert_eq!(h.reviewer.calls(), 0);
        assert_eq!(h.session.conversation.len(), 2);
        assert_eq!(
            h.session.conversation.messages()[1].text_content(),
            answer
        );
    }

    #[tokio::test]
    async fn attempt_bound_is_five_when_every_draft_is_rejected() {
        let rejections = (0..5)
            .map(|i| verdict_response(false, 50 + i, "no"))
            .collect();
        let mut h = harness(
            (0..6).map(|i| text_response(&format!("draft {i}"))).collect(),
            vec![assessment_response(10, 10)],
            rejections,
            vec![],
        );

        let outcome = h
            .orchestrator
            .run_turn(&mut h.session, "hard question")
            .await
            .unwrap();

        assert_eq!(outcome, TurnOutcome::Exhausted);
        // Never more than 5 draft-generating calls.
        assert_eq!(h.main.calls(), 5);
        assert_eq!(h.orchestrator.meter().requests(), 5);
        // Nothing committed beyond the user message.
        assert_eq!(h.session.conversation.len(), 1);
        assert_eq!(roles(&h.session), vec![Role::User]);
    }

    #[tokio::test]
    async fn prefilter_runs_only_on_the_first_terminal_draft() {
        let mut h = harness(
            vec![text_response("draft one"), text_response("draft two")],
            // One scripted assessment: a second pre-filter call would
            // error and skip review, which would wrongly approve.
            vec![assessment_response(10, 10)],
            vec![
                verdict_response(false, 60, "thin"),
                verdict_response(true, 95, ""),
            ],
            vec![],
        );

        let outcome = h
            .orchestrator
            .run_turn(&mut h.session, "question")
            .await
            .unwrap();

        assert_eq!(outcome, TurnOutcome::Answered("draft two".into()));
        assert_eq!(h.prefilter.calls(), 1);
        assert_eq!(h.reviewer.calls(), 2);
    }

    #[tokio::test]
    async fn file_bearing_tool_results_update_the_cache() {
        let mut h = harness(
            vec![
                tool_response("read_file", "toolu_1"),
                text_response("That file defines the entry point."),
            ],
            vec![assessment_response(80, 90)],
            vec![],
            vec![StubTool {
                name: "read_file",
                output: ToolOutput::ok()
                    .with("file_path", "src/main.rs")
                    .with("file_content", "fn main() {}"),
            }],
        );

        h.orchestrator
            .run_turn(&mut h.session, "what's in main.rs?")
            .await
            .unwrap();

        let artifact = h.session.context.get("src/main.rs").unwrap();
        assert_eq!(artifact.content, "fn main() {}");
        assert_eq!(artifact.source, "read_file");
        // The artifact was transmitted with the follow-up drafting call,
        // whose sync stamp makes it classify as unchanged from here on.
        let (unchanged, fresh) = h.session.context.partition_for_request();
        assert_eq!(unchanged.len(), 1);
        assert!(fresh.is_empty());
    }

    #[tokio::test]
    async fn provider_error_propagates_and_commits_nothing_extra() {
        let mut h = harness(vec![], vec![], vec![], vec![]);

        let result = h.orchestrator.run_turn(&mut h.session, "hello").await;
        assert!(result.is_err());
        // Only the user message entered the durable store.
        assert_eq!(h.session.conversation.len(), 1);
        assert_eq!(h.orchestrator.meter().requests(), 0);
    }

    #[tokio::test]
    async fn rejection_feedback_reaches_the_next_request() {
        let mut h = harness(
            vec![text_response("draft one"), text_response("draft two")],
            vec![assessment_response(10, 10)],
            vec![
                verdict_response(false, 60, "Needs code examples."),
                verdict_response(true, 95, ""),
            ],
            vec![],
        );

        h.orchestrator
            .run_turn(&mut h.session, "question")
            .await
            .unwrap();

        // The first drafting request carried no feedback; the retry did.
        assert!(!request_text(&h.main.request(0)).contains("Needs code examples"));
        let retry = request_text(&h.main.request(1));
        assert!(retry.contains("[FEEDBACK]"));
        assert!(retry.contains("Needs code examples"));

        // And it was applied to the working copy only; durable history
        // never mentions it.
        for msg in h.session.conversation.messages() {
            assert!(!msg.text_content().contains("Needs code examples"));
        }
    }

    #[tokio::test]
    async fn empty_response_is_an_internal_error() {
        let mut h = harness(
            vec![ProviderResponse {
                content: vec![],
                stop_reason: StopReason::EndTurn,
                usage: usage(),
                model: "scripted".into(),
            }],
            vec![],
            vec![],
            vec![],
        );

        let result = h.orchestrator.run_turn(&mut h.session, "hello").await;
        assert!(matches!(result, Err(Error::Internal(_))));
    }

    #[tokio::test]
    async fn cache_is_marked_synced_after_each_call() {
        let mut h = harness(
            vec![text_response("fine")],
            vec![assessment_response(80, 90)],
            vec![],
            vec![],
        );

        assert!(h.session.context.last_synced().is_none());
        h.orchestrator
            .run_turn(&mut h.session, "hello")
            .await
            .unwrap();
        assert!(h.session.context.last_synced().is_some());
    }
}
