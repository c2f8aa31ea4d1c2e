//! Tag extraction for critic responses.
//!
//! The critic reports through mandatory tags inside free text; extraction
//! is tag-based by design and every missing tag degrades to the safe
//! default rather than erroring.

use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

static APPROVAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<approval_status>(.*?)</approval_status>").expect("valid regex")
});

static FEEDBACK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<approval_status>.*?</approval_status>\s*(.*?)\s*</final_verdict>")
        .expect("valid regex")
});

static TOTAL_SCORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<total_score>\s*total score:\s*(\d+)\s*</total_score>").expect("valid regex")
});

static USER_SCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<user_score>\s*(\d+)\s*</user_score>").expect("valid regex"));

static AI_SCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<ai_score>\s*(\d+)\s*</ai_score>").expect("valid regex"));

/// The full reviewer's decision for one draft. Ephemeral — produced and
/// consumed within a single retry cycle, never persisted.
#[derive(Debug, Clone)]
pub struct ReviewVerdict {
    pub approved: bool,
    /// Self-reported total score, 0–100.
    pub total_score: u32,
    /// Explanation following the approval tag (empty when approved).
    pub feedback: String,
    /// The critic's complete response text.
    pub raw: String,
}

impl ReviewVerdict {
    /// The safe default used when the review call itself fails.
    pub fn rejected(feedback: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            approved: false,
            total_score: 0,
            feedback: feedback.into(),
            raw: raw.into(),
        }
    }
}

/// Extract a verdict from the critic's response text. Missing tags
/// default to not-approved and log a warning.
pub fn parse_verdict(review_text: &str) -> ReviewVerdict {
    let approved = match APPROVAL_RE
        .captures(review_text)
        .map(|c| c[1].trim().to_uppercase())
    {
        Some(status) => status == "APPROVED",
        None => {
            warn!("could not find approval status in the expected format");
            false
        }
    };

    let feedback = match FEEDBACK_RE.captures(review_text) {
        Some(c) => c[1].trim().to_string(),
        None => {
            warn!("could not extract feedback from the review");
            String::new()
        }
    };

    let total_score = match TOTAL_SCORE_RE.captures(review_text) {
        Some(c) => match c[1].parse() {
            Ok(score) => score,
            Err(_) => {
                warn!("could not parse total score from '{}'", &c[1]);
                0
            }
        },
        None => {
            warn!("could not find total score in the expected format");
            0
        }
    };

    ReviewVerdict {
        approved,
        total_score,
        feedback,
        raw: review_text.to_string(),
    }
}

/// The pre-filter's clarity scores for one user input / draft pair.
#[derive(Debug, Clone)]
pub struct Assessment {
    /// 1–100 clarity score for the user's input.
    pub user_score: u32,
    /// 1–100 clarity score for the draft answer.
    pub draft_score: u32,
    /// Whether full review should run at all.
    full_review: bool,
}

/// Full review is warranted only when both the user input and the draft
/// score poorly.
const USER_CLARITY_GATE: u32 = 50;
const DRAFT_CLARITY_GATE: u32 = 60;

impl Assessment {
    pub fn from_scores(user_score: u32, draft_score: u32) -> Self {
        Self {
            user_score,
            draft_score,
            full_review: user_score < USER_CLARITY_GATE && draft_score < DRAFT_CLARITY_GATE,
        }
    }

    /// Used when the pre-filter call itself fails: skip full review, as
    /// the cheap stage is advisory only.
    pub fn skip_review() -> Self {
        Self {
            user_score: 0,
            draft_score: 0,
            full_review: false,
        }
    }

    pub fn full_review_required(&self) -> bool {
        self.full_review
    }
}

/// Extract the two clarity scores from the assessment text. Missing tags
/// score 0, which satisfies both gates and so conservatively triggers
/// full review.
pub fn parse_assessment(assessment_text: &str) -> Assessment {
    let user_score = match USER_SCORE_RE.captures(assessment_text) {
        Some(c) => c[1].parse().unwrap_or(0),
        None => {
            warn!("could not find user score in the expected format");
            0
        }
    };

    let draft_score = match AI_SCORE_RE.captures(assessment_text) {
        Some(c) => c[1].parse().unwrap_or(0),
        None => {
            warn!("could not find draft score in the expected format");
            0
        }
    };

    Assessment::from_scores(user_score, draft_score)
}
