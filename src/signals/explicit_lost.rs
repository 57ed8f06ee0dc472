//! Explicit-lost sub-classifier.
//!
//! A fixed-priority cascade of deterministic phrase detectors that classify
//! *why* a customer is lost, as opposed to the generic loss detector. Only
//! the first matching code is returned, with an evidence excerpt and a
//! confidence tier. Runs on inbound text only — the extractor gates that.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::Confidence;

/// Specific reason a conversation is explicitly lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LostReasonCode {
    #[serde(rename = "LOST_NOT_INTENTIONAL")]
    NotIntentional,
    #[serde(rename = "LOST_BOUGHT_ELSEWHERE")]
    BoughtElsewhere,
    #[serde(rename = "LOST_CHOSE_EXISTING")]
    ChoseExisting,
    #[serde(rename = "LOST_PRICE_OUT_OF_RANGE")]
    PriceOutOfRange,
    #[serde(rename = "LOST_EXPLICIT_DECLINE")]
    ExplicitDecline,
    #[serde(rename = "LOST_INDEFINITE_FUTURE")]
    IndefiniteFuture,
    #[serde(rename = "LOST_TIMING_NOT_NOW")]
    TimingNotNow,
    #[serde(rename = "LOST_FEASIBILITY")]
    Feasibility,
}

impl LostReasonCode {
    /// String tag used in reason lists and rule hits.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::NotIntentional => "LOST_NOT_INTENTIONAL",
            Self::BoughtElsewhere => "LOST_BOUGHT_ELSEWHERE",
            Self::ChoseExisting => "LOST_CHOSE_EXISTING",
            Self::PriceOutOfRange => "LOST_PRICE_OUT_OF_RANGE",
            Self::ExplicitDecline => "LOST_EXPLICIT_DECLINE",
            Self::IndefiniteFuture => "LOST_INDEFINITE_FUTURE",
            Self::TimingNotNow => "LOST_TIMING_NOT_NOW",
            Self::Feasibility => "LOST_FEASIBILITY",
        }
    }
}

/// Explicit-lost evidence attached to a feature record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplicitLost {
    pub reason_code: LostReasonCode,
    /// Matched excerpt, truncated for audit display.
    pub evidence: String,
    pub confidence: Confidence,
}

static NOT_INTENTIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:didn'?t mean to|by accident|accidental(?:ly)?|wrong number|didn'?t realize i|sent (?:this|that) by mistake|clicked (?:it|that) by mistake)\b",
    )
    .unwrap()
});

static BOUGHT_ELSEWHERE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:already (?:bought|purchased|got one)|bought (?:one|it) (?:from|at|somewhere)|purchased (?:it )?elsewhere|went with another (?:company|vendor|provider|shop)|got it (?:from|at) (?:another|a different)|someone else (?:did|installed|handled) it)\b",
    )
    .unwrap()
});

static CHOSE_EXISTING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:stick(?:ing)? with (?:my|our|the) current|stay(?:ing)? with (?:my|our|the) current|keep(?:ing)? (?:what we have|the one we have|our existing)|decided to keep)\b",
    )
    .unwrap()
});

static PRICE_OUT_OF_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:out of (?:my|our) price range|can(?:no|')t afford|too expensive for (?:me|us)|over (?:my|our) budget|not in (?:my|our) budget)\b",
    )
    .unwrap()
});

static EXPLICIT_DECLINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:not interested|no thank(?:s| you)|please don'?t contact|we(?:'ll| will) pass|i(?:'ll| will) pass|no,? i(?:'m| am) good|we(?:'re| are) good)\b",
    )
    .unwrap()
});

/// Timing qualifiers that turn a decline into a deferral, never a loss.
/// "no, not right now" and "no thank you, maybe later" must not count.
static TIMING_QUALIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:right now|at the moment|for now|not yet|maybe later|later this|next (?:week|month|year)|at this time|currently|this (?:week|month|year)|down the road|some ?day|check back)\b",
    )
    .unwrap()
});

static INDEFINITE_FUTURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:maybe some ?day|down the road|years? from now|far (?:in the )?future|long[- ]term plan|not for a (?:long )?while)\b",
    )
    .unwrap()
});

static TIMING_NOT_NOW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:not right now|not (?:a good|the right) time|bad timing|too busy right now|can'?t (?:do (?:this|it) )?right now|maybe (?:later|another time)|not at the moment)\b",
    )
    .unwrap()
});

static FEASIBILITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:won'?t fit|doesn'?t fit|not (?:going to|gonna) (?:fit|work)|won'?t work (?:for|in|with)|can'?t be done|not possible (?:in|for|with)|too (?:big|small|narrow|wide) for)\b",
    )
    .unwrap()
});

/// Messages this short read as direct statements and earn a HIGH tier when a
/// specific pattern matched.
const FOCUSED_MESSAGE_CHARS: usize = 120;

/// Run the fixed-priority cascade. First matching code wins.
///
/// `TimingNotNow` and `Feasibility` carry extra resolver-side context checks;
/// here they classify on phrasing alone.
pub fn classify_explicit_lost(text: &str) -> Option<ExplicitLost> {
    let focused = text.chars().count() <= FOCUSED_MESSAGE_CHARS;
    let specific_tier = if focused {
        Confidence::High
    } else {
        Confidence::Medium
    };

    let cascade: [(&Regex, LostReasonCode, Confidence); 8] = [
        (&NOT_INTENTIONAL, LostReasonCode::NotIntentional, specific_tier),
        (&BOUGHT_ELSEWHERE, LostReasonCode::BoughtElsewhere, specific_tier),
        (&CHOSE_EXISTING, LostReasonCode::ChoseExisting, specific_tier),
        (&PRICE_OUT_OF_RANGE, LostReasonCode::PriceOutOfRange, specific_tier),
        (&EXPLICIT_DECLINE, LostReasonCode::ExplicitDecline, specific_tier),
        (&INDEFINITE_FUTURE, LostReasonCode::IndefiniteFuture, Confidence::Medium),
        (&TIMING_NOT_NOW, LostReasonCode::TimingNotNow, Confidence::Medium),
        (&FEASIBILITY, LostReasonCode::Feasibility, Confidence::Medium),
    ];

    for (pattern, code, confidence) in cascade {
        let Some(found) = pattern.find(text) else {
            continue;
        };
        // A decline softened by a timing qualifier is a deferral, not a loss.
        if code == LostReasonCode::ExplicitDecline && TIMING_QUALIFIER.is_match(text) {
            continue;
        }
        return Some(ExplicitLost {
            reason_code: code,
            evidence: excerpt(found.as_str()),
            confidence,
        });
    }
    None
}

/// Whether feasibility-objection corroboration vocabulary is present.
pub fn has_dimensional_context(text: &str) -> bool {
    super::patterns::DIMENSION.is_match(text)
}

fn excerpt(matched: &str) -> String {
    matched.chars().take(80).collect()
}
