//! Shared domain types for the inference engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ai::AiAnnotation;
use crate::rules::RuleHits;
use crate::signals::FeatureRecord;

// ── Messages ────────────────────────────────────────────────────────

/// Message direction relative to the business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// From the customer.
    Inbound,
    /// From the business.
    Outbound,
}

/// Message role within the thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Standard,
    /// Last-ditch outbound sent to an inactivity-timed-out conversation.
    /// Excluded from inbound/outbound counters but kept for snippet and
    /// resurrection-intent gating.
    FinalTouch,
}

/// One message in a conversation thread. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Platform-native message id.
    pub id: String,
    pub direction: Direction,
    /// Nullable upstream; treated as empty by the extractor.
    pub text: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub kind: MessageKind,
    /// AI interpretation attached by an upstream step, never recomputed here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai: Option<AiAnnotation>,
}

/// A message plus its derived feature record and rule hits.
///
/// Created once per message and never patched — re-running the extractor
/// produces a new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedMessage {
    pub message: Message,
    pub features: FeatureRecord,
    pub hits: RuleHits,
}

impl AnnotatedMessage {
    pub fn is_inbound(&self) -> bool {
        self.message.direction == Direction::Inbound
    }

    pub fn is_final_touch(&self) -> bool {
        self.message.kind == MessageKind::FinalTouch
    }

    pub fn text(&self) -> &str {
        self.message.text.as_deref().unwrap_or("")
    }
}

// ── Lifecycle state ─────────────────────────────────────────────────

/// Engagement lifecycle state. Closed set — the resolver returns exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationState {
    New,
    Engaged,
    Productive,
    HighlyProductive,
    PriceGiven,
    Deferred,
    OffPlatform,
    Converted,
    Resurrected,
    Lost,
    Spam,
}

impl ConversationState {
    /// Terminal states never carry follow-up fields.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Lost | Self::Spam | Self::Converted)
    }

    /// Dormant states are eligible for resurrection.
    pub fn is_dormant(&self) -> bool {
        matches!(self, Self::Lost | Self::Deferred | Self::OffPlatform)
    }
}

/// Confidence tier attached to a verdict or an evidenced reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

// ── Reasons ─────────────────────────────────────────────────────────

/// One entry in a verdict's reason list: either a bare tag or a structured
/// code with evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reason {
    Evidenced {
        code: String,
        confidence: Confidence,
        evidence: String,
    },
    Simple(String),
}

impl Reason {
    pub fn simple(tag: impl Into<String>) -> Self {
        Self::Simple(tag.into())
    }

    pub fn evidenced(
        code: impl Into<String>,
        confidence: Confidence,
        evidence: impl Into<String>,
    ) -> Self {
        Self::Evidenced {
            code: code.into(),
            confidence,
            evidence: evidence.into(),
        }
    }

    /// The reason code, regardless of variant. Downstream consumers use this
    /// instead of re-deriving tag extraction.
    pub fn code(&self) -> &str {
        match self {
            Self::Simple(tag) => tag,
            Self::Evidenced { code, .. } => code,
        }
    }
}

/// Deduplicate reason codes, preserving first-seen order.
pub fn dedupe_reason_codes(reasons: &[Reason]) -> Vec<String> {
    let mut seen = Vec::new();
    for reason in reasons {
        let code = reason.code();
        if !seen.iter().any(|existing: &String| existing == code) {
            seen.push(code.to_string());
        }
    }
    seen
}

/// Reason tags emitted by the resolver. Explicit-lost codes live on
/// [`crate::signals::LostReasonCode`].
pub mod reason {
    pub const OPT_OUT: &str = "OPT_OUT";
    pub const BLOCKED_BY_RECIPIENT: &str = "BLOCKED_BY_RECIPIENT";
    pub const DELIVERY_BOUNCED: &str = "DELIVERY_BOUNCED";
    pub const SPAM_PHRASE_MATCH: &str = "SPAM_PHRASE_MATCH";
    pub const SPAM_CONTENT: &str = "SPAM_CONTENT";
    pub const SPAM_CONTEXT_CONFIRMED: &str = "SPAM_CONTEXT_CONFIRMED";
    pub const CONVERSION_PHRASE: &str = "CONVERSION_PHRASE";
    pub const LOSS_PHRASE: &str = "LOSS_PHRASE";
    pub const INDEFINITE_DEFERRAL: &str = "INDEFINITE_DEFERRAL";
    pub const WAIT_TO_PROCEED: &str = "WAIT_TO_PROCEED";
    pub const PHONE_OR_EMAIL: &str = "PHONE_OR_EMAIL";
    pub const OFF_PLATFORM_HANDOFF: &str = "OFF_PLATFORM_HANDOFF";
    pub const AI_HANDOFF: &str = "AI_HANDOFF";
    pub const DEFERRAL_PHRASE: &str = "DEFERRAL_PHRASE";
    pub const DEFERRAL_DATE: &str = "DEFERRAL_DATE";
    pub const AI_DEFERRED: &str = "AI_DEFERRED";
    pub const PRICE_DISCUSSED: &str = "PRICE_DISCUSSED";
    pub const HIGHLY_PRODUCTIVE_THREAD: &str = "HIGHLY_PRODUCTIVE_THREAD";
    pub const PRODUCTIVE_THREAD: &str = "PRODUCTIVE_THREAD";
    pub const ENGAGED_THREAD: &str = "ENGAGED_THREAD";
    pub const NEW_CONVERSATION: &str = "NEW_CONVERSATION";
    pub const STALE_PRICE_REJECTION: &str = "STALE_PRICE_REJECTION";
    pub const STALE_OFF_PLATFORM_HANDOFF: &str = "STALE_OFF_PLATFORM_HANDOFF";
    pub const STALE_INDEFINITE_DEFERRAL: &str = "STALE_INDEFINITE_DEFERRAL";
    pub const LOST_INACTIVE_TIMEOUT: &str = "LOST_INACTIVE_TIMEOUT";
    pub const STALE_PRICE_QUOTE: &str = "STALE_PRICE_QUOTE";
    pub const RESURRECTED: &str = "RESURRECTED";
    pub const UNREPLIED: &str = "UNREPLIED";
    pub const SLA_BREACH: &str = "SLA_BREACH";
    pub const USER_ANNOTATION: &str = "USER_ANNOTATION";
}

// ── Inference result ────────────────────────────────────────────────

/// Output of one resolver invocation.
///
/// The engine holds no state between invocations; callers persist `state`
/// and the evaluation timestamp and supply them back as the previous state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    pub state: ConversationState,
    pub confidence: Confidence,
    /// Ordered; first entries come from the matched cascade rule.
    pub reasons: Vec<Reason>,
    pub followup_due_at: Option<DateTime<Utc>>,
    pub followup_suggestion: Option<String>,
    pub last_inbound_at: Option<DateTime<Utc>>,
    pub last_outbound_at: Option<DateTime<Utc>>,
    pub last_message_at: Option<DateTime<Utc>>,
    /// Counts exclude final-touch messages.
    pub message_count: usize,
    pub inbound_count: usize,
    pub outbound_count: usize,
    pub last_snippet: Option<String>,
    pub resurrected: bool,
    pub needs_followup: bool,
    /// Message that triggered a terminal state, when one did.
    pub terminal_message_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_serializes_screaming_snake_case() {
        let json = serde_json::to_value(ConversationState::HighlyProductive).unwrap();
        assert_eq!(json, "HIGHLY_PRODUCTIVE");
        let json = serde_json::to_value(ConversationState::OffPlatform).unwrap();
        assert_eq!(json, "OFF_PLATFORM");
    }

    #[test]
    fn terminal_and_dormant_classification() {
        assert!(ConversationState::Lost.is_terminal());
        assert!(ConversationState::Spam.is_terminal());
        assert!(ConversationState::Converted.is_terminal());
        assert!(!ConversationState::Deferred.is_terminal());

        assert!(ConversationState::Lost.is_dormant());
        assert!(ConversationState::Deferred.is_dormant());
        assert!(ConversationState::OffPlatform.is_dormant());
        assert!(!ConversationState::Converted.is_dormant());
    }

    #[test]
    fn reason_code_covers_both_variants() {
        let simple = Reason::simple(reason::UNREPLIED);
        assert_eq!(simple.code(), "UNREPLIED");

        let evidenced =
            Reason::evidenced("LOST_PRICE_OUT_OF_RANGE", Confidence::High, "out of my price range");
        assert_eq!(evidenced.code(), "LOST_PRICE_OUT_OF_RANGE");
    }

    #[test]
    fn reason_serialization_shapes() {
        let simple = Reason::simple("SPAM_PHRASE_MATCH");
        assert_eq!(serde_json::to_value(&simple).unwrap(), "SPAM_PHRASE_MATCH");

        let evidenced = Reason::evidenced("LOSS", Confidence::Medium, "went with another");
        let json = serde_json::to_value(&evidenced).unwrap();
        assert_eq!(json["code"], "LOSS");
        assert_eq!(json["confidence"], "MEDIUM");
        assert_eq!(json["evidence"], "went with another");
    }

    #[test]
    fn dedupe_preserves_first_seen_order() {
        let reasons = vec![
            Reason::simple("B"),
            Reason::evidenced("A", Confidence::Low, "x"),
            Reason::simple("B"),
            Reason::simple("C"),
            Reason::evidenced("A", Confidence::High, "y"),
        ];
        assert_eq!(dedupe_reason_codes(&reasons), vec!["B", "A", "C"]);
    }
}
