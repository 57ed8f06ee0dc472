//! AI augmentation contract.
//!
//! The resolver never calls a model. An upstream step may attempt AI
//! classification for a message — only when the corresponding explicit signal
//! is absent and the call budget allows — and attaches the outcome to the
//! message as an [`AiAnnotation`]. The resolver consumes annotations as
//! already-resolved facts; a skipped or failed outcome reads the same as "no
//! AI signal available".

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::AiError;
use crate::types::Confidence;

// ── Interpretation schema ───────────────────────────────────────────

/// Which question the upstream step asked the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiMode {
    /// "Did the customer move the conversation off platform?"
    Handoff,
    /// "Did the customer defer to a later date?"
    Deferred,
}

/// Off-platform handoff interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffInterpretation {
    pub is_handoff: bool,
    /// Short descriptor, e.g. "phone", "email", "in_person".
    pub handoff_type: Option<String>,
    pub confidence: Confidence,
    pub evidence: Option<String>,
}

/// Deferral interpretation. Carries either a literal due date or a coarse
/// bucket the scheduler maps onto the message timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeferredInterpretation {
    pub is_deferred: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<DeferralBucket>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date_iso: Option<String>,
    pub confidence: Confidence,
    pub evidence: Option<String>,
}

/// Coarse deferral horizon when the model can't name a literal date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferralBucket {
    FewDays,
    NextWeek,
    NextMonth,
    NextQuarter,
}

impl DeferralBucket {
    /// Days from the anchoring message to the follow-up due date.
    pub fn days(&self) -> i64 {
        match self {
            Self::FewDays => 3,
            Self::NextWeek => 7,
            Self::NextMonth => 30,
            Self::NextQuarter => 90,
        }
    }
}

/// Fixed interpretation schema returned by the collaborator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Interpretation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handoff: Option<HandoffInterpretation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deferred: Option<DeferredInterpretation>,
}

// ── Outcomes ────────────────────────────────────────────────────────

/// Why an AI attempt was skipped or produced nothing usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    CacheHit,
    KeywordGate,
    DailyBudgetExceeded,
    ConversationBudgetExceeded,
    InvalidJson,
    Timeout,
    Error,
}

/// Outcome of one AI classification attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AiOutcome {
    /// The model ran and returned a parsable interpretation.
    Executed { interpretation: Interpretation },
    /// The attempt was gated before any model call.
    Skipped { reason: SkipReason },
    /// The call ran but failed; detail kept for the audit trail.
    Failed { reason: SkipReason, detail: String },
}

/// AI sub-record attached to a message by the upstream step.
///
/// The feature extractor copies this through verbatim — it never recomputes
/// or invents one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAnnotation {
    pub mode: AiMode,
    pub model_id: Option<String>,
    /// True only when a model call was actually executed (not cached/skipped).
    pub attempted: bool,
    pub outcome: AiOutcome,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl AiAnnotation {
    /// The interpretation, if the attempt executed successfully.
    pub fn interpretation(&self) -> Option<&Interpretation> {
        match &self.outcome {
            AiOutcome::Executed { interpretation } => Some(interpretation),
            _ => None,
        }
    }
}

// ── Collaborator contract ───────────────────────────────────────────

/// Request sent to the collaborator: normalized/truncated message text plus
/// the cache-key ingredients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiRequest {
    pub text: String,
    pub prompt_version: String,
    pub model_id: String,
    /// Digest of surrounding conversation context supplied by the caller.
    pub context_digest: String,
}

impl AiRequest {
    /// Deterministic cache key.
    ///
    /// Identical keys must return identical interpretations, so the key
    /// covers everything that can change the model's answer.
    pub fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        hasher.update([0]);
        hasher.update(self.prompt_version.as_bytes());
        hasher.update([0]);
        hasher.update(self.model_id.as_bytes());
        hasher.update([0]);
        hasher.update(self.context_digest.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// External collaborator that resolves ambiguous messages.
///
/// Implementations own transport, retries, caching, and timeouts. The engine
/// only ever sees the attached [`AiAnnotation`].
#[async_trait]
pub trait AiAugmenter: Send + Sync {
    async fn interpret(&self, request: &AiRequest) -> Result<AiOutcome, AiError>;
}

// ── Call budget ─────────────────────────────────────────────────────

/// Per-tenant daily call budget with a per-conversation sub-budget.
///
/// Counters increment only on an executed attempt — never on a cache hit or
/// a skip. Day rollover resets both counters.
#[derive(Debug, Clone)]
pub struct AiBudget {
    daily_limit: u32,
    conversation_daily_limit: u32,
    day: Option<NaiveDate>,
    executed_today: u32,
    per_conversation: HashMap<String, u32>,
}

impl AiBudget {
    pub fn new(daily_limit: u32, conversation_daily_limit: u32) -> Self {
        Self {
            daily_limit,
            conversation_daily_limit,
            day: None,
            executed_today: 0,
            per_conversation: HashMap::new(),
        }
    }

    /// Whether an attempt may execute today for this conversation.
    ///
    /// Returns the gating [`SkipReason`] when exhausted.
    pub fn check(&mut self, conversation_id: &str, today: NaiveDate) -> Option<SkipReason> {
        self.roll_over(today);
        if self.executed_today >= self.daily_limit {
            return Some(SkipReason::DailyBudgetExceeded);
        }
        let used = self
            .per_conversation
            .get(conversation_id)
            .copied()
            .unwrap_or(0);
        if used >= self.conversation_daily_limit {
            return Some(SkipReason::ConversationBudgetExceeded);
        }
        None
    }

    /// Record one executed model call.
    pub fn record_executed(&mut self, conversation_id: &str, today: NaiveDate) {
        self.roll_over(today);
        self.executed_today += 1;
        *self
            .per_conversation
            .entry(conversation_id.to_string())
            .or_insert(0) += 1;
    }

    fn roll_over(&mut self, today: NaiveDate) {
        if self.day != Some(today) {
            self.day = Some(today);
            self.executed_today = 0;
            self.per_conversation.clear();
        }
    }
}
