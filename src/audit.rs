//! Classification audit snapshot.
//!
//! Pure serializer over the resolver's output contract: flattens the verdict
//! plus windowed conversation counts into an explainability record that
//! callers persist alongside the conversation row.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::InferenceConfig;
use crate::types::{
    dedupe_reason_codes, reason, AnnotatedMessage, Confidence, ConversationState, Direction,
    InferenceResult,
};

/// Per-message rule-tag summary carried in the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageFlagSummary {
    pub message_id: String,
    pub direction: Direction,
    pub rule_tags: Vec<String>,
}

/// Flattened explainability record for one resolver invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditSnapshot {
    pub id: Uuid,
    pub conversation_id: String,
    pub state_before: Option<ConversationState>,
    pub state_after: ConversationState,
    pub confidence: Confidence,
    /// Deduplicated reason codes, first-seen order.
    pub reason_codes: Vec<String>,
    pub inbound_7d: usize,
    pub outbound_7d: usize,
    pub inbound_30d: usize,
    pub outbound_30d: usize,
    pub days_since_last_activity: Option<i64>,
    /// Thresholds as actually applied (clamped).
    pub thresholds: InferenceConfig,
    pub message_flags: Vec<MessageFlagSummary>,
    pub followup_due_at: Option<DateTime<Utc>>,
    pub needs_followup: bool,
    pub resurrected: bool,
    pub generated_at: DateTime<Utc>,
}

/// Human override for an off-platform conversation whose real outcome became
/// known out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeOverride {
    Converted,
    Lost,
}

/// Build the snapshot from the resolver's exact output contract.
pub fn build_snapshot(
    conversation_id: &str,
    result: &InferenceResult,
    messages: &[AnnotatedMessage],
    state_before: Option<ConversationState>,
    config: &InferenceConfig,
    now: DateTime<Utc>,
) -> AuditSnapshot {
    let window = |days: i64, direction: Direction| {
        messages
            .iter()
            .filter(|m| {
                !m.is_final_touch()
                    && m.message.direction == direction
                    && now - m.message.created_at <= Duration::days(days)
            })
            .count()
    };

    AuditSnapshot {
        id: Uuid::new_v4(),
        conversation_id: conversation_id.to_string(),
        state_before,
        state_after: result.state,
        confidence: result.confidence,
        reason_codes: dedupe_reason_codes(&result.reasons),
        inbound_7d: window(7, Direction::Inbound),
        outbound_7d: window(7, Direction::Outbound),
        inbound_30d: window(30, Direction::Inbound),
        outbound_30d: window(30, Direction::Outbound),
        days_since_last_activity: result
            .last_message_at
            .map(|at| (now - at).num_days().max(0)),
        thresholds: config.clamped(),
        message_flags: messages
            .iter()
            .map(|m| MessageFlagSummary {
                message_id: m.message.id.clone(),
                direction: m.message.direction,
                rule_tags: m.hits.iter().map(str::to_string).collect(),
            })
            .collect(),
        followup_due_at: result.followup_due_at,
        needs_followup: result.needs_followup,
        resurrected: result.resurrected,
        generated_at: now,
    }
}

/// Patch an off-platform snapshot with a human-confirmed outcome.
///
/// The computed label is replaced and a `USER_ANNOTATION` reason is
/// prepended; the underlying inference reasons are preserved.
pub fn apply_outcome_override(snapshot: &mut AuditSnapshot, outcome: OutcomeOverride) {
    snapshot.state_after = match outcome {
        OutcomeOverride::Converted => ConversationState::Converted,
        OutcomeOverride::Lost => ConversationState::Lost,
    };
    if !snapshot
        .reason_codes
        .iter()
        .any(|code| code == reason::USER_ANNOTATION)
    {
        snapshot
            .reason_codes
            .insert(0, reason::USER_ANNOTATION.to_string());
    }
}
