//! Conversation state resolver.
//!
//! Folds an ordered message history plus prior persisted state into a single
//! state/confidence/reasons/follow-up verdict. Deterministic: time is
//! injected, messages are stably sorted by creation time, and identical
//! inputs always produce identical output.
//!
//! Flow:
//! 1. Aggregate pass over sorted messages
//! 2. Context flags (contact ever, explicit deferral, AI candidates,
//!    off-platform visibility)
//! 3. Priority cascade — ordered rules, first match wins
//! 4. Post-cascade staleness escalations
//! 5. Resurrection check
//! 6. Follow-up derivation

pub(crate) mod cascade;
pub(crate) mod escalations;
pub(crate) mod followup;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::InferenceConfig;
use crate::rules::build_rule_hits;
use crate::signals::extract_features;
use crate::types::{AnnotatedMessage, ConversationState, InferenceResult, Message};

/// Snippet length kept from the most recent message.
const SNIPPET_CHARS: usize = 120;

/// Everything the resolver needs for one invocation.
///
/// Messages may arrive in any order; the resolver sorts them stably by
/// creation time, so equal timestamps keep input order.
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
    pub messages: Vec<Message>,
    pub previous_state: Option<ConversationState>,
    pub previous_evaluated_at: Option<DateTime<Utc>>,
    pub final_touch_sent_at: Option<DateTime<Utc>>,
    pub delivery_blocked: bool,
    pub delivery_bounced: bool,
    /// Injected evaluation time. Falls back to the real clock only here, at
    /// the boundary — nothing deeper reads a wall clock.
    pub now: Option<DateTime<Utc>>,
}

/// Annotate one message: extract features, carry the AI sub-record through,
/// and build rule hits.
pub fn annotate(message: Message) -> AnnotatedMessage {
    let mut features = extract_features(message.text.as_deref(), message.direction);
    features.ai = message.ai.clone();
    let hits = build_rule_hits(&features);
    AnnotatedMessage {
        message,
        features,
        hits,
    }
}

/// Resolve a conversation to its inference result.
pub fn resolve(ctx: &ConversationContext, config: &InferenceConfig) -> InferenceResult {
    let annotated = ctx.messages.iter().cloned().map(annotate).collect();
    resolve_annotated(annotated, ctx, config)
}

/// Resolve from pre-annotated messages (callers that run the extractor as a
/// separate upstream step).
pub fn resolve_annotated(
    mut messages: Vec<AnnotatedMessage>,
    ctx: &ConversationContext,
    config: &InferenceConfig,
) -> InferenceResult {
    let config = config.clamped();
    let now = ctx.now.unwrap_or_else(Utc::now);

    // Stable sort: equal timestamps keep input order.
    messages.sort_by_key(|m| m.message.created_at);

    let agg = aggregate(&messages);
    let flags = context_flags(&messages);
    let eval = EvalContext {
        messages: &messages,
        agg: &agg,
        flags: &flags,
        config: &config,
        now,
        previous_state: ctx.previous_state,
        previous_evaluated_at: ctx.previous_evaluated_at,
        final_touch_sent_at: ctx.final_touch_sent_at,
        delivery_blocked: ctx.delivery_blocked,
        delivery_bounced: ctx.delivery_bounced,
    };

    let mut verdict = cascade::run(&eval);
    escalations::apply(&mut verdict, &eval);
    let resurrected = followup::apply_resurrection(&mut verdict, &eval);

    let mut result = InferenceResult {
        state: verdict.state,
        confidence: verdict.confidence,
        reasons: verdict.reasons,
        followup_due_at: verdict.followup_due_at,
        followup_suggestion: None,
        last_inbound_at: agg.last_inbound_at,
        last_outbound_at: agg.last_outbound_at,
        last_message_at: agg.last_message_at,
        message_count: agg.message_count,
        inbound_count: agg.inbound_count,
        outbound_count: agg.outbound_count,
        last_snippet: agg.last_snippet.clone(),
        resurrected,
        needs_followup: false,
        terminal_message_id: verdict.terminal_message_id,
    };
    followup::finalize(&mut result, &eval);

    info!(
        state = ?result.state,
        confidence = ?result.confidence,
        rule = verdict.rule,
        messages = result.message_count,
        resurrected = result.resurrected,
        "Resolved conversation state"
    );
    result
}

// ── Internal evaluation context ─────────────────────────────────────

/// Aggregates from one pass over the sorted messages.
///
/// Final-touch messages are excluded from counts and direction timestamps
/// but still feed last-message/snippet tracking.
#[derive(Debug, Default)]
pub(crate) struct Aggregates {
    pub message_count: usize,
    pub inbound_count: usize,
    pub outbound_count: usize,
    pub last_inbound_at: Option<DateTime<Utc>>,
    pub last_outbound_at: Option<DateTime<Utc>>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_snippet: Option<String>,
    pub last_non_final_idx: Option<usize>,
    pub last_inbound_idx: Option<usize>,
    pub last_deferral_hint_at: Option<DateTime<Utc>>,
    pub last_price_rejection_at: Option<DateTime<Utc>>,
    pub last_price_mention_at: Option<DateTime<Utc>>,
    pub last_indefinite_at: Option<DateTime<Utc>>,
}

/// Conversation-level context derived before the cascade runs.
#[derive(Debug, Default)]
pub(crate) struct ContextFlags {
    pub contact_ever: bool,
    /// An inbound message carried a deferral phrase with a concrete hint.
    pub explicit_deferral_date: bool,
    /// AI fallback candidates — set only when the explicit signal is absent.
    pub ai_handoff_idx: Option<usize>,
    pub ai_deferred_idx: Option<usize>,
    /// Contact info was shared and the thread went dark afterwards.
    pub off_platform_gone_dark: bool,
}

pub(crate) struct EvalContext<'a> {
    pub messages: &'a [AnnotatedMessage],
    pub agg: &'a Aggregates,
    pub flags: &'a ContextFlags,
    pub config: &'a InferenceConfig,
    pub now: DateTime<Utc>,
    pub previous_state: Option<ConversationState>,
    pub previous_evaluated_at: Option<DateTime<Utc>>,
    pub final_touch_sent_at: Option<DateTime<Utc>>,
    pub delivery_blocked: bool,
    pub delivery_bounced: bool,
}

fn aggregate(messages: &[AnnotatedMessage]) -> Aggregates {
    let mut agg = Aggregates::default();
    for (idx, msg) in messages.iter().enumerate() {
        let at = msg.message.created_at;
        agg.last_message_at = Some(at);
        agg.last_snippet = Some(snippet(msg.text()));

        if msg.is_final_touch() {
            continue;
        }
        agg.message_count += 1;
        agg.last_non_final_idx = Some(idx);
        if msg.is_inbound() {
            agg.inbound_count += 1;
            agg.last_inbound_at = Some(at);
            agg.last_inbound_idx = Some(idx);
            if msg.features.has_deferral_phrase && msg.features.deferral_date_hint.is_some() {
                agg.last_deferral_hint_at = Some(at);
            }
            if msg.features.has_price_rejection {
                agg.last_price_rejection_at = Some(at);
            }
            if msg.features.has_indefinite_deferral {
                agg.last_indefinite_at = Some(at);
            }
        } else {
            agg.outbound_count += 1;
            agg.last_outbound_at = Some(at);
        }
        if msg.features.has_price_mention {
            agg.last_price_mention_at = Some(at);
        }
    }
    agg
}

fn context_flags(messages: &[AnnotatedMessage]) -> ContextFlags {
    let mut flags = ContextFlags::default();

    flags.contact_ever = messages.iter().any(|m| m.features.has_contact_info);
    flags.explicit_deferral_date = messages.iter().any(|m| {
        m.is_inbound()
            && m.features.has_deferral_phrase
            && m.features.deferral_date_hint.is_some()
    });

    // AI is a fallback, never an override: candidates are considered only
    // when the corresponding explicit signal is absent.
    for (idx, msg) in messages.iter().enumerate() {
        if !msg.is_inbound() {
            continue;
        }
        let Some(interp) = msg.features.ai.as_ref().and_then(|ai| ai.interpretation())
        else {
            continue;
        };
        if !flags.contact_ever
            && interp.handoff.as_ref().is_some_and(|h| h.is_handoff)
        {
            flags.ai_handoff_idx = Some(idx);
        }
        if !flags.explicit_deferral_date
            && interp.deferred.as_ref().is_some_and(|d| d.is_deferred)
        {
            flags.ai_deferred_idx = Some(idx);
        }
    }

    // Off-platform: re-scan messages after the last contact-info message.
    // Continued two-way scheduling/contact chatter keeps the thread visible;
    // silence (or one-sided chatter) means it went dark.
    if let Some(idx) = messages
        .iter()
        .rposition(|m| m.features.has_contact_info)
    {
        let tail = &messages[idx + 1..];
        let tail_inbound = tail.iter().any(|m| m.is_inbound());
        let tail_outbound = tail.iter().any(|m| !m.is_inbound() && !m.is_final_touch());
        let tail_chatter = tail
            .iter()
            .any(|m| m.features.has_schedule_terms || m.features.has_contact_info);
        flags.off_platform_gone_dark = !(tail_inbound && tail_outbound && tail_chatter);
        debug!(
            gone_dark = flags.off_platform_gone_dark,
            tail_len = tail.len(),
            "Off-platform visibility rescan"
        );
    }

    flags
}

fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_CHARS).collect()
}
