//! Post-cascade staleness escalations.
//!
//! Each escalation re-examines the conversation after the primary cascade
//! and may override a non-terminal state to LOST. They run in a fixed order;
//! once a terminal state is reached the remaining escalations are inert.

use chrono::Duration;
use tracing::debug;

use crate::types::{reason, Confidence, ConversationState, Reason};

use super::cascade::Verdict;
use super::EvalContext;

pub(crate) fn apply(verdict: &mut Verdict, ctx: &EvalContext<'_>) {
    let escalations: [(&str, fn(&mut Verdict, &EvalContext<'_>) -> bool); 5] = [
        ("stale_price_rejection", stale_price_rejection),
        ("stale_off_platform", stale_off_platform),
        ("stale_indefinite_deferral", stale_indefinite_deferral),
        ("inactivity_timeout", inactivity_timeout),
        ("stale_price_quote", stale_price_quote),
    ];
    for (name, escalation) in escalations {
        if verdict.state.is_terminal() {
            return;
        }
        if escalation(verdict, ctx) {
            debug!(escalation = name, "Escalated to LOST");
            verdict.rule = "escalation";
        }
    }
}

fn escalate(verdict: &mut Verdict, tag: &str) -> bool {
    verdict.state = ConversationState::Lost;
    verdict.confidence = Confidence::Medium;
    verdict.reasons.push(Reason::simple(tag));
    verdict.followup_due_at = None;
    true
}

/// A price rejection that never saw a qualifying revival message goes lost
/// once the rejection window elapses. Ack-only replies do not revive.
fn stale_price_rejection(verdict: &mut Verdict, ctx: &EvalContext<'_>) -> bool {
    let Some(rejected_at) = ctx.agg.last_price_rejection_at else {
        return false;
    };
    let revived = ctx.messages.iter().any(|m| {
        m.is_inbound() && !m.features.is_ack_only && m.message.created_at > rejected_at
    });
    if revived || ctx.now - rejected_at <= Duration::days(ctx.config.lost_after_rejection_days) {
        return false;
    }
    escalate(verdict, reason::STALE_PRICE_REJECTION)
}

/// An AI-inferred handoff (no explicit contact info) cannot be verified, so
/// prolonged silence after it means lost rather than parked.
fn stale_off_platform(verdict: &mut Verdict, ctx: &EvalContext<'_>) -> bool {
    if verdict.state != ConversationState::OffPlatform || ctx.flags.contact_ever {
        return false;
    }
    let Some(last_at) = ctx.agg.last_message_at else {
        return false;
    };
    if ctx.now - last_at <= Duration::days(ctx.config.lost_after_off_platform_days) {
        return false;
    }
    escalate(verdict, reason::STALE_OFF_PLATFORM_HANDOFF)
}

fn stale_indefinite_deferral(verdict: &mut Verdict, ctx: &EvalContext<'_>) -> bool {
    if ctx.flags.explicit_deferral_date {
        return false;
    }
    let Some(deferred_at) = ctx.agg.last_indefinite_at else {
        return false;
    };
    let revived = ctx.messages.iter().any(|m| {
        m.is_inbound() && !m.features.is_ack_only && m.message.created_at > deferred_at
    });
    if revived
        || ctx.now - deferred_at
            <= Duration::days(ctx.config.lost_after_indefinite_deferral_days)
    {
        return false;
    }
    escalate(verdict, reason::STALE_INDEFINITE_DEFERRAL)
}

/// Inbound-inactivity timeout: the business sent the last message, nothing
/// is scheduled, and the customer has been silent past the window. Produces
/// a single synthetic reason, discarding whatever the cascade found.
fn inactivity_timeout(verdict: &mut Verdict, ctx: &EvalContext<'_>) -> bool {
    let Some(idx) = ctx.agg.last_non_final_idx else {
        return false;
    };
    if ctx.messages[idx].is_inbound() {
        return false;
    }
    if verdict.followup_due_at.is_some_and(|due| due > ctx.now) {
        return false;
    }
    let reference = ctx.agg.last_inbound_at.or(ctx.agg.last_outbound_at);
    let Some(reference) = reference else {
        return false;
    };
    if ctx.now - reference <= Duration::days(ctx.config.inactivity_timeout_days) {
        return false;
    }
    verdict.reasons.clear();
    escalate(verdict, reason::LOST_INACTIVE_TIMEOUT)
}

fn stale_price_quote(verdict: &mut Verdict, ctx: &EvalContext<'_>) -> bool {
    if verdict.state != ConversationState::PriceGiven {
        return false;
    }
    let Some(quoted_at) = ctx.agg.last_price_mention_at else {
        return false;
    };
    if ctx.now - quoted_at <= Duration::days(ctx.config.lost_after_price_days) {
        return false;
    }
    escalate(verdict, reason::STALE_PRICE_QUOTE)
}
