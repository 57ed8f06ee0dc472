//! Follow-up scheduling and resurrection.

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use tracing::debug;

use crate::types::{reason, AnnotatedMessage, ConversationState, InferenceResult, Reason};

use super::cascade::Verdict;
use super::EvalContext;

/// Follow-up suggestion copy.
pub const SUGGEST_FOLLOW_UP_NOW: &str = "Follow up now";
pub const SUGGEST_FOLLOW_UP_LATER: &str = "Follow up later";
pub const SUGGEST_REPLY: &str = "Reply recommended";
pub const SUGGEST_VISIBILITY_LOST: &str =
    "Conversation moved off platform; direct visibility lost";

/// Resurrection check, independent of the cascade.
///
/// True only when a dormant (LOST/DEFERRED/OFF_PLATFORM) evaluation exists,
/// the newest inbound message is not ack-only, and the gap between that
/// inbound and the previous evaluation exceeds the resurrection threshold.
/// After a final touch the inbound must additionally show renewed intent.
pub(crate) fn apply_resurrection(verdict: &mut Verdict, ctx: &EvalContext<'_>) -> bool {
    if !check_resurrection(ctx) {
        return false;
    }
    // Only non-dormant, non-terminal cascade outcomes surface as RESURRECTED;
    // a thread that came back and immediately deferred or converted keeps
    // that state, with the flag still set.
    if matches!(
        verdict.state,
        ConversationState::New
            | ConversationState::Engaged
            | ConversationState::Productive
            | ConversationState::HighlyProductive
            | ConversationState::PriceGiven
    ) {
        verdict.state = ConversationState::Resurrected;
        verdict.reasons.push(Reason::simple(reason::RESURRECTED));
        debug!("Dormant conversation resurrected");
    }
    true
}

fn check_resurrection(ctx: &EvalContext<'_>) -> bool {
    let dormant = ctx.previous_state.is_some_and(|s| s.is_dormant());
    let Some(previous_at) = ctx.previous_evaluated_at else {
        return false;
    };
    if !dormant {
        return false;
    }
    let Some(idx) = ctx.agg.last_inbound_idx else {
        return false;
    };
    let inbound = &ctx.messages[idx];
    if inbound.features.is_ack_only {
        return false;
    }
    if inbound.message.created_at - previous_at <= Duration::days(ctx.config.resurrect_gap_days)
    {
        return false;
    }
    // A final touch was the business's last word; coming back requires more
    // than small talk.
    if ctx.final_touch_sent_at.is_some() && !renewed_intent(inbound) {
        return false;
    }
    true
}

fn renewed_intent(msg: &AnnotatedMessage) -> bool {
    msg.features.has_price_mention
        || msg.features.has_schedule_terms
        || msg.features.has_deferral_phrase
        || msg.features.deferral_date_hint.is_some()
}

/// Derive follow-up fields on the final result. Terminal states always clear
/// them and retroactively strip reply-pressure reasons.
pub(crate) fn finalize(result: &mut InferenceResult, ctx: &EvalContext<'_>) {
    if result.state.is_terminal() {
        result.followup_due_at = None;
        result.followup_suggestion = None;
        result.needs_followup = false;
        result
            .reasons
            .retain(|r| r.code() != reason::UNREPLIED && r.code() != reason::SLA_BREACH);
        return;
    }

    match result.state {
        ConversationState::Deferred => {
            let due = result.followup_due_at.unwrap_or_else(|| {
                ctx.now + Duration::days(ctx.config.default_defer_days)
            });
            result.followup_due_at = Some(due);
            result.followup_suggestion = Some(if due <= ctx.now {
                SUGGEST_FOLLOW_UP_NOW.to_string()
            } else {
                SUGGEST_FOLLOW_UP_LATER.to_string()
            });
            result.needs_followup =
                due <= ctx.now + Duration::days(ctx.config.due_soon_window_days);
        }
        ConversationState::OffPlatform => {
            result.followup_due_at = None;
            result.followup_suggestion = Some(SUGGEST_VISIBILITY_LOST.to_string());
            result.needs_followup = false;
        }
        _ => {
            let Some(idx) = ctx.agg.last_non_final_idx else {
                return;
            };
            let last = &ctx.messages[idx];
            if last.is_inbound() {
                result.followup_suggestion = Some(SUGGEST_REPLY.to_string());
                result.needs_followup = true;
                result.followup_due_at =
                    Some(last.message.created_at + Duration::hours(ctx.config.sla_hours));
                result.reasons.push(Reason::simple(reason::UNREPLIED));
                if ctx.now - last.message.created_at > Duration::hours(ctx.config.sla_hours) {
                    result.reasons.push(Reason::simple(reason::SLA_BREACH));
                }
            } else {
                let due = add_business_days(
                    last.message.created_at,
                    ctx.config.outbound_followup_business_days,
                );
                result.followup_due_at = Some(due);
                if ctx.now >= due {
                    result.followup_suggestion = Some(SUGGEST_FOLLOW_UP_NOW.to_string());
                    result.needs_followup = true;
                } else {
                    result.followup_suggestion = Some(SUGGEST_FOLLOW_UP_LATER.to_string());
                    result.needs_followup = false;
                }
            }
        }
    }
}

/// Advance `n` business days, skipping Saturdays and Sundays.
pub fn add_business_days(start: DateTime<Utc>, n: i64) -> DateTime<Utc> {
    let mut current = start;
    let mut remaining = n.max(0);
    while remaining > 0 {
        current += Duration::days(1);
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            remaining -= 1;
        }
    }
    current
}
