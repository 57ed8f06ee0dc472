//! Priority cascade: ordered (predicate, outcome-builder) rules, first match
//! wins. Each rule is a standalone function so precedence stays auditable and
//! every rule is independently testable.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::signals::explicit_lost::has_dimensional_context;
use crate::signals::{patterns, resolve_hint, LostReasonCode};
use crate::types::{reason, AnnotatedMessage, Confidence, ConversationState, Reason};

use super::EvalContext;

/// Outcome of the cascade (and later stages that refine it).
#[derive(Debug)]
pub(crate) struct Verdict {
    pub state: ConversationState,
    pub confidence: Confidence,
    pub reasons: Vec<Reason>,
    pub followup_due_at: Option<DateTime<Utc>>,
    pub terminal_message_id: Option<String>,
    /// Name of the matched rule, for logging and audit.
    pub rule: &'static str,
}

impl Verdict {
    fn new(state: ConversationState, confidence: Confidence, rule: &'static str) -> Self {
        Self {
            state,
            confidence,
            reasons: Vec::new(),
            followup_due_at: None,
            terminal_message_id: None,
            rule,
        }
    }

    fn with_reason(mut self, reason: Reason) -> Self {
        self.reasons.push(reason);
        self
    }

    fn triggered_by(mut self, msg: &AnnotatedMessage) -> Self {
        self.terminal_message_id = Some(msg.message.id.clone());
        self
    }
}

type RuleFn = for<'a> fn(&EvalContext<'a>) -> Option<Verdict>;

/// The cascade, in precedence order.
const CASCADE: &[(&str, RuleFn)] = &[
    ("opt_out", opt_out),
    ("blocked_by_recipient", blocked_by_recipient),
    ("delivery_bounced", delivery_bounced),
    ("confirmed_spam", confirmed_spam),
    ("conversion", conversion),
    ("explicit_lost", explicit_lost),
    ("loss_phrase", loss_phrase),
    ("indefinite_deferral", indefinite_deferral),
    ("off_platform", off_platform),
    ("deferral", deferral),
    ("price_mention", price_mention),
    ("engagement_depth", engagement_depth),
];

pub(crate) fn run(ctx: &EvalContext<'_>) -> Verdict {
    for (name, rule) in CASCADE {
        if let Some(verdict) = rule(ctx) {
            debug!(rule = name, state = ?verdict.state, "Cascade rule matched");
            return verdict;
        }
    }
    Verdict::new(ConversationState::New, Confidence::Low, "new_conversation")
        .with_reason(Reason::simple(reason::NEW_CONVERSATION))
}

// ── Rules ───────────────────────────────────────────────────────────

fn latest_inbound<'a>(
    ctx: &'a EvalContext<'_>,
    predicate: impl Fn(&AnnotatedMessage) -> bool,
) -> Option<&'a AnnotatedMessage> {
    ctx.messages
        .iter()
        .rev()
        .find(|m| m.is_inbound() && predicate(m))
}

fn opt_out(ctx: &EvalContext<'_>) -> Option<Verdict> {
    let msg = latest_inbound(ctx, |m| m.features.has_opt_out)?;
    Some(
        Verdict::new(ConversationState::Lost, Confidence::High, "opt_out")
            .with_reason(Reason::simple(reason::OPT_OUT))
            .triggered_by(msg),
    )
}

fn blocked_by_recipient(ctx: &EvalContext<'_>) -> Option<Verdict> {
    ctx.delivery_blocked.then(|| {
        Verdict::new(ConversationState::Lost, Confidence::High, "blocked")
            .with_reason(Reason::simple(reason::BLOCKED_BY_RECIPIENT))
    })
}

fn delivery_bounced(ctx: &EvalContext<'_>) -> Option<Verdict> {
    ctx.delivery_bounced.then(|| {
        Verdict::new(ConversationState::Lost, Confidence::High, "bounced")
            .with_reason(Reason::simple(reason::DELIVERY_BOUNCED))
    })
}

/// Spam phrase or long-rant content, confirmed by context: the message must
/// not sit at the tail of an active back-and-forth, must not itself be a
/// resurrection candidate of a dormant thread, and must lack
/// price/schedule/product vocabulary.
fn confirmed_spam(ctx: &EvalContext<'_>) -> Option<Verdict> {
    let msg = latest_inbound(ctx, |m| {
        m.features.has_spam_phrase || m.features.has_spam_content
    })?;

    let active_back_and_forth = ctx.agg.inbound_count >= 2 && ctx.agg.outbound_count >= 2;
    if active_back_and_forth {
        return None;
    }
    let revival_candidate = ctx.previous_state.is_some_and(|s| s.is_dormant())
        && ctx.previous_evaluated_at.is_some_and(|prev| {
            msg.message.created_at > prev
                && msg.message.created_at - prev
                    > Duration::days(ctx.config.resurrect_gap_days)
        });
    if revival_candidate {
        return None;
    }
    let text = msg.text();
    if msg.features.has_price_mention
        || msg.features.has_schedule_terms
        || patterns::PRODUCT_INTENT.is_match(text)
    {
        return None;
    }

    let phrase_reason = if msg.features.has_spam_phrase {
        reason::SPAM_PHRASE_MATCH
    } else {
        reason::SPAM_CONTENT
    };
    Some(
        Verdict::new(ConversationState::Spam, Confidence::High, "confirmed_spam")
            .with_reason(Reason::simple(phrase_reason))
            .with_reason(Reason::simple(reason::SPAM_CONTEXT_CONFIRMED))
            .triggered_by(msg),
    )
}

/// Conversion phrase anywhere in the thread, ignoring platform assignment
/// notices that merely sound like proceeding.
fn conversion(ctx: &EvalContext<'_>) -> Option<Verdict> {
    let msg = ctx.messages.iter().rev().find(|m| {
        m.features.has_conversion_phrase && !patterns::ASSIGNMENT_NOTICE.is_match(m.text())
    })?;
    Some(
        Verdict::new(ConversationState::Converted, Confidence::High, "conversion")
            .with_reason(Reason::simple(reason::CONVERSION_PHRASE))
            .triggered_by(msg),
    )
}

/// Explicit-lost sub-classification from the most recent inbound evidence.
///
/// Two codes carry extra context checks at this level: feasibility needs
/// dimensional corroboration somewhere in the thread, and timing-not-now is
/// suppressed when future-intent signals are also present (the deferral rules
/// own that case).
fn explicit_lost(ctx: &EvalContext<'_>) -> Option<Verdict> {
    let msg = latest_inbound(ctx, |m| m.features.explicit_lost.is_some())?;
    let lost = msg.features.explicit_lost.as_ref()?;

    match lost.reason_code {
        LostReasonCode::Feasibility => {
            let corroborated = ctx.messages.iter().any(|m| has_dimensional_context(m.text()));
            if !corroborated {
                return None;
            }
        }
        LostReasonCode::TimingNotNow => {
            let future_intent = ctx.messages.iter().any(|m| {
                m.is_inbound()
                    && (m.features.has_deferral_phrase
                        || m.features.deferral_date_hint.is_some()
                        || m.features.has_indefinite_deferral)
            });
            if future_intent {
                return None;
            }
        }
        _ => {}
    }

    Some(
        Verdict::new(ConversationState::Lost, lost.confidence, "explicit_lost")
            .with_reason(Reason::evidenced(
                lost.reason_code.tag(),
                lost.confidence,
                lost.evidence.clone(),
            ))
            .triggered_by(msg),
    )
}

fn loss_phrase(ctx: &EvalContext<'_>) -> Option<Verdict> {
    let msg = latest_inbound(ctx, |m| m.features.has_loss_phrase)?;
    Some(
        Verdict::new(ConversationState::Lost, Confidence::Medium, "loss_phrase")
            .with_reason(Reason::simple(reason::LOSS_PHRASE))
            .triggered_by(msg),
    )
}

/// Indefinite deferral without any concrete date anywhere in the thread.
fn indefinite_deferral(ctx: &EvalContext<'_>) -> Option<Verdict> {
    if ctx.flags.explicit_deferral_date {
        return None;
    }
    let msg = latest_inbound(ctx, |m| m.features.has_indefinite_deferral)?;
    let due = msg.message.created_at + Duration::days(ctx.config.default_defer_days);

    let mut verdict =
        Verdict::new(ConversationState::Deferred, Confidence::Low, "indefinite_deferral")
            .with_reason(Reason::simple(reason::INDEFINITE_DEFERRAL));
    if msg.features.has_price_rejection {
        verdict = verdict.with_reason(Reason::simple(reason::WAIT_TO_PROCEED));
    }
    verdict.followup_due_at = Some(due);
    Some(verdict)
}

/// Off-platform handoff: explicit contact info followed by silence, or an
/// AI-inferred handoff when no explicit contact info exists.
fn off_platform(ctx: &EvalContext<'_>) -> Option<Verdict> {
    if ctx.flags.contact_ever {
        if !ctx.flags.off_platform_gone_dark {
            return None;
        }
        return Some(
            Verdict::new(ConversationState::OffPlatform, Confidence::High, "off_platform")
                .with_reason(Reason::simple(reason::PHONE_OR_EMAIL))
                .with_reason(Reason::simple(reason::OFF_PLATFORM_HANDOFF)),
        );
    }

    let idx = ctx.flags.ai_handoff_idx?;
    let msg = &ctx.messages[idx];
    let handoff = msg
        .features
        .ai
        .as_ref()
        .and_then(|ai| ai.interpretation())
        .and_then(|i| i.handoff.as_ref())?;
    Some(
        Verdict::new(
            ConversationState::OffPlatform,
            handoff.confidence,
            "ai_off_platform",
        )
        .with_reason(Reason::evidenced(
            reason::AI_HANDOFF,
            handoff.confidence,
            handoff.evidence.clone().unwrap_or_default(),
        )),
    )
}

/// Deferral: explicit phrase (optionally with a date hint), or the AI
/// interpretation as a fallback. Mutually exclusive — explicit wins.
fn deferral(ctx: &EvalContext<'_>) -> Option<Verdict> {
    if let Some(msg) = latest_inbound(ctx, |m| m.features.has_deferral_phrase) {
        let mut verdict = if msg.features.deferral_date_hint.is_some() {
            Verdict::new(ConversationState::Deferred, Confidence::High, "deferral")
                .with_reason(Reason::simple(reason::DEFERRAL_PHRASE))
                .with_reason(Reason::simple(reason::DEFERRAL_DATE))
        } else {
            Verdict::new(ConversationState::Deferred, Confidence::Medium, "deferral")
                .with_reason(Reason::simple(reason::DEFERRAL_PHRASE))
        };
        verdict.followup_due_at = Some(match msg.features.deferral_date_hint {
            Some(hint) => resolve_hint(hint, msg.message.created_at),
            None => msg.message.created_at + Duration::days(ctx.config.default_defer_days),
        });
        return Some(verdict);
    }

    let idx = ctx.flags.ai_deferred_idx?;
    let msg = &ctx.messages[idx];
    let deferred = msg
        .features
        .ai
        .as_ref()
        .and_then(|ai| ai.interpretation())
        .and_then(|i| i.deferred.as_ref())?;

    let due = deferred
        .due_date_iso
        .as_deref()
        .and_then(parse_due_date)
        .or_else(|| {
            deferred
                .bucket
                .map(|bucket| msg.message.created_at + Duration::days(bucket.days()))
        })
        .unwrap_or_else(|| {
            msg.message.created_at + Duration::days(ctx.config.default_defer_days)
        });

    let mut verdict =
        Verdict::new(ConversationState::Deferred, deferred.confidence, "ai_deferral")
            .with_reason(Reason::evidenced(
                reason::AI_DEFERRED,
                deferred.confidence,
                deferred.evidence.clone().unwrap_or_default(),
            ));
    verdict.followup_due_at = Some(due);
    Some(verdict)
}

fn price_mention(ctx: &EvalContext<'_>) -> Option<Verdict> {
    ctx.messages
        .iter()
        .any(|m| m.features.has_price_mention && !m.is_final_touch())
        .then(|| {
            Verdict::new(ConversationState::PriceGiven, Confidence::Medium, "price_mention")
                .with_reason(Reason::simple(reason::PRICE_DISCUSSED))
        })
}

/// Engagement depth tiers from inbound/outbound reply counts.
fn engagement_depth(ctx: &EvalContext<'_>) -> Option<Verdict> {
    let inbound = ctx.agg.inbound_count;
    let outbound = ctx.agg.outbound_count;
    if inbound >= 4 && outbound >= 4 {
        return Some(
            Verdict::new(
                ConversationState::HighlyProductive,
                Confidence::High,
                "highly_productive",
            )
            .with_reason(Reason::simple(reason::HIGHLY_PRODUCTIVE_THREAD)),
        );
    }
    if inbound >= 2 && outbound >= 2 {
        return Some(
            Verdict::new(ConversationState::Productive, Confidence::Medium, "productive")
                .with_reason(Reason::simple(reason::PRODUCTIVE_THREAD)),
        );
    }
    if inbound >= 1 && outbound >= 1 {
        return Some(
            Verdict::new(ConversationState::Engaged, Confidence::Medium, "engaged")
                .with_reason(Reason::simple(reason::ENGAGED_THREAD)),
        );
    }
    None
}

/// Unparsable timestamps are treated as absent, never fatal.
fn parse_due_date(iso: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(iso) {
        return Some(parsed.with_timezone(&Utc));
    }
    let parsed = chrono::NaiveDate::parse_from_str(iso, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .map(|dt| dt.and_utc());
    if parsed.is_none() {
        warn!(due_date = iso, "Discarding unparsable AI due date");
    }
    parsed
}
