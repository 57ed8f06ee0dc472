//! Per-message feature extraction.
//!
//! Turns one message's text + direction into a structured signal record.
//! Pure and infallible: absent matches yield `false`/`None`, a missing body
//! is treated as empty. The AI sub-record is attached externally by the
//! caller and never recomputed here.

pub mod dates;
pub mod explicit_lost;
pub(crate) mod patterns;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ai::AiAnnotation;
use crate::types::Direction;

pub use dates::{parse_date_hint, resolve_hint, DateHint, Season, SeasonQualifier};
pub use explicit_lost::{classify_explicit_lost, ExplicitLost, LostReasonCode};

/// Minimum body length for the long-rant spam heuristic.
const SPAM_CONTENT_MIN_CHARS: usize = 180;

/// Minimum distinct conspiracy/fraud vocabulary hits for spam content.
const SPAM_CONTENT_MIN_VOCAB: usize = 2;

/// Maximum length of an ack-only message.
const ACK_ONLY_MAX_CHARS: usize = 60;

/// Structured signal record for one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub has_contact_info: bool,
    pub has_price_mention: bool,
    pub has_opt_out: bool,
    pub has_schedule_terms: bool,
    pub has_deferral_phrase: bool,
    pub deferral_date_hint: Option<DateHint>,
    pub has_conversion_phrase: bool,
    pub has_loss_phrase: bool,
    pub has_spam_phrase: bool,
    pub has_spam_content: bool,
    pub has_price_rejection: bool,
    pub has_indefinite_deferral: bool,
    pub has_link: bool,
    pub message_length: usize,
    pub is_ack_only: bool,
    pub explicit_lost: Option<ExplicitLost>,
    /// Copied from the message verbatim; see [`crate::ai`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai: Option<AiAnnotation>,
}

/// Extract all deterministic signals from message text.
///
/// Explicit-lost, ack-only, price-rejection, indefinite-deferral, and
/// spam-content are inbound-only: outbound business copy must never
/// self-trigger loss/spam states.
pub fn extract_features(text: Option<&str>, direction: Direction) -> FeatureRecord {
    let text = text.unwrap_or("");
    let inbound = direction == Direction::Inbound;

    // Strip link text before phone matching so URL digits don't read as
    // phone numbers.
    let link_stripped = patterns::LINK.replace_all(text, " ");
    let has_contact_info =
        patterns::PHONE.is_match(&link_stripped) || patterns::EMAIL.is_match(&link_stripped);

    FeatureRecord {
        has_contact_info,
        has_price_mention: patterns::CURRENCY.is_match(text)
            || patterns::PRICE_TERMS.is_match(text),
        has_opt_out: patterns::OPT_OUT.is_match(text),
        has_schedule_terms: patterns::SCHEDULE_TERMS.is_match(text),
        has_deferral_phrase: patterns::DEFERRAL.is_match(text),
        deferral_date_hint: parse_date_hint(text),
        has_conversion_phrase: patterns::CONVERSION.is_match(text),
        has_loss_phrase: patterns::LOSS.is_match(text),
        has_spam_phrase: patterns::SPAM_PHRASE.is_match(text),
        has_spam_content: inbound && is_spam_content(text),
        has_price_rejection: inbound && is_price_rejection(text),
        has_indefinite_deferral: inbound && patterns::INDEFINITE_DEFERRAL.is_match(text),
        has_link: patterns::LINK.is_match(text),
        message_length: text.chars().count(),
        is_ack_only: inbound && is_ack_only(text),
        explicit_lost: if inbound {
            classify_explicit_lost(text)
        } else {
            None
        },
        ai: None,
    }
}

/// Price rejection: explicit phrases, or a softened/typo'd combination of a
/// "too much"/"have to wait" token with price context or a polite decline.
fn is_price_rejection(text: &str) -> bool {
    if patterns::PRICE_REJECTION_EXPLICIT.is_match(text) {
        return true;
    }
    let softened =
        patterns::TOO_MUCH.is_match(text) || patterns::HAVE_TO_WAIT.is_match(text);
    softened
        && (patterns::PRICE_CONTEXT.is_match(text) || patterns::POLITE_DECLINE.is_match(text))
}

/// Short, intent-free gratitude/closing utterance. Must not carry a question
/// or scheduling/price keywords — those revive a conversation.
fn is_ack_only(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty()
        && trimmed.chars().count() <= ACK_ONLY_MAX_CHARS
        && !trimmed.contains('?')
        && !patterns::SCHEDULE_TERMS.is_match(trimmed)
        && !patterns::PRICE_TERMS.is_match(trimmed)
        && !patterns::CURRENCY.is_match(trimmed)
        && patterns::ACK_ONLY.is_match(trimmed)
}

/// Long-rant spam heuristic. Deliberately conservative: a long message with
/// repeated fraud vocabulary, no question, and no product intent.
fn is_spam_content(text: &str) -> bool {
    if text.chars().count() < SPAM_CONTENT_MIN_CHARS
        || text.contains('?')
        || patterns::PRODUCT_INTENT.is_match(text)
    {
        return false;
    }
    let distinct: HashSet<String> = patterns::SPAM_VOCAB
        .captures_iter(text)
        .map(|caps| caps[1].to_lowercase())
        .collect();
    distinct.len() >= SPAM_CONTENT_MIN_VOCAB
}
