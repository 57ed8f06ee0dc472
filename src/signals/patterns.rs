//! Static pattern catalog for the feature extractor.
//!
//! Every table is a compiled, immutable `LazyLock<Regex>` — no runtime
//! mutation, no per-call reconstruction. Patterns are matched against raw
//! message text except where noted (phone matching runs on link-stripped
//! text).

use std::sync::LazyLock;

use regex::Regex;

fn compiled(pattern: &str) -> Regex {
    // Patterns are fixed string literals; a failure here is a programming
    // error caught by the catalog test below.
    Regex::new(pattern).unwrap()
}

// ── Contact info ────────────────────────────────────────────────────

pub static LINK: LazyLock<Regex> =
    LazyLock::new(|| compiled(r"(?i)\b(?:https?://|www\.)\S+"));

pub static PHONE: LazyLock<Regex> =
    LazyLock::new(|| compiled(r"\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b"));

pub static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| compiled(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b"));

// ── Price and currency ──────────────────────────────────────────────

pub static CURRENCY: LazyLock<Regex> = LazyLock::new(|| {
    compiled(r"(?i)\$\s*\d[\d,]*(?:\.\d+)?|\b\d[\d,]*\s?(?:dollars|bucks|usd)\b")
});

pub static PRICE_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    compiled(
        r"(?i)\b(?:price|prices|pricing|priced|cost|costs|quote|quoted|estimate|budget|how much|charge|charges|rate|rates)\b",
    )
});

// ── Opt-out / scheduling / deferral ─────────────────────────────────

pub static OPT_OUT: LazyLock<Regex> = LazyLock::new(|| {
    compiled(
        r"(?i)\b(?:unsubscribe|stop (?:texting|messaging|contacting)|do not contact|don'?t contact me|remove me from|take me off|stop reaching out|no more (?:messages|emails|texts))\b",
    )
});

pub static SCHEDULE_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    compiled(
        r"(?i)\b(?:schedule|scheduling|appointment|come (?:by|out|over)|stop by|swing by|visit|meet(?:ing)?|what time|time works|available|availability|calendar|book(?:ing)?|reschedule)\b",
    )
});

pub static DEFERRAL: LazyLock<Regex> = LazyLock::new(|| {
    compiled(
        r"(?i)\b(?:follow up|follow-up|check back|circle back|reach (?:back )?out|get back to (?:me|you|us)|touch base|try (?:me|us) (?:again|later)|maybe later|not yet|contact (?:me|us) (?:again|later|in))\b",
    )
});

pub static INDEFINITE_DEFERRAL: LazyLock<Regex> = LazyLock::new(|| {
    compiled(
        r"(?i)\b(?:someday|some day|at some point|down the road|eventually|not any\s?time soon|no timeline|when (?:we|i)(?:'re| are| am)? ready|far (?:off|out)|on hold for now|indefinitely|in the (?:distant )?future)\b",
    )
});

// ── Conversion / loss / spam ────────────────────────────────────────

pub static CONVERSION: LazyLock<Regex> = LazyLock::new(|| {
    compiled(
        r"(?i)\b(?:let'?s (?:do it|move forward|proceed|go ahead)|move forward with|ready to (?:move forward|proceed|sign|book)|where do i sign|sign (?:me|us) up|we(?:'ll| will) take it|you(?:'re| are) hired|we accept|going ahead with (?:it|the)|we went ahead)\b",
    )
});

/// Platform notices that merely announce lead assignment. These contain
/// proceed-sounding copy and must never count as conversions.
pub static ASSIGNMENT_NOTICE: LazyLock<Regex> = LazyLock::new(|| {
    compiled(
        r"(?i)\b(?:has been assigned|you have been assigned|new lead assigned|lead assignment|automatically assigned)\b",
    )
});

pub static LOSS: LazyLock<Regex> = LazyLock::new(|| {
    compiled(
        r"(?i)\b(?:not interested|no longer interested|lost interest|went with (?:someone|somebody|another)|going with (?:someone|somebody|another)|found (?:someone|somebody) else|chose (?:another|a different)|all set now|no longer need|don'?t need (?:it|this|the\w*) anymore)\b",
    )
});

pub static SPAM_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    compiled(
        r"(?i)\b(?:this is spam|report(?:ing)? (?:you|this|fraud)|scam(?:mer)?s?|phishing|fraud(?:ster)?s?|pyramid scheme|fake (?:company|business)|stop spamming)\b",
    )
});

/// Conspiracy/fraud vocabulary for the long-rant heuristic. Distinct hits are
/// counted, so the alternation captures single normalized tokens.
pub static SPAM_VOCAB: LazyLock<Regex> = LazyLock::new(|| {
    compiled(
        r"(?i)\b(fraud|scam|lawsuit|sue|police|fbi|government|conspiracy|bitcoin|crypto|wire transfer|gift card|inheritance|lottery|prince|illuminati|microchip|hoax)\b",
    )
});

/// Genuine-inquiry vocabulary that disqualifies the spam-content heuristic.
pub static PRODUCT_INTENT: LazyLock<Regex> = LazyLock::new(|| {
    compiled(
        r"(?i)\b(?:price|quote|estimate|install(?:ation)?|repair|service|appointment|schedule|buy|purchase|order|interested in|availability)\b",
    )
});

// ── Price rejection ─────────────────────────────────────────────────

pub static PRICE_REJECTION_EXPLICIT: LazyLock<Regex> = LazyLock::new(|| {
    compiled(
        r"(?i)\b(?:out of (?:my|our) price range|can(?:no|')t afford|couldn'?t afford|too expensive|way too expensive|over (?:my|our) budget|beyond (?:my|our) budget|more than (?:i|we) (?:can|want to) spend)\b",
    )
});

/// "Too much"-style token, tolerant of common typos and digit substitution
/// ("to much", "2 much", "too mch").
pub static TOO_MUCH: LazyLock<Regex> =
    LazyLock::new(|| compiled(r"(?i)\b(?:to{1,2}|t0|2)\s*mu?c?h\b"));

pub static HAVE_TO_WAIT: LazyLock<Regex> = LazyLock::new(|| {
    compiled(
        r"(?i)\b(?:have to wait|need to wait|going to wait|gonna wait|we(?:'ll| will) wait|wait a while|hold off)\b",
    )
});

pub static PRICE_CONTEXT: LazyLock<Regex> = LazyLock::new(|| {
    compiled(
        r"(?i)\b(?:price|cost|quote|estimate|money|expensive|budget|afford|pay|payment|spend)\b",
    )
});

pub static POLITE_DECLINE: LazyLock<Regex> = LazyLock::new(|| {
    compiled(
        r"(?i)\b(?:no thank(?:s| you)|we(?:'ll| will) pass|(?:i|we) pass|gonna pass|have to pass|pass for now|sorry)\b",
    )
});

// ── Ack-only ────────────────────────────────────────────────────────

/// Full-message match: one or more gratitude/closing tokens and punctuation,
/// nothing else.
pub static ACK_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    compiled(
        r"(?i)^[\s[:punct:]]*(?:(?:ok(?:ay)?|k|kk|thanks?|thank you(?: so much| very much)?|thx|ty|got it|sounds good|will do|perfect|great|awesome|cool|no problem|np|you(?:'re| are) welcome|sure|alright|all right|bye|goodbye|good ?night|have a (?:good|great) (?:day|night|one|weekend)|appreciate (?:it|you)|cheers|talk soon|take care)[\s[:punct:]]*)+$",
    )
});

/// Dimensional/contextual vocabulary corroborating a feasibility objection.
pub static DIMENSION: LazyLock<Regex> = LazyLock::new(|| {
    compiled(
        r"(?i)\b(?:\d+\s*(?:x|by)\s*\d+|\d+\s*(?:inch(?:es)?|in\.|feet|foot|ft|cm|mm|meters?)|sq\.?\s?ft|square (?:feet|footage)|dimensions?|measure(?:d|ments?)?|clearance|width|height|depth)\b",
    )
});
