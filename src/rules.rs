//! Rule-hit builder.
//!
//! Deterministic mapping from a feature record to named rule tags. Purely
//! advisory annotations — the resolver checks tags with [`RuleHits::contains`]
//! instead of re-inspecting raw text. Order is emission order, duplicates
//! suppressed.

use serde::{Deserialize, Serialize};

use crate::signals::FeatureRecord;

/// Rule tags in the order the builder emits them.
pub mod tag {
    pub const PHONE_OR_EMAIL: &str = "PHONE_OR_EMAIL";
    pub const PRICE_MENTION: &str = "PRICE_MENTION";
    pub const OPT_OUT: &str = "OPT_OUT";
    pub const SCHEDULE_TERMS: &str = "SCHEDULE_TERMS";
    pub const DEFERRAL_PHRASE: &str = "DEFERRAL_PHRASE";
    pub const DEFERRAL_DATE: &str = "DEFERRAL_DATE";
    pub const CONVERSION_PHRASE: &str = "CONVERSION_PHRASE";
    pub const LOSS_PHRASE: &str = "LOSS_PHRASE";
    pub const SPAM_PHRASE: &str = "SPAM_PHRASE";
    pub const SPAM_CONTENT: &str = "SPAM_CONTENT";
    pub const PRICE_REJECTION: &str = "PRICE_REJECTION";
    pub const INDEFINITE_DEFERRAL: &str = "INDEFINITE_DEFERRAL";
    pub const LINK: &str = "LINK";
    pub const ACK_ONLY: &str = "ACK_ONLY";
    /// Composite: price rejection and indefinite deferral on one message.
    pub const WAIT_TO_PROCEED: &str = "WAIT_TO_PROCEED";
    /// Composite prefix for the explicit-lost sub-classifier.
    pub const EXPLICIT_PREFIX: &str = "EXPLICIT_";
}

/// Ordered, deduplicated set of rule tags for one message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleHits {
    tags: Vec<String>,
}

impl RuleHits {
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|existing| existing == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    fn push(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.contains(&tag) {
            self.tags.push(tag);
        }
    }
}

/// Map a feature record onto rule tags.
pub fn build_rule_hits(features: &FeatureRecord) -> RuleHits {
    let mut hits = RuleHits::default();
    let pairs: [(bool, &str); 14] = [
        (features.has_contact_info, tag::PHONE_OR_EMAIL),
        (features.has_price_mention, tag::PRICE_MENTION),
        (features.has_opt_out, tag::OPT_OUT),
        (features.has_schedule_terms, tag::SCHEDULE_TERMS),
        (features.has_deferral_phrase, tag::DEFERRAL_PHRASE),
        (features.deferral_date_hint.is_some(), tag::DEFERRAL_DATE),
        (features.has_conversion_phrase, tag::CONVERSION_PHRASE),
        (features.has_loss_phrase, tag::LOSS_PHRASE),
        (features.has_spam_phrase, tag::SPAM_PHRASE),
        (features.has_spam_content, tag::SPAM_CONTENT),
        (features.has_price_rejection, tag::PRICE_REJECTION),
        (features.has_indefinite_deferral, tag::INDEFINITE_DEFERRAL),
        (features.has_link, tag::LINK),
        (features.is_ack_only, tag::ACK_ONLY),
    ];
    for (fired, name) in pairs {
        if fired {
            hits.push(name);
        }
    }

    if features.has_price_rejection && features.has_indefinite_deferral {
        hits.push(tag::WAIT_TO_PROCEED);
    }
    if let Some(lost) = &features.explicit_lost {
        hits.push(format!("{}{}", tag::EXPLICIT_PREFIX, lost.reason_code.tag()));
    }

    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::extract_features;
    use crate::types::Direction;

    fn hits_for(text: &str) -> RuleHits {
        build_rule_hits(&extract_features(Some(text), Direction::Inbound))
    }

    #[test]
    fn simple_one_to_one_mapping() {
        let hits = hits_for("Call me at 415-555-1212 about the quote");
        assert!(hits.contains(tag::PHONE_OR_EMAIL));
        assert!(hits.contains(tag::PRICE_MENTION));
        assert!(!hits.contains(tag::SPAM_PHRASE));
    }

    #[test]
    fn emission_order_is_stable_not_sorted() {
        let hits = hits_for("Call me at 415-555-1212 about the quote");
        let tags: Vec<&str> = hits.iter().collect();
        assert_eq!(tags, vec![tag::PHONE_OR_EMAIL, tag::PRICE_MENTION]);
    }

    #[test]
    fn wait_to_proceed_composite() {
        let hits = hits_for("too much money for now, we'll revisit someday");
        assert!(hits.contains(tag::PRICE_REJECTION));
        assert!(hits.contains(tag::INDEFINITE_DEFERRAL));
        assert!(hits.contains(tag::WAIT_TO_PROCEED));
    }

    #[test]
    fn explicit_lost_composite_tag() {
        let hits = hits_for("it's out of my price range");
        assert!(hits.contains("EXPLICIT_LOST_PRICE_OUT_OF_RANGE"));
    }

    #[test]
    fn quiet_message_has_no_hits() {
        let hits = hits_for("hello there");
        assert!(hits.is_empty());
    }
}
