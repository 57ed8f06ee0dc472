//! End-to-end conversation scenarios against the full resolver pipeline.
//!
//! Each test builds a thread of raw messages, resolves it with a fixed
//! injected clock, and asserts on the public output contract.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use thread_triage::ai::{
    AiAnnotation, AiMode, AiOutcome, DeferralBucket, DeferredInterpretation,
    HandoffInterpretation, Interpretation,
};
use thread_triage::signals::extract_features;
use thread_triage::{
    resolve, Confidence, ConversationContext, ConversationState, Direction, InferenceConfig,
    InferenceResult, Message, MessageKind,
};

/// Fixed anchor: 2026-02-02 is a Monday.
fn anchor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 2, 9, 0, 0).unwrap()
}

fn message(id: &str, direction: Direction, text: &str, at: DateTime<Utc>) -> Message {
    Message {
        id: id.to_string(),
        direction,
        text: Some(text.to_string()),
        created_at: at,
        kind: MessageKind::Standard,
        ai: None,
    }
}

fn inbound(id: &str, text: &str, at: DateTime<Utc>) -> Message {
    message(id, Direction::Inbound, text, at)
}

fn outbound(id: &str, text: &str, at: DateTime<Utc>) -> Message {
    message(id, Direction::Outbound, text, at)
}

fn resolve_at(messages: Vec<Message>, now: DateTime<Utc>) -> InferenceResult {
    let ctx = ConversationContext {
        messages,
        now: Some(now),
        ..Default::default()
    };
    resolve(&ctx, &InferenceConfig::default())
}

fn reason_codes(result: &InferenceResult) -> Vec<String> {
    result.reasons.iter().map(|r| r.code().to_string()).collect()
}

// ── Named scenarios ─────────────────────────────────────────────────

#[test]
fn lone_spam_rant_is_spam_even_weeks_later() {
    let sent = anchor();
    let result = resolve_at(
        vec![inbound("m1", "This is spam, report fraud now.", sent)],
        sent + Duration::days(42),
    );

    assert_eq!(result.state, ConversationState::Spam);
    let codes = reason_codes(&result);
    assert!(codes.iter().any(|c| c == "SPAM_PHRASE_MATCH"));
    assert!(codes.iter().any(|c| c == "SPAM_CONTEXT_CONFIRMED"));
    assert_eq!(result.terminal_message_id.as_deref(), Some("m1"));
}

#[test]
fn lone_phone_number_moves_off_platform() {
    let sent = anchor();
    let result = resolve_at(
        vec![inbound("m1", "Call me at (415) 555-1212.", sent)],
        sent + Duration::days(2),
    );

    assert_eq!(result.state, ConversationState::OffPlatform);
    assert_eq!(result.confidence, Confidence::High);
    let codes = reason_codes(&result);
    assert!(codes.iter().any(|c| c == "PHONE_OR_EMAIL"));
    assert!(codes.iter().any(|c| c == "OFF_PLATFORM_HANDOFF"));
    // Visibility is gone: no due date, no follow-up pressure.
    assert_eq!(result.followup_due_at, None);
    assert!(!result.needs_followup);
    assert!(result.followup_suggestion.is_some());
}

#[test]
fn stale_outbound_price_quote_times_out_to_lost() {
    let quoted = anchor();
    let result = resolve_at(
        vec![outbound(
            "m1",
            "We can do the full job for $1,450 including materials.",
            quoted,
        )],
        quoted + Duration::days(61),
    );

    assert_eq!(result.state, ConversationState::Lost);
    assert_eq!(reason_codes(&result), vec!["LOST_INACTIVE_TIMEOUT"]);
    assert_eq!(result.followup_suggestion, None);
    assert_eq!(result.followup_due_at, None);
    assert!(!result.needs_followup);
}

#[test]
fn price_range_objection_is_lost_with_matching_feature_code() {
    let sent = anchor();
    let text = "Thanks for the quote but it's out of my price range.";
    let result = resolve_at(vec![inbound("m1", text, sent)], sent + Duration::days(1));

    assert_eq!(result.state, ConversationState::Lost);
    assert!(reason_codes(&result)
        .iter()
        .any(|c| c == "LOST_PRICE_OUT_OF_RANGE"));

    // The extractor classifies the same message with the same code.
    let features = extract_features(Some(text), Direction::Inbound);
    let lost = features.explicit_lost.as_ref().unwrap();
    assert_eq!(lost.reason_code.tag(), "LOST_PRICE_OUT_OF_RANGE");
}

#[test]
fn follow_up_next_week_defers_about_seven_days() {
    let sent = anchor();
    let result = resolve_at(
        vec![inbound("m1", "Please follow up next week.", sent)],
        sent + Duration::days(1),
    );

    assert_eq!(result.state, ConversationState::Deferred);
    assert_eq!(result.confidence, Confidence::High);
    assert!(result.followup_suggestion.is_some());
    assert_eq!(result.followup_due_at, Some(sent + Duration::days(7)));
    let codes = reason_codes(&result);
    assert!(codes.iter().any(|c| c == "DEFERRAL_PHRASE"));
    assert!(codes.iter().any(|c| c == "DEFERRAL_DATE"));
}

#[test]
fn ack_after_price_rejection_does_not_revive() {
    let rejected = anchor();
    let result = resolve_at(
        vec![
            inbound("m1", "That's too much for us, we'll have to pass.", rejected),
            inbound("m2", "Thank you!", rejected + Duration::days(1)),
        ],
        rejected + Duration::days(20),
    );

    assert_eq!(result.state, ConversationState::Lost);
    assert!(reason_codes(&result)
        .iter()
        .any(|c| c == "STALE_PRICE_REJECTION"));
    assert!(!result.resurrected);
}

#[test]
fn long_rant_without_spam_phrase_flags_spam_content() {
    let sent = anchor();
    let rant = "Everyone needs to know what this company is really doing. The government \
                and the police refuse to act because of the conspiracy behind all of it, \
                and the lawsuit money keeps flowing to the same people. They demand wire \
                transfer payments and gift card codes from elderly folks and nobody does \
                a thing. Wake up people.";
    let result = resolve_at(vec![inbound("m1", rant, sent)], sent + Duration::days(1));

    assert_eq!(result.state, ConversationState::Spam);
    let codes = reason_codes(&result);
    assert!(codes.iter().any(|c| c == "SPAM_CONTENT"));
    assert!(codes.iter().any(|c| c == "SPAM_CONTEXT_CONFIRMED"));
    assert!(!codes.iter().any(|c| c == "SPAM_PHRASE_MATCH"));
}

// ── AI fallback ─────────────────────────────────────────────────────

fn deferred_annotation(
    bucket: Option<DeferralBucket>,
    due_date_iso: Option<&str>,
) -> AiAnnotation {
    AiAnnotation {
        mode: AiMode::Deferred,
        model_id: Some("small-fast".to_string()),
        attempted: true,
        outcome: AiOutcome::Executed {
            interpretation: Interpretation {
                handoff: None,
                deferred: Some(DeferredInterpretation {
                    is_deferred: true,
                    bucket,
                    due_date_iso: due_date_iso.map(str::to_string),
                    confidence: Confidence::Medium,
                    evidence: Some("regrouping after the holidays".to_string()),
                }),
            },
        },
        errors: vec![],
    }
}

fn handoff_annotation() -> AiAnnotation {
    AiAnnotation {
        mode: AiMode::Handoff,
        model_id: Some("small-fast".to_string()),
        attempted: true,
        outcome: AiOutcome::Executed {
            interpretation: Interpretation {
                handoff: Some(HandoffInterpretation {
                    is_handoff: true,
                    handoff_type: Some("phone".to_string()),
                    confidence: Confidence::Medium,
                    evidence: Some("you know how to get hold of me".to_string()),
                }),
                deferred: None,
            },
        },
        errors: vec![],
    }
}

#[test]
fn ai_deferral_bucket_maps_to_due_date() {
    let sent = anchor();
    let mut msg = inbound("m1", "We're regrouping after the holidays.", sent);
    msg.ai = Some(deferred_annotation(Some(DeferralBucket::NextMonth), None));
    let result = resolve_at(vec![msg], sent + Duration::days(1));

    assert_eq!(result.state, ConversationState::Deferred);
    assert_eq!(result.confidence, Confidence::Medium);
    assert_eq!(result.followup_due_at, Some(sent + Duration::days(30)));
    assert!(reason_codes(&result).iter().any(|c| c == "AI_DEFERRED"));
}

#[test]
fn ai_deferral_literal_date_wins_over_bucket() {
    let sent = anchor();
    let mut msg = inbound("m1", "We're regrouping after the holidays.", sent);
    msg.ai = Some(deferred_annotation(
        Some(DeferralBucket::NextWeek),
        Some("2026-03-15"),
    ));
    let result = resolve_at(vec![msg], sent + Duration::days(1));

    assert_eq!(result.state, ConversationState::Deferred);
    assert_eq!(
        result.followup_due_at,
        Some(Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap())
    );
}

#[test]
fn ai_handoff_without_contact_info_moves_off_platform() {
    let sent = anchor();
    let mut msg = inbound("m1", "You know how to get hold of me.", sent);
    msg.ai = Some(handoff_annotation());
    let result = resolve_at(vec![msg], sent + Duration::days(2));

    assert_eq!(result.state, ConversationState::OffPlatform);
    assert_eq!(result.confidence, Confidence::Medium);
    assert!(reason_codes(&result).iter().any(|c| c == "AI_HANDOFF"));
    assert_eq!(result.followup_due_at, None);
    assert!(!result.needs_followup);
}

// ── Staleness escalations ───────────────────────────────────────────

#[test]
fn silent_ai_handoff_goes_lost_past_window() {
    let sent = anchor();
    let mut msg = inbound("m1", "You know how to get hold of me.", sent);
    msg.ai = Some(handoff_annotation());
    let result = resolve_at(vec![msg], sent + Duration::days(22));

    assert_eq!(result.state, ConversationState::Lost);
    assert!(reason_codes(&result)
        .iter()
        .any(|c| c == "STALE_OFF_PLATFORM_HANDOFF"));
    assert_eq!(result.followup_suggestion, None);
}

#[test]
fn stale_indefinite_deferral_escalates_to_lost() {
    let sent = anchor();
    let messages = vec![inbound(
        "m1",
        "We might do this at some point but there's no timeline.",
        sent,
    )];

    // Inside the window the thread just sits deferred.
    let fresh = resolve_at(messages.clone(), sent + Duration::days(10));
    assert_eq!(fresh.state, ConversationState::Deferred);
    assert!(reason_codes(&fresh).iter().any(|c| c == "INDEFINITE_DEFERRAL"));

    let stale = resolve_at(messages, sent + Duration::days(31));
    assert_eq!(stale.state, ConversationState::Lost);
    assert!(reason_codes(&stale)
        .iter()
        .any(|c| c == "STALE_INDEFINITE_DEFERRAL"));
}

#[test]
fn customer_last_price_quote_goes_stale_lost() {
    let quoted = anchor();
    let replied = quoted + Duration::days(1);
    let messages = vec![
        outbound("m1", "We can do it for $2,300 all in.", quoted),
        inbound("m2", "Thanks, I'll look over the quote.", replied),
    ];

    // The customer replied last, so this never times out as plain
    // inactivity; it stays PRICE_GIVEN until the quote window lapses.
    let fresh = resolve_at(messages.clone(), replied + Duration::days(30));
    assert_eq!(fresh.state, ConversationState::PriceGiven);

    let stale = resolve_at(messages, replied + Duration::days(61));
    assert_eq!(stale.state, ConversationState::Lost);
    let codes = reason_codes(&stale);
    assert!(codes.iter().any(|c| c == "STALE_PRICE_QUOTE"));
    assert!(!codes.iter().any(|c| c == "LOST_INACTIVE_TIMEOUT"));
}

// ── Resurrection ────────────────────────────────────────────────────

#[test]
fn dormant_thread_resurrects_on_substantive_inbound_after_gap() {
    let previous_at = anchor();
    let revival = previous_at + Duration::days(40);
    let ctx = ConversationContext {
        messages: vec![inbound(
            "m1",
            "Do you still have availability? What's your price?",
            revival,
        )],
        previous_state: Some(ConversationState::Deferred),
        previous_evaluated_at: Some(previous_at),
        now: Some(revival + Duration::hours(1)),
        ..Default::default()
    };
    let result = resolve(&ctx, &InferenceConfig::default());

    assert!(result.resurrected);
    assert_eq!(result.state, ConversationState::Resurrected);
    assert!(reason_codes(&result).iter().any(|c| c == "RESURRECTED"));
}

#[test]
fn ack_only_inbound_never_resurrects() {
    let previous_at = anchor();
    let revival = previous_at + Duration::days(40);
    let ctx = ConversationContext {
        messages: vec![inbound("m1", "Thanks!", revival)],
        previous_state: Some(ConversationState::Lost),
        previous_evaluated_at: Some(previous_at),
        now: Some(revival + Duration::hours(1)),
        ..Default::default()
    };
    let result = resolve(&ctx, &InferenceConfig::default());

    assert!(!result.resurrected);
    assert_ne!(result.state, ConversationState::Resurrected);
}

#[test]
fn short_gap_inbound_does_not_resurrect() {
    let previous_at = anchor();
    let revival = previous_at + Duration::days(10);
    let ctx = ConversationContext {
        messages: vec![inbound("m1", "Still thinking about the quote.", revival)],
        previous_state: Some(ConversationState::Lost),
        previous_evaluated_at: Some(previous_at),
        now: Some(revival + Duration::hours(1)),
        ..Default::default()
    };
    let result = resolve(&ctx, &InferenceConfig::default());

    assert!(!result.resurrected);
}

// ── Engagement ladder and follow-up pressure ────────────────────────

#[test]
fn engagement_tiers_track_reply_depth() {
    let t = anchor();
    let exchange = |n: usize| -> Vec<Message> {
        let mut messages = Vec::new();
        for i in 0..n {
            let base = t + Duration::hours(2 * i as i64);
            messages.push(inbound(&format!("in{i}"), "Sounds good so far.", base));
            messages.push(outbound(
                &format!("out{i}"),
                "Great, more details attached.",
                base + Duration::hours(1),
            ));
        }
        messages
    };

    let one = resolve_at(exchange(1), t + Duration::days(1));
    assert_eq!(one.state, ConversationState::Engaged);
    let two = resolve_at(exchange(2), t + Duration::days(1));
    assert_eq!(two.state, ConversationState::Productive);
    let four = resolve_at(exchange(4), t + Duration::days(1));
    assert_eq!(four.state, ConversationState::HighlyProductive);
}

#[test]
fn unanswered_inbound_breaches_sla() {
    let sent = anchor();
    let result = resolve_at(
        vec![
            outbound("m1", "Happy to help with the install.", sent),
            inbound(
                "m2",
                "What would the install run me?",
                sent + Duration::hours(1),
            ),
        ],
        sent + Duration::hours(30),
    );

    assert!(result.needs_followup);
    assert_eq!(
        result.followup_due_at,
        Some(sent + Duration::hours(1) + Duration::hours(24))
    );
    let codes = reason_codes(&result);
    assert!(codes.iter().any(|c| c == "UNREPLIED"));
    assert!(codes.iter().any(|c| c == "SLA_BREACH"));
}

#[test]
fn outbound_tail_schedules_business_day_followup() {
    // Friday outbound; two business days later is Tuesday.
    let friday = Utc.with_ymd_and_hms(2026, 2, 6, 9, 0, 0).unwrap();
    let messages = vec![
        inbound("m1", "Can you send more details?", friday - Duration::hours(2)),
        outbound("m2", "Sure, details attached.", friday),
    ];

    let result = resolve_at(messages.clone(), friday + Duration::hours(5));
    assert_eq!(result.followup_due_at, Some(friday + Duration::days(4)));
    assert!(!result.needs_followup);

    let later = resolve_at(messages, friday + Duration::days(5));
    assert!(later.needs_followup);
    assert_eq!(later.followup_suggestion.as_deref(), Some("Follow up now"));
}

// ── Invariants ──────────────────────────────────────────────────────

#[test]
fn direction_gated_signals_never_fire_on_outbound() {
    let texts = [
        "Thank you!",
        "it's out of my price range",
        "that's too much, we'll have to pass",
        "maybe someday down the road",
        "This is spam, report fraud now.",
    ];
    for text in texts {
        let features = extract_features(Some(text), Direction::Outbound);
        assert!(!features.is_ack_only, "ack-only set on outbound {text:?}");
        assert!(features.explicit_lost.is_none());
        assert!(!features.has_price_rejection);
        assert!(!features.has_indefinite_deferral);
        assert!(!features.has_spam_content);
    }
}

#[test]
fn state_and_confidence_stay_within_the_contract() {
    let states = [
        "NEW",
        "ENGAGED",
        "PRODUCTIVE",
        "HIGHLY_PRODUCTIVE",
        "PRICE_GIVEN",
        "DEFERRED",
        "OFF_PLATFORM",
        "CONVERTED",
        "RESURRECTED",
        "LOST",
        "SPAM",
    ];
    let confidences = ["HIGH", "MEDIUM", "LOW"];

    let t = anchor();
    let threads = vec![
        vec![outbound("a", "Reaching out about your request.", t)],
        vec![inbound("a", "How much for the whole job?", t)],
        vec![inbound("a", "unsubscribe", t)],
        vec![inbound("a", "Let's move forward, where do I sign?", t)],
        vec![inbound("a", "Call me at 415-555-1212", t)],
    ];
    for thread in threads {
        let result = resolve_at(thread, t + Duration::days(1));
        let json = serde_json::to_value(&result).unwrap();
        let state = json["state"].as_str().unwrap();
        let confidence = json["confidence"].as_str().unwrap();
        assert!(states.contains(&state), "unexpected state {state}");
        assert!(
            confidences.contains(&confidence),
            "unexpected confidence {confidence}"
        );
    }
}

#[test]
fn resolution_is_idempotent_for_identical_inputs() {
    let t = anchor();
    let ctx = ConversationContext {
        messages: vec![
            inbound("m1", "Could you quote the repair?", t),
            outbound("m2", "Around $800 depending on parts.", t + Duration::hours(2)),
            inbound("m3", "Ok, follow up next week please.", t + Duration::hours(5)),
        ],
        now: Some(t + Duration::days(2)),
        ..Default::default()
    };
    let config = InferenceConfig::default();

    let first = serde_json::to_string(&resolve(&ctx, &config)).unwrap();
    let second = serde_json::to_string(&resolve(&ctx, &config)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn terminal_states_clear_followup_fields() {
    let t = anchor();
    let terminal_threads = vec![
        vec![inbound("a", "unsubscribe", t)],
        vec![inbound("a", "This is spam, report fraud now.", t)],
        vec![inbound("a", "Let's move forward, where do I sign?", t)],
        vec![inbound("a", "We went with another company, not interested.", t)],
    ];
    for thread in terminal_threads {
        let result = resolve_at(thread, t + Duration::days(1));
        assert!(result.state.is_terminal(), "expected terminal, got {:?}", result.state);
        assert_eq!(result.followup_suggestion, None);
        assert!(!result.needs_followup);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["followup_suggestion"], Value::Null);
    }
}

#[test]
fn unsorted_input_resolves_like_sorted_input() {
    let t = anchor();
    let sorted = vec![
        inbound("m1", "Could you quote the repair?", t),
        outbound("m2", "Around $800 depending on parts.", t + Duration::hours(2)),
        inbound("m3", "Thanks, sounds good!", t + Duration::hours(5)),
    ];
    let mut shuffled = sorted.clone();
    shuffled.swap(0, 2);

    let a = resolve_at(sorted, t + Duration::days(1));
    let b = resolve_at(shuffled, t + Duration::days(1));
    assert_eq!(a, b);
}

#[test]
fn final_touch_is_excluded_from_counts_but_tracked_as_activity() {
    let t = anchor();
    let mut touch = outbound("ft", "Last check-in before we close this out.", t + Duration::days(3));
    touch.kind = MessageKind::FinalTouch;
    let result = resolve_at(
        vec![inbound("m1", "How much for the repair?", t), touch],
        t + Duration::days(4),
    );

    assert_eq!(result.message_count, 1);
    assert_eq!(result.outbound_count, 0);
    assert_eq!(result.last_message_at, Some(t + Duration::days(3)));
}
