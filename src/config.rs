//! Inference configuration.
//!
//! All thresholds are per-tenant overridable; missing fields fall back to
//! documented defaults. The resolver always works on a [`InferenceConfig::clamped`]
//! copy so out-of-range values degrade to sane minimums instead of erroring.

use serde::{Deserialize, Serialize};

/// Numeric thresholds driving the conversation state resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Hours before an unanswered inbound message counts as an SLA breach.
    pub sla_hours: i64,
    /// Days after a price quote with no inbound activity before the
    /// conversation is considered lost.
    pub lost_after_price_days: i64,
    /// Days after a price rejection with no revival message before lost.
    pub lost_after_rejection_days: i64,
    /// Days after an AI-inferred off-platform handoff (no explicit contact
    /// info) before lost.
    pub lost_after_off_platform_days: i64,
    /// Days after an indefinite deferral ("someday") before lost.
    pub lost_after_indefinite_deferral_days: i64,
    /// Minimum inbound gap for a dormant conversation to come back to life.
    pub resurrect_gap_days: i64,
    /// Follow-up horizon for deferrals that carry no concrete date.
    pub default_defer_days: i64,
    /// Window ahead of a deferral due date in which follow-up is surfaced.
    pub due_soon_window_days: i64,
    /// Days of inbound silence after an unanswered outbound message before
    /// the conversation times out as lost.
    pub inactivity_timeout_days: i64,
    /// Business days (weekend-skipping) after an outbound message before a
    /// follow-up comes due.
    pub outbound_followup_business_days: i64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            sla_hours: 24,
            lost_after_price_days: 60,
            lost_after_rejection_days: 14,
            lost_after_off_platform_days: 21,
            lost_after_indefinite_deferral_days: 30,
            resurrect_gap_days: 30,
            default_defer_days: 7,
            due_soon_window_days: 3,
            inactivity_timeout_days: 30,
            outbound_followup_business_days: 2,
        }
    }
}

impl InferenceConfig {
    /// Copy of this config with every threshold floored at 1.
    ///
    /// Out-of-range tenant overrides are clamped, never rejected.
    pub fn clamped(&self) -> Self {
        Self {
            sla_hours: self.sla_hours.max(1),
            lost_after_price_days: self.lost_after_price_days.max(1),
            lost_after_rejection_days: self.lost_after_rejection_days.max(1),
            lost_after_off_platform_days: self.lost_after_off_platform_days.max(1),
            lost_after_indefinite_deferral_days: self
                .lost_after_indefinite_deferral_days
                .max(1),
            resurrect_gap_days: self.resurrect_gap_days.max(1),
            default_defer_days: self.default_defer_days.max(1),
            due_soon_window_days: self.due_soon_window_days.max(1),
            inactivity_timeout_days: self.inactivity_timeout_days.max(1),
            outbound_followup_business_days: self.outbound_followup_business_days.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_documented_values() {
        let config = InferenceConfig::default();
        assert_eq!(config.sla_hours, 24);
        assert_eq!(config.lost_after_price_days, 60);
        assert_eq!(config.resurrect_gap_days, 30);
        assert_eq!(config.default_defer_days, 7);
        assert_eq!(config.inactivity_timeout_days, 30);
        assert_eq!(config.outbound_followup_business_days, 2);
    }

    #[test]
    fn clamped_floors_thresholds_at_one() {
        let config = InferenceConfig {
            sla_hours: 0,
            lost_after_price_days: -5,
            resurrect_gap_days: 0,
            ..Default::default()
        };
        let clamped = config.clamped();
        assert_eq!(clamped.sla_hours, 1);
        assert_eq!(clamped.lost_after_price_days, 1);
        assert_eq!(clamped.resurrect_gap_days, 1);
        // In-range values pass through untouched.
        assert_eq!(clamped.default_defer_days, 7);
    }

    #[test]
    fn partial_override_deserializes_with_defaults() {
        let config: InferenceConfig =
            serde_json::from_str(r#"{"lost_after_price_days": 90}"#).unwrap();
        assert_eq!(config.lost_after_price_days, 90);
        assert_eq!(config.sla_hours, 24);
    }
}
