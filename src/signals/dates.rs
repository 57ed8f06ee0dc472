//! Relative/seasonal deferral date hints.
//!
//! The extractor reports hints as a small closed vocabulary, not raw dates;
//! the scheduler resolves a hint against a reference timestamp later.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, Months, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

static TOMORROW: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\btomorrow\b").unwrap());
static NEXT_WEEK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bnext week\b").unwrap());
static NEXT_MONTH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bnext month\b").unwrap());
static SEASON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:(this|next)\s+)?(spring|summer|fall|autumn|winter)\b").unwrap()
});
static IN_N: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bin\s+(\d{1,2}|a couple(?: of)?|a few|an?)\s+(day|week|month)s?\b").unwrap()
});

/// Season of the year, anchored to northern-hemisphere start months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    fn start_month(&self) -> u32 {
        match self {
            Self::Spring => 3,
            Self::Summer => 6,
            Self::Fall => 9,
            Self::Winter => 12,
        }
    }
}

/// Qualifier attached to a season reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonQualifier {
    This,
    Next,
    Bare,
}

/// Closed vocabulary of deferral date hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "hint", rename_all = "snake_case")]
pub enum DateHint {
    Tomorrow,
    NextWeek,
    NextMonth,
    Season {
        season: Season,
        qualifier: SeasonQualifier,
    },
    InDays { n: i64 },
    InWeeks { n: i64 },
    InMonths { n: i64 },
}

/// Parse the first recognizable date hint out of message text.
///
/// "in N …" wins over the looser tokens since it is the most specific form.
pub fn parse_date_hint(text: &str) -> Option<DateHint> {
    if let Some(caps) = IN_N.captures(text) {
        let n = match caps[1].to_lowercase().as_str() {
            "a" | "an" => 1,
            "a few" => 3,
            other if other.starts_with("a couple") => 2,
            digits => digits.parse().ok()?,
        };
        return Some(match caps[2].to_lowercase().as_str() {
            "day" => DateHint::InDays { n },
            "week" => DateHint::InWeeks { n },
            _ => DateHint::InMonths { n },
        });
    }
    if TOMORROW.is_match(text) {
        return Some(DateHint::Tomorrow);
    }
    if NEXT_WEEK.is_match(text) {
        return Some(DateHint::NextWeek);
    }
    if NEXT_MONTH.is_match(text) {
        return Some(DateHint::NextMonth);
    }
    if let Some(caps) = SEASON.captures(text) {
        let qualifier = match caps.get(1).map(|m| m.as_str().to_lowercase()) {
            Some(q) if q == "this" => SeasonQualifier::This,
            Some(q) if q == "next" => SeasonQualifier::Next,
            _ => SeasonQualifier::Bare,
        };
        let season = match caps[2].to_lowercase().as_str() {
            "spring" => Season::Spring,
            "summer" => Season::Summer,
            "fall" | "autumn" => Season::Fall,
            _ => Season::Winter,
        };
        return Some(DateHint::Season { season, qualifier });
    }
    None
}

/// Resolve a hint to a concrete due date relative to `reference`.
pub fn resolve_hint(hint: DateHint, reference: DateTime<Utc>) -> DateTime<Utc> {
    match hint {
        DateHint::Tomorrow => reference + Duration::days(1),
        DateHint::NextWeek => reference + Duration::days(7),
        DateHint::NextMonth => add_months(reference, 1),
        DateHint::InDays { n } => reference + Duration::days(n),
        DateHint::InWeeks { n } => reference + Duration::weeks(n),
        DateHint::InMonths { n } => add_months(reference, n),
        DateHint::Season { season, qualifier } => season_start(season, qualifier, reference),
    }
}

fn add_months(reference: DateTime<Utc>, n: i64) -> DateTime<Utc> {
    reference
        .checked_add_months(Months::new(n.clamp(0, 120) as u32))
        .unwrap_or(reference)
}

/// Start of the referenced season occurrence.
///
/// `this`/bare mean the next time that season starts; `next` skips one
/// occurrence when the season is currently in progress.
fn season_start(season: Season, qualifier: SeasonQualifier, reference: DateTime<Utc>) -> DateTime<Utc> {
    let month = season.start_month();
    let this_year = Utc
        .with_ymd_and_hms(reference.year(), month, 1, 0, 0, 0)
        .single()
        .unwrap_or(reference);
    let upcoming = if this_year > reference {
        this_year
    } else {
        add_months(this_year, 12)
    };

    // A season runs three months from its start.
    let in_progress = this_year <= reference && reference < add_months(this_year, 3);
    if qualifier == SeasonQualifier::Next && in_progress {
        add_months(this_year, 12)
    } else {
        upcoming
    }
}
