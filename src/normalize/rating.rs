//! Day-rating normalization and the emptiness rule. The two numeric slots
//! and the commit note share one invariant: a rating with nothing in it is
//! deleted, never stored as a zero-valued placeholder.

use serde_json::Value;

use crate::models::DayRating;
use crate::normalize::{first_present, round_half_up, value_to_string};

/// Legacy spellings of the commit-note field, in resolution priority order.
const COMMIT_SYNONYMS: [&str; 6] = ["commit", "note", "summary", "notes", "commitNote", "commitText"];

fn rating_slot(raw: Option<&Value>) -> Option<i64> {
    let value = raw?;
    if value.is_null() {
        return None;
    }
    let trimmed = value_to_string(value);
    let trimmed = trimmed.trim();
    if trimmed.is_empty() {
        return None;
    }
    let numeric: f64 = trimmed.parse().ok()?;
    if !numeric.is_finite() {
        return None;
    }
    Some(round_half_up(numeric).clamp(0.0, 10.0) as i64)
}

/// Coerce a raw rating slot to its canonical string form: a clamped
/// integer in [0,10], or "" when blank or unparseable.
pub fn normalize_rating_value(raw: Option<&Value>) -> String {
    rating_slot(raw).map(|v| v.to_string()).unwrap_or_default()
}

/// Build the canonical rating record from a raw object. Returns None when
/// the record has no usable date key.
pub fn normalize_day_rating(raw: &Value) -> Option<DayRating> {
    let date = raw.get("date").map(value_to_string).unwrap_or_default();
    if date.is_empty() {
        return None;
    }
    let commit_source = first_present(raw, &COMMIT_SYNONYMS).unwrap_or_default();
    Some(DayRating {
        date,
        work_time: normalize_rating_value(raw.get("workTime")),
        training_time: normalize_rating_value(raw.get("trainingTime")),
        // trailing whitespace only; interior formatting is user content
        commit: commit_source.trim_end().to_string(),
    })
}

/// The emptiness rule: no work time, no training time, and no non-blank
/// commit text. Empty ratings must be deleted rather than persisted.
pub fn is_day_rating_empty(rating: &DayRating) -> bool {
    rating.work_time.trim().is_empty()
        && rating.training_time.trim().is_empty()
        && rating.commit.trim().is_empty()
}
