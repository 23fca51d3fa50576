//! Record normalization: tolerant coercion of loosely-typed, possibly-legacy
//! persisted records into the canonical shapes in [`crate::models`].
//!
//! Every normalizer here follows the same policy: never fail. Unrecognized
//! shapes resolve through synonym chains, missing timestamps are inferred,
//! and records left without meaningful content are dropped rather than
//! reported as errors. Re-running any normalizer on its own output is a
//! no-op (modulo regeneration of absent ids).

pub mod ledger;
pub mod log;
pub mod rating;
pub mod records;
pub mod timestamp;

pub use ledger::{normalize_ledger, normalize_ledger_history, round2, to_number};
pub use log::normalize_log;
pub use rating::{is_day_rating_empty, normalize_day_rating, normalize_rating_value};
pub use records::{
    normalize_journal_entry, normalize_settings, normalize_todo, normalize_workspace,
};
pub use timestamp::{iso_instant, normalize_timestamp};

use serde_json::Value;

/// Stringify a raw value the way the historical documents did: null becomes
/// the empty string, scalars keep their plain form.
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// First key present on `obj` with a non-null value, stringified.
/// Mirrors a nullish-coalescing synonym chain: empty strings count.
pub(crate) fn first_present(obj: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match obj.get(key) {
            None | Some(Value::Null) => continue,
            Some(value) => return Some(value_to_string(value)),
        }
    }
    None
}

/// First key on `obj` whose value is "truthy": a non-empty string, a
/// non-zero number, or `true`. Returns the stringified value.
pub(crate) fn first_truthy(obj: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(value) = obj.get(key)
            && is_truthy(value)
        {
            return Some(value_to_string(value));
        }
    }
    None
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Numeric reading of a raw value: numbers pass through, numeric strings
/// parse after trimming. Anything else is None.
pub(crate) fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    }
}

/// Round half-up toward positive infinity, matching the arithmetic every
/// historical revision of the app used.
pub(crate) fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn present_chain_keeps_empty_strings() {
        let obj = json!({"commit": "", "note": "fallback"});
        assert_eq!(first_present(&obj, &["commit", "note"]), Some(String::new()));
    }

    #[test]
    fn truthy_chain_skips_empty_strings() {
        let obj = json!({"note": "", "detail": "kept"});
        assert_eq!(first_truthy(&obj, &["note", "detail"]), Some("kept".into()));
        assert_eq!(first_truthy(&obj, &["note"]), None);
    }

    #[test]
    fn number_of_parses_strings() {
        assert_eq!(number_of(&json!(" 12.5 ")), Some(12.5));
        assert_eq!(number_of(&json!("abc")), None);
        assert_eq!(number_of(&json!(3)), Some(3.0));
        assert_eq!(number_of(&json!(null)), None);
    }
}
