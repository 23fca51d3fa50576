//! Ledger value coercion and adjustment-history reconstruction.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::models::{Direction, LedgerHistoryEntry, LedgerSnapshot, LEDGER_FIELDS};
use crate::normalize::{number_of, round_half_up, value_to_string};
use crate::normalize::timestamp::parse_loose_instant;
use crate::utils::{is_date_key, new_id};

/// Tolerant numeric parse of a ledger value: thousands separators stripped,
/// blank or unparseable input reads as zero.
pub fn to_number(raw: &Value) -> f64 {
    let text = match raw {
        Value::Null => return 0.0,
        Value::String(s) => s.replace(',', ""),
        other => value_to_string(other),
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Round a currency amount to 2 decimal places, half-up, with a small
/// epsilon bias to counter binary representation error. Never yields -0.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let rounded = round_half_up((value + f64::EPSILON) * 100.0) / 100.0;
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Coerce a raw ledger document to the fixed-field snapshot. Unknown keys
/// are discarded; the legacy `bankUkDebt` spelling folds into `debt` when
/// `debt` itself is blank.
pub fn normalize_ledger(raw: Option<&Value>) -> LedgerSnapshot {
    let mut snapshot = LedgerSnapshot::default();
    let Some(obj) = raw.and_then(Value::as_object) else {
        return snapshot;
    };
    for key in LEDGER_FIELDS {
        if let Some(value) = obj.get(key) {
            snapshot.set(key, value_to_string(value));
        }
    }
    if let Some(legacy) = obj.get("bankUkDebt") {
        let legacy = value_to_string(legacy);
        if snapshot.debt.is_empty() && !legacy.is_empty() {
            snapshot.debt = legacy;
        }
    }
    snapshot
}

/// Reconstruct a canonical `{direction, delta}` pair from the shapes
/// historical entries used: `delta`, `amount` + `direction`, or `value`.
fn resolve_delta(entry: &Value) -> Option<f64> {
    let base_subtract = entry.get("direction").and_then(Value::as_str) == Some("subtract");
    let numeric = if let Some(delta) = entry.get("delta").and_then(Value::as_f64) {
        delta
    } else if let Some(amount) = entry.get("amount").and_then(Value::as_f64) {
        if base_subtract { -amount } else { amount }
    } else if let Some(value) = entry.get("value").and_then(Value::as_f64) {
        value
    } else {
        entry.get("delta").and_then(|v| number_of(v))?
    };
    let rounded = if numeric.is_finite() { round2(numeric) } else { 0.0 };
    if rounded == 0.0 { None } else { Some(rounded) }
}

/// Rebuild the history-by-date map. Date keys failing the strict
/// `YYYY-MM-DD` check drop their whole group; zero-amount entries vanish;
/// per-date lists come out sorted ascending by creation instant.
pub fn normalize_ledger_history(
    raw: Option<&Value>,
    now_iso: &str,
) -> BTreeMap<String, Vec<LedgerHistoryEntry>> {
    let mut history = BTreeMap::new();
    let Some(map) = raw.and_then(Value::as_object) else {
        return history;
    };
    for (date, entries) in map {
        if !is_date_key(date) {
            continue;
        }
        let Some(entries) = entries.as_array() else {
            continue;
        };
        let mut normalized: Vec<LedgerHistoryEntry> = entries
            .iter()
            .filter_map(|entry| {
                entry.as_object()?;
                let field = entry
                    .get("field")
                    .and_then(Value::as_str)
                    .filter(|f| LEDGER_FIELDS.contains(f))?
                    .to_string();
                let rounded = resolve_delta(entry)?;
                let direction = if rounded < 0.0 { Direction::Subtract } else { Direction::Add };
                let delta = match direction {
                    Direction::Subtract => -rounded.abs(),
                    Direction::Add => rounded.abs(),
                };
                // kept verbatim whenever it reads as some instant, even
                // date-only; rewritten to now only when unreadable
                let created_at = entry
                    .get("createdAt")
                    .and_then(Value::as_str)
                    .filter(|s| parse_loose_instant(s).is_some())
                    .map(str::to_string)
                    .unwrap_or_else(|| now_iso.to_string());
                let id = entry
                    .get("id")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(new_id);
                Some(LedgerHistoryEntry {
                    id,
                    date: date.clone(),
                    field,
                    direction,
                    delta,
                    created_at,
                })
            })
            .collect();
        normalized.sort_by_key(|entry| {
            parse_loose_instant(&entry.created_at).map(|dt| dt.timestamp_millis()).unwrap_or(0)
        });
        if !normalized.is_empty() {
            history.insert(date.clone(), normalized);
        }
    }
    history
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn to_number_strips_separators() {
        assert_eq!(to_number(&json!("1,234.50")), 1234.5);
        assert_eq!(to_number(&json!("  ")), 0.0);
        assert_eq!(to_number(&json!("abc")), 0.0);
        assert_eq!(to_number(&json!(null)), 0.0);
        assert_eq!(to_number(&json!(-12.3)), -12.3);
    }

    #[test]
    fn round2_is_half_up_on_the_cent() {
        assert_eq!(round2(19.005), 19.01);
        assert_eq!(round2(2.675), 2.68);
        assert_eq!(round2(1.004), 1.0);
    }

    #[test]
    fn round2_never_yields_negative_zero() {
        let rounded = round2(-0.001);
        assert_eq!(rounded, 0.0);
        assert!(rounded.is_sign_positive());
    }

    #[test]
    fn ledger_keeps_known_fields_only() {
        let raw = json!({"alipay": 120.5, "wechat": null, "mystery": "9"});
        let snapshot = normalize_ledger(Some(&raw));
        assert_eq!(snapshot.alipay, "120.5");
        assert_eq!(snapshot.wechat, "");
        assert_eq!(snapshot.bank_cn, "");
    }

    #[test]
    fn legacy_bank_uk_debt_folds_into_debt() {
        let raw = json!({"bankUkDebt": "300"});
        assert_eq!(normalize_ledger(Some(&raw)).debt, "300");

        // an explicit debt value wins over the legacy spelling
        let raw = json!({"debt": "50", "bankUkDebt": "300"});
        assert_eq!(normalize_ledger(Some(&raw)).debt, "50");
    }

    const NOW: &str = "2024-06-01T12:00:00.000Z";

    #[test]
    fn history_reconstructs_each_legacy_shape() {
        let raw = json!({
            "2024-01-02": [
                {"field": "alipay", "delta": -3.0, "createdAt": "2024-01-02T10:00:00.000Z"},
                {"field": "wechat", "amount": 4.0, "direction": "subtract", "createdAt": "2024-01-02T09:00:00.000Z"},
                {"field": "bankCn", "value": 2.5, "createdAt": "2024-01-02T08:00:00.000Z"},
                {"field": "debt", "delta": "1.25", "createdAt": "2024-01-02T07:00:00.000Z"},
            ]
        });
        let history = normalize_ledger_history(Some(&raw), NOW);
        let entries = &history["2024-01-02"];
        assert_eq!(entries.len(), 4);
        // sorted ascending by createdAt
        assert_eq!(entries[0].delta, 1.25);
        assert_eq!(entries[0].direction, Direction::Add);
        assert_eq!(entries[1].delta, 2.5);
        assert_eq!(entries[2].delta, -4.0);
        assert_eq!(entries[2].direction, Direction::Subtract);
        assert_eq!(entries[3].delta, -3.0);
        assert_eq!(entries[3].direction, Direction::Subtract);
        for entry in entries {
            let expected = if entry.delta < 0.0 { Direction::Subtract } else { Direction::Add };
            assert_eq!(entry.direction, expected);
            assert_ne!(entry.delta, 0.0);
        }
    }

    #[test]
    fn zero_entries_and_bad_groups_are_dropped() {
        let raw = json!({
            "2024-01-02": [
                {"field": "alipay", "delta": 0.0},
                {"field": "nope", "delta": 5.0},
            ],
            "not-a-date": [{"field": "alipay", "delta": 5.0}],
            "2024-01-03": "not-an-array",
        });
        assert!(normalize_ledger_history(Some(&raw), NOW).is_empty());
    }

    #[test]
    fn date_only_created_at_is_kept_verbatim() {
        let raw = json!({
            "2024-03-05": [
                {"field": "alipay", "delta": 2.0, "createdAt": "2024-03-05T10:00:00.000Z", "id": "b"},
                {"field": "alipay", "delta": 5.0, "createdAt": "2024-03-05", "id": "a"},
            ]
        });
        let history = normalize_ledger_history(Some(&raw), NOW);
        let entries = &history["2024-03-05"];
        // midnight from the bare date sorts first, string untouched
        assert_eq!(entries[0].id, "a");
        assert_eq!(entries[0].created_at, "2024-03-05");
        assert_eq!(entries[1].id, "b");
    }

    #[test]
    fn missing_ids_and_timestamps_are_generated() {
        let raw = json!({"2024-01-02": [{"field": "alipay", "delta": 5.0, "createdAt": "junk"}]});
        let history = normalize_ledger_history(Some(&raw), NOW);
        let entry = &history["2024-01-02"][0];
        assert!(!entry.id.is_empty());
        assert_eq!(entry.created_at, NOW);
    }

    #[test]
    fn idempotent_on_canonical_output() {
        let raw = json!({
            "2024-01-02": [
                {"field": "alipay", "amount": 3.335, "direction": "subtract", "createdAt": "2024-01-02T10:00:00.000Z", "id": "a"},
            ]
        });
        let first = normalize_ledger_history(Some(&raw), NOW);
        let reserialized = serde_json::to_value(&first).unwrap();
        let second = normalize_ledger_history(Some(&reserialized), NOW);
        assert_eq!(first, second);
    }
}
