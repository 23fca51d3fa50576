//! Research-log and step normalization: reconciling six revisions of the
//! step schema into one canonical shape.
//!
//! The step rules run in a fixed order: the `Code/URL:` marker split first,
//! then the legacy `Time HH:MM • ...` prefix strip. The strip keeps the
//! original note when removing the prefix would leave it blank.

use serde_json::Value;

use crate::models::{LogStep, ResearchLog, SequenceEntry, SequenceKind};
use crate::normalize::timestamp::normalize_timestamp;
use crate::normalize::{first_truthy, is_truthy, value_to_string};
use crate::utils::new_id;

/// Marker that historically delimited an inline code/URL suffix.
const CODE_MARKER: &str = "Code/URL:";
/// Legacy separator between the time prefix and the step text.
const BULLET: char = '•';

const NOTE_SYNONYMS: [&str; 3] = ["note", "detail", "commit"];
const STEP_TIME_SYNONYMS: [&str; 5] = ["createdAt", "timestamp", "timeStamp", "time", "addedAt"];
const STRING_CODE_SYNONYMS: [&str; 5] = ["code", "codes", "url", "urls", "resources"];
const COMMIT_ARRAY_SOURCES: [&str; 4] = ["commits", "extraCommits", "additionalCommits", "notes"];
const CODE_ARRAY_SOURCES: [&str; 5] = ["codes", "codeSnippets", "codeNotes", "codeUrls", "resources"];

/// Normalize a raw research-log record (any historical revision) to its
/// canonical shape. Never fails; steps without content are dropped.
pub fn normalize_log(raw: &Value, now_iso: &str) -> ResearchLog {
    let created_source = resolve_created_source(raw);
    let context_date = raw.get("date").and_then(Value::as_str).filter(|d| !d.is_empty());
    let created_fallback = created_source
        .as_ref()
        .and_then(Value::as_str)
        .filter(|s| s.contains('T'))
        .map(str::to_string);
    let mut created_at = normalize_timestamp(
        created_source.as_ref(),
        context_date,
        created_fallback.as_deref(),
    );
    if created_at.is_empty() {
        created_at = now_iso.to_string();
    }
    let updated_at = normalize_timestamp(raw.get("updatedAt"), None, Some(&created_at));

    let results = merge_results(raw);
    let base_date = created_at[..created_at.len().min(10)].to_string();

    let steps = raw
        .get("steps")
        .and_then(Value::as_array)
        .map(|steps| {
            steps
                .iter()
                .filter_map(|step| normalize_step(step, &base_date, &created_at))
                .collect()
        })
        .unwrap_or_default();

    ResearchLog {
        id: raw
            .get("id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(new_id),
        title: raw.get("title").map(value_to_string).unwrap_or_default(),
        description: raw
            .get("description")
            .map(value_to_string)
            .filter(|s| !s.is_empty()),
        results,
        created_at,
        updated_at,
        steps,
    }
}

/// Creation-instant inference chain: explicit creation timestamp, the
/// `created_at` legacy alias, the update timestamp, the earliest step with
/// a time field, then a midnight instant built from a legacy `date`.
fn resolve_created_source(raw: &Value) -> Option<Value> {
    // the raw value passes through untouched so epoch-millisecond numbers
    // still hit the numeric conversion branch
    for key in ["createdAt", "created_at", "updatedAt"] {
        if let Some(value) = raw.get(key)
            && is_truthy(value)
        {
            return Some(value.clone());
        }
    }
    if let Some(steps) = raw.get("steps").and_then(Value::as_array) {
        for step in steps {
            if let Some(time) = step.get("time")
                && is_truthy(time)
            {
                return Some(time.clone());
            }
        }
    }
    raw.get("date")
        .and_then(Value::as_str)
        .filter(|d| !d.is_empty())
        .map(|d| Value::String(format!("{d}T00:00:00.000Z")))
}

/// Merge the three legacy free-text fields into one `results` field,
/// labelling the `parameters` and `resources` sources. Blank merges are
/// omitted entirely.
fn merge_results(raw: &Value) -> Option<String> {
    let mut merged = Vec::new();
    if let Some(results) = first_truthy(raw, &["results"]) {
        merged.push(results);
    }
    if let Some(parameters) = first_truthy(raw, &["parameters"]) {
        merged.push(format!("Parameters: {parameters}"));
    }
    if let Some(resources) = first_truthy(raw, &["resources"]) {
        merged.push(format!("Code / Links: {resources}"));
    }
    let joined = merged.join("\n").trim().to_string();
    if joined.is_empty() { None } else { Some(joined) }
}

fn normalize_step(raw: &Value, base_date: &str, log_created_at: &str) -> Option<LogStep> {
    if let Some(text) = raw.as_str() {
        let note = text.trim();
        if note.is_empty() {
            return None;
        }
        return Some(LogStep {
            id: new_id(),
            note: note.to_string(),
            created_at: normalize_timestamp(None, None, Some(log_created_at)),
            commits: Vec::new(),
            codes: Vec::new(),
            sequence: None,
        });
    }
    if !raw.is_object() {
        return None;
    }

    let id = raw
        .get("id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(new_id);

    let mut note = first_truthy(raw, &NOTE_SYNONYMS)
        .unwrap_or_default()
        .trim()
        .to_string();
    let mut extracted_code = String::new();

    // Code/URL split runs before the Time-prefix strip; the order matters
    // and is not commutative.
    if let Some(marker) = note.find(CODE_MARKER) {
        let (head, tail) = note.split_at(marker);
        extracted_code = tail[CODE_MARKER.len()..].trim().to_string();
        note = head.trim_end().trim_end_matches(BULLET).trim().to_string();
    }

    if note.starts_with("Time ") {
        let cleaned = note
            .split_once(BULLET)
            .map(|(_, rest)| rest.trim().to_string())
            .unwrap_or_default();
        // keep the original note when stripping would lose the content
        if !cleaned.is_empty() {
            note = cleaned;
        }
    }

    let initial_code = STRING_CODE_SYNONYMS
        .iter()
        .find_map(|key| raw.get(key).and_then(Value::as_str))
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let raw_sequence = normalize_raw_sequence(raw, &note);

    // Legacy flattened sources, used only when no structured sequence
    // survives.
    let mut legacy_commits = collect_array_values(raw, &COMMIT_ARRAY_SOURCES);
    let mut legacy_codes = Vec::new();
    if !extracted_code.is_empty() {
        legacy_codes.push(extracted_code.clone());
    }
    for key in CODE_ARRAY_SOURCES {
        legacy_codes.extend(collect_array_values(raw, &[key]));
    }
    if let Some(code) = raw.get("code").and_then(Value::as_str) {
        let code = code.trim();
        if !code.is_empty() {
            legacy_codes.push(code.to_string());
        }
    }

    // Promotion: a step with extractable code text but no note keeps that
    // text as the note instead of being dropped.
    if note.is_empty() {
        if !extracted_code.is_empty() {
            note = extracted_code.clone();
        } else if !initial_code.is_empty() {
            note = initial_code.clone();
        } else if let Some(first_code) = legacy_codes.first() {
            note = first_code.clone();
        } else {
            return None;
        }
    }

    legacy_commits.retain(|entry| entry != &note);
    legacy_codes.retain(|entry| entry != &note);
    if legacy_codes.is_empty() && !initial_code.is_empty() && initial_code != note {
        legacy_codes.push(initial_code);
    }

    let time_source = STEP_TIME_SYNONYMS
        .iter()
        .find_map(|key| raw.get(key).filter(|v| is_truthy(v)));
    let step_fallback = raw
        .get("createdAt")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(log_created_at);
    let created_at = normalize_timestamp(time_source, Some(base_date), Some(step_fallback));

    let (commits, codes, sequence) = if let Some(sequence) = raw_sequence {
        let commits = values_of(&sequence, SequenceKind::Commit);
        let codes = values_of(&sequence, SequenceKind::Code);
        (commits, codes, Some(sequence))
    } else {
        let sequence = if legacy_commits.is_empty() && legacy_codes.is_empty() {
            None
        } else {
            // synthesize the authoritative order: commits first, then codes
            let mut entries: Vec<SequenceEntry> = legacy_commits
                .iter()
                .map(|value| SequenceEntry { kind: SequenceKind::Commit, value: value.clone() })
                .collect();
            entries.extend(legacy_codes.iter().map(|value| SequenceEntry {
                kind: SequenceKind::Code,
                value: value.clone(),
            }));
            Some(entries)
        };
        (legacy_commits, legacy_codes, sequence)
    };

    Some(LogStep {
        id,
        note,
        created_at,
        commits,
        codes,
        sequence,
    })
}

/// A structured sequence on the raw step, filtered of blank entries and
/// entries duplicating the note. Present-but-empty collapses to None so
/// the legacy flattened sources still apply.
fn normalize_raw_sequence(raw: &Value, note: &str) -> Option<Vec<SequenceEntry>> {
    let entries = raw.get("sequence")?.as_array()?;
    let filtered: Vec<SequenceEntry> = entries
        .iter()
        .filter_map(|entry| {
            entry.as_object()?;
            let kind = if entry.get("type").and_then(Value::as_str) == Some("code") {
                SequenceKind::Code
            } else {
                SequenceKind::Commit
            };
            let value = entry.get("value").map(value_to_string).unwrap_or_default();
            let value = value.trim().to_string();
            if value.is_empty() || value == note {
                return None;
            }
            Some(SequenceEntry { kind, value })
        })
        .collect();
    if filtered.is_empty() { None } else { Some(filtered) }
}

fn values_of(sequence: &[SequenceEntry], kind: SequenceKind) -> Vec<String> {
    sequence
        .iter()
        .filter(|entry| entry.kind == kind)
        .map(|entry| entry.value.clone())
        .collect()
}

fn collect_array_values(raw: &Value, keys: &[&str]) -> Vec<String> {
    let mut values = Vec::new();
    for key in keys {
        if let Some(entries) = raw.get(key).and_then(Value::as_array) {
            values.extend(
                entries
                    .iter()
                    .map(value_to_string)
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty()),
            );
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: &str = "2024-06-01T12:00:00.000Z";

    #[test]
    fn created_at_inference_prefers_explicit_fields() {
        let raw = json!({"title": "A", "createdAt": "2024-05-01T08:00:00.000Z", "date": "2020-01-01"});
        let log = normalize_log(&raw, NOW);
        assert_eq!(log.created_at, "2024-05-01T08:00:00.000Z");
    }

    #[test]
    fn epoch_millisecond_created_at_converts() {
        let raw = json!({"title": "A", "createdAt": 1_709_303_400_000_i64});
        let log = normalize_log(&raw, NOW);
        assert_eq!(log.created_at, "2024-03-01T14:30:00.000Z");
        assert_eq!(log.updated_at, log.created_at);
    }

    #[test]
    fn created_at_falls_back_through_step_time_and_date() {
        let raw = json!({
            "title": "Exp",
            "date": "2024-03-01",
            "steps": [{"note": "x", "time": "14:30"}],
        });
        let log = normalize_log(&raw, NOW);
        assert_eq!(log.created_at, "2024-03-01T14:30:00.000Z");
        assert_eq!(log.updated_at, log.created_at);

        let raw = json!({"title": "Exp", "date": "2024-03-01"});
        let log = normalize_log(&raw, NOW);
        assert_eq!(log.created_at, "2024-03-01T00:00:00.000Z");
    }

    #[test]
    fn results_merge_labels_legacy_fields() {
        let raw = json!({
            "title": "A",
            "createdAt": "2024-05-01T08:00:00.000Z",
            "results": "it worked",
            "parameters": "lr=0.1",
            "resources": "http://x",
        });
        let log = normalize_log(&raw, NOW);
        assert_eq!(
            log.results.as_deref(),
            Some("it worked\nParameters: lr=0.1\nCode / Links: http://x")
        );

        let raw = json!({"title": "A", "createdAt": "2024-05-01T08:00:00.000Z", "results": "  "});
        assert_eq!(normalize_log(&raw, NOW).results, None);
    }

    #[test]
    fn bare_string_steps_become_notes() {
        let raw = json!({
            "title": "A",
            "createdAt": "2024-05-01T08:00:00.000Z",
            "steps": ["  did a thing  ", "", 42],
        });
        let log = normalize_log(&raw, NOW);
        assert_eq!(log.steps.len(), 1);
        assert_eq!(log.steps[0].note, "did a thing");
        assert_eq!(log.steps[0].created_at, "2024-05-01T08:00:00.000Z");
    }

    #[test]
    fn code_url_marker_splits_note() {
        let raw = json!({
            "title": "A",
            "createdAt": "2024-05-01T08:00:00.000Z",
            "steps": [{"note": "fixed parser • Code/URL: http://y"}],
        });
        let log = normalize_log(&raw, NOW);
        let step = &log.steps[0];
        assert_eq!(step.note, "fixed parser");
        assert_eq!(step.codes, vec!["http://y"]);
        let sequence = step.sequence.as_ref().unwrap();
        assert_eq!(sequence.len(), 1);
        assert_eq!(sequence[0].kind, SequenceKind::Code);
        assert_eq!(sequence[0].value, "http://y");
    }

    #[test]
    fn time_prefix_is_stripped_after_code_split() {
        let raw = json!({
            "title": "Exp",
            "steps": [{"note": "Time 09:00 • did X • Code/URL: http://y", "date": "2024-02-02"}],
            "date": "2024-02-02",
        });
        let log = normalize_log(&raw, NOW);
        assert_eq!(log.created_at, "2024-02-02T00:00:00.000Z");
        let step = &log.steps[0];
        assert_eq!(step.note, "did X");
        let sequence = step.sequence.as_ref().unwrap();
        assert_eq!(sequence.len(), 1);
        assert_eq!(sequence[0].kind, SequenceKind::Code);
        assert_eq!(sequence[0].value, "http://y");
    }

    #[test]
    fn time_prefix_strip_keeps_note_when_remainder_is_blank() {
        let raw = json!({
            "title": "A",
            "createdAt": "2024-05-01T08:00:00.000Z",
            "steps": [{"note": "Time 09:00 •   "}],
        });
        let log = normalize_log(&raw, NOW);
        assert_eq!(log.steps[0].note, "Time 09:00 •");
    }

    #[test]
    fn steps_without_content_are_dropped() {
        let raw = json!({
            "title": "A",
            "createdAt": "2024-05-01T08:00:00.000Z",
            "steps": [{"note": "  "}, {"detail": ""}, {}],
        });
        assert!(normalize_log(&raw, NOW).steps.is_empty());
    }

    #[test]
    fn code_only_step_promotes_code_to_note() {
        let raw = json!({
            "title": "A",
            "createdAt": "2024-05-01T08:00:00.000Z",
            "steps": [{"codes": ["http://x"]}],
        });
        let log = normalize_log(&raw, NOW);
        let step = &log.steps[0];
        assert_eq!(step.note, "http://x");
        assert!(step.codes.is_empty());
        assert!(step.sequence.is_none());
    }

    #[test]
    fn note_synonyms_resolve_in_order() {
        let raw = json!({
            "title": "A",
            "createdAt": "2024-05-01T08:00:00.000Z",
            "steps": [{"detail": "from detail"}, {"commit": "from commit"}],
        });
        let log = normalize_log(&raw, NOW);
        assert_eq!(log.steps[0].note, "from detail");
        assert_eq!(log.steps[1].note, "from commit");
    }

    #[test]
    fn structured_sequence_is_authoritative() {
        let raw = json!({
            "title": "A",
            "createdAt": "2024-05-01T08:00:00.000Z",
            "steps": [{
                "note": "main",
                "sequence": [
                    {"type": "code", "value": "http://a"},
                    {"type": "commit", "value": "extra"},
                    {"type": "commit", "value": "main"},
                    {"type": "code", "value": "  "},
                ],
                "commits": ["stale-legacy-view"],
                "codes": ["stale-code"],
            }],
        });
        let log = normalize_log(&raw, NOW);
        let step = &log.steps[0];
        let sequence = step.sequence.as_ref().unwrap();
        assert_eq!(sequence.len(), 2);
        assert_eq!(step.commits, vec!["extra"]);
        assert_eq!(step.codes, vec!["http://a"]);
    }

    #[test]
    fn legacy_arrays_build_a_synthetic_sequence() {
        let raw = json!({
            "title": "A",
            "createdAt": "2024-05-01T08:00:00.000Z",
            "steps": [{
                "note": "main",
                "commits": ["c1", " ", "main"],
                "extraCommits": ["c2"],
                "codes": ["u1"],
                "code": "u2",
            }],
        });
        let log = normalize_log(&raw, NOW);
        let step = &log.steps[0];
        assert_eq!(step.commits, vec!["c1", "c2"]);
        assert_eq!(step.codes, vec!["u1", "u2"]);
        let sequence = step.sequence.as_ref().unwrap();
        let kinds: Vec<SequenceKind> = sequence.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![SequenceKind::Commit, SequenceKind::Commit, SequenceKind::Code, SequenceKind::Code]
        );
    }

    #[test]
    fn step_timestamps_resolve_through_synonyms() {
        let raw = json!({
            "title": "A",
            "createdAt": "2024-05-01T08:00:00.000Z",
            "steps": [
                {"note": "a", "timestamp": "2024-05-02T09:00:00.000Z"},
                {"note": "b", "time": "10:45"},
                {"note": "c"},
            ],
        });
        let log = normalize_log(&raw, NOW);
        assert_eq!(log.steps[0].created_at, "2024-05-02T09:00:00.000Z");
        assert_eq!(log.steps[1].created_at, "2024-05-01T10:45:00.000Z");
        assert_eq!(log.steps[2].created_at, "2024-05-01T08:00:00.000Z");
    }

    #[test]
    fn idempotent_on_canonical_output() {
        let raw = json!({
            "title": "Exp",
            "date": "2024-02-02",
            "parameters": "k=3",
            "steps": [
                {"note": "Time 09:00 • did X • Code/URL: http://y"},
                {"codes": ["http://z"]},
                "plain text step",
            ],
        });
        let first = normalize_log(&raw, NOW);
        let second = normalize_log(&serde_json::to_value(&first).unwrap(), NOW);
        assert_eq!(first, second);
    }
}
