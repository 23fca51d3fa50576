//! Normalization for the simpler record kinds: journal entries, todos,
//! the workspace scratchpad and user settings.

use serde_json::Value;

use crate::models::{JournalEntry, Settings, Todo, Workspace, DEFAULT_TIME_ZONE, TIMEZONE_OPTIONS};
use crate::normalize::value_to_string;
use crate::utils::{is_date_key, new_id};

fn id_or_new(raw: &Value) -> String {
    raw.get("id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(new_id)
}

/// Coerce a raw journal record. Entries without a date key or without any
/// content carry nothing worth keeping and are dropped.
pub fn normalize_journal_entry(raw: &Value) -> Option<JournalEntry> {
    raw.as_object()?;
    let date = raw.get("date").map(value_to_string).unwrap_or_default();
    if !is_date_key(&date) {
        return None;
    }
    let content = raw
        .get("content")
        .map(value_to_string)
        .unwrap_or_default()
        .trim()
        .to_string();
    if content.is_empty() {
        return None;
    }
    let time = raw
        .get("time")
        .map(value_to_string)
        .unwrap_or_default()
        .trim()
        .to_string();
    let time = if time.is_empty() { "00:00".to_string() } else { time };
    let tags = raw
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .map(value_to_string)
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();
    Some(JournalEntry {
        id: id_or_new(raw),
        date,
        time,
        content,
        tags,
    })
}

fn as_bool(raw: Option<&Value>) -> bool {
    match raw {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => s == "true" || s == "1",
        _ => false,
    }
}

/// Coerce a raw todo record. Title and a valid date are the meaningful
/// fields; the `order` value is taken as-is and renormalized by the state
/// layer's density pass.
pub fn normalize_todo(raw: &Value) -> Option<Todo> {
    raw.as_object()?;
    let date = raw.get("date").map(value_to_string).unwrap_or_default();
    if !is_date_key(&date) {
        return None;
    }
    let title = raw
        .get("title")
        .map(value_to_string)
        .unwrap_or_default()
        .trim()
        .to_string();
    if title.is_empty() {
        return None;
    }
    let note = raw
        .get("note")
        .map(value_to_string)
        .unwrap_or_default()
        .trim()
        .to_string();
    let order = raw
        .get("order")
        .and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .filter(|order| *order > 0)
        .unwrap_or(0);
    Some(Todo {
        id: id_or_new(raw),
        date,
        title,
        note,
        done: as_bool(raw.get("done")),
        order,
    })
}

/// Coerce the workspace scratchpad document: three free-text fields,
/// absent or null keys read as empty.
pub fn normalize_workspace(raw: Option<&Value>) -> Workspace {
    let mut workspace = Workspace::default();
    if let Some(obj) = raw.and_then(Value::as_object) {
        if let Some(value) = obj.get("project") {
            workspace.project = value_to_string(value);
        }
        if let Some(value) = obj.get("fitness") {
            workspace.fitness = value_to_string(value);
        }
        if let Some(value) = obj.get("money") {
            workspace.money = value_to_string(value);
        }
    }
    workspace
}

/// Coerce the settings document. Timezones outside the allow-list reset to
/// the default; stray legacy keys (such as `selectedDate`) disappear with
/// the shape.
pub fn normalize_settings(raw: Option<&Value>) -> Settings {
    let mut settings = Settings::default();
    if let Some(obj) = raw.and_then(Value::as_object) {
        if let Some(theme) = obj.get("theme").and_then(Value::as_str)
            && !theme.is_empty()
        {
            settings.theme = theme.to_string();
        }
        if let Some(tz) = obj.get("timeZone").and_then(Value::as_str) {
            settings.time_zone = if TIMEZONE_OPTIONS.contains(&tz) {
                tz.to_string()
            } else {
                DEFAULT_TIME_ZONE.to_string()
            };
        }
    }
    settings
}
