use serde::{Deserialize, Serialize};

use crate::utils::new_id;

/// Fixed ledger field keys, in display order. These are the only keys a
/// ledger snapshot or history entry may reference.
pub const LEDGER_FIELDS: [&str; 5] = ["alipay", "wechat", "bankCn", "debt", "bankUk"];

/// Subset of ledger fields summed into the derived total.
pub const LEDGER_TOTAL_KEYS: [&str; 3] = ["alipay", "wechat", "bankCn"];

/// Timezone identifiers the settings document may carry.
pub const TIMEZONE_OPTIONS: [&str; 2] = ["Europe/London", "Asia/Shanghai"];

pub const DEFAULT_THEME: &str = "light";
pub const DEFAULT_TIME_ZONE: &str = "Europe/London";

/// Returns true when `key` names one of the fixed ledger fields.
pub fn is_ledger_field(key: &str) -> bool {
    LEDGER_FIELDS.contains(&key)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub date: String, // YYYY-MM-DD
    pub time: String, // HH:MM
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl JournalEntry {
    pub fn new(date: String, time: String, content: String, tags: Vec<String>) -> Self {
        Self {
            id: new_id(),
            date,
            time,
            content,
            tags,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub date: String, // YYYY-MM-DD
    pub title: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub order: i64, // dense 1..N within a date
}

impl Todo {
    pub fn new(date: String, title: String, note: String) -> Self {
        Self {
            id: new_id(),
            date,
            title,
            note,
            done: false,
            order: 0,
        }
    }
}

/// A per-day rating. Numeric slots are stored as their string form with ""
/// meaning unset, matching every historical revision of the on-disk shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRating {
    pub date: String,
    pub work_time: String,
    pub training_time: String,
    pub commit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub alipay: String,
    pub wechat: String,
    pub bank_cn: String,
    pub debt: String,
    pub bank_uk: String,
}

impl Default for LedgerSnapshot {
    fn default() -> Self {
        Self {
            alipay: String::new(),
            wechat: String::new(),
            bank_cn: String::new(),
            debt: String::new(),
            bank_uk: String::new(),
        }
    }
}

impl LedgerSnapshot {
    /// Read a field by its key. Unknown keys return None.
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "alipay" => Some(&self.alipay),
            "wechat" => Some(&self.wechat),
            "bankCn" => Some(&self.bank_cn),
            "debt" => Some(&self.debt),
            "bankUk" => Some(&self.bank_uk),
            _ => None,
        }
    }

    /// Write a field by its key. Unknown keys are ignored.
    pub fn set(&mut self, key: &str, value: String) {
        match key {
            "alipay" => self.alipay = value,
            "wechat" => self.wechat = value,
            "bankCn" => self.bank_cn = value,
            "debt" => self.debt = value,
            "bankUk" => self.bank_uk = value,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Add,
    Subtract,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerHistoryEntry {
    pub id: String,
    pub date: String,
    pub field: String,
    pub direction: Direction,
    pub delta: f64, // sign matches direction, never zero
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchLog {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub steps: Vec<LogStep>,
}

impl ResearchLog {
    /// Sort key for the canonical descending collection order.
    pub fn sort_key(&self) -> &str {
        if !self.created_at.is_empty() {
            &self.created_at
        } else if !self.updated_at.is_empty() {
            &self.updated_at
        } else {
            "0000-00-00T00:00:00.000Z"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceKind {
    Commit,
    Code,
}

/// One typed sub-entry of a step's ordered sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceEntry {
    #[serde(rename = "type")]
    pub kind: SequenceKind,
    pub value: String,
}

/// A research-log step. `sequence`, when present, is authoritative; the
/// flattened `commits`/`codes` views are kept for older readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStep {
    pub id: String,
    pub note: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commits: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub codes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<Vec<SequenceEntry>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub fitness: String,
    #[serde(default)]
    pub money: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub theme: String,
    pub time_zone: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
            time_zone: DEFAULT_TIME_ZONE.to_string(),
        }
    }
}
