use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::Value;

use crate::models::{
    is_ledger_field, DayRating, Direction, JournalEntry, LedgerHistoryEntry, LedgerSnapshot,
    ResearchLog, Settings, Todo, Workspace, LEDGER_TOTAL_KEYS, TIMEZONE_OPTIONS,
};
use crate::normalize::{
    is_day_rating_empty, iso_instant, normalize_day_rating, normalize_journal_entry,
    normalize_ledger, normalize_ledger_history, normalize_log, normalize_settings, normalize_todo,
    normalize_workspace, round2, to_number,
};
use crate::store::{keys, Store, StoreError};
use crate::utils::new_id;

/// Partial update for a day rating; None leaves the existing slot alone.
#[derive(Debug, Default, Clone)]
pub struct RatingPatch {
    pub work_time: Option<String>,
    pub training_time: Option<String>,
    pub commit: Option<String>,
}

/// The single process-wide application state. Every mutating operation
/// synchronously re-serializes its owning collection before returning.
pub struct AppState {
    store: Store,
    pub journal: Vec<JournalEntry>,
    pub todos: Vec<Todo>,
    pub lab_logs: Vec<ResearchLog>,
    pub day_ratings: Vec<DayRating>,
    pub ledger: LedgerSnapshot,
    pub ledger_history: BTreeMap<String, Vec<LedgerHistoryEntry>>,
    pub workspace: Workspace,
    pub settings: Settings,
}

fn array_items(doc: Option<Value>) -> Vec<Value> {
    match doc {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

/// Plain string form of a ledger amount, no trailing ".0" on whole values.
fn format_amount(value: f64) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{value}")
}

impl AppState {
    /// Load every collection from the store, normalizing each record.
    /// Malformed documents degrade to empty defaults per collection.
    pub fn load(store: Store) -> Self {
        let now = iso_instant(Utc::now());

        let mut journal: Vec<JournalEntry> = array_items(store.load(keys::JOURNAL))
            .iter()
            .filter_map(normalize_journal_entry)
            .collect();
        sort_journal(&mut journal);

        let mut todos: Vec<Todo> = array_items(store.load(keys::TODOS))
            .iter()
            .filter_map(normalize_todo)
            .collect();
        let dates: Vec<String> = todos.iter().map(|t| t.date.clone()).collect();
        for date in dates {
            renumber_orders(&mut todos, &date);
        }

        let mut lab_logs: Vec<ResearchLog> = array_items(store.load(keys::LOGS))
            .iter()
            .map(|log| normalize_log(log, &now))
            .collect();
        sort_logs(&mut lab_logs);

        let day_ratings: Vec<DayRating> = array_items(store.load(keys::RATINGS))
            .iter()
            .filter_map(normalize_day_rating)
            .filter(|rating| !is_day_rating_empty(rating))
            .collect();

        let ledger = normalize_ledger(store.load(keys::LEDGER).as_ref());
        let ledger_history = normalize_ledger_history(store.load(keys::LEDGER_HISTORY).as_ref(), &now);
        let workspace = normalize_workspace(store.load(keys::WORKSPACE).as_ref());
        let settings = normalize_settings(store.load(keys::SETTINGS).as_ref());

        AppState {
            store,
            journal,
            todos,
            lab_logs,
            day_ratings,
            ledger,
            ledger_history,
            workspace,
            settings,
        }
    }

    // --- journal ---

    /// Replace-by-id-or-append, then restore the canonical
    /// (date, time, id) ascending order.
    pub fn upsert_journal(&mut self, entry: JournalEntry) -> Result<(), StoreError> {
        if let Some(existing) = self.journal.iter_mut().find(|e| e.id == entry.id) {
            *existing = entry;
        } else {
            self.journal.push(entry);
        }
        sort_journal(&mut self.journal);
        self.store.save(keys::JOURNAL, &self.journal)
    }

    pub fn delete_journal(&mut self, id: &str) -> Result<bool, StoreError> {
        let before = self.journal.len();
        self.journal.retain(|e| e.id != id);
        if self.journal.len() == before {
            return Ok(false);
        }
        self.store.save(keys::JOURNAL, &self.journal)?;
        Ok(true)
    }

    // --- todos ---

    /// Upsert a todo. A missing or non-positive order gets max+1 within its
    /// date; the per-date order sequence is renumbered to dense 1..N after.
    pub fn upsert_todo(&mut self, mut todo: Todo) -> Result<(), StoreError> {
        if todo.order < 1 {
            let max = self
                .todos
                .iter()
                .filter(|t| t.date == todo.date)
                .map(|t| t.order)
                .max()
                .unwrap_or(0);
            todo.order = max + 1;
        }
        let new_date = todo.date.clone();
        let old_date = if let Some(existing) = self.todos.iter_mut().find(|t| t.id == todo.id) {
            let old = existing.date.clone();
            *existing = todo;
            Some(old)
        } else {
            self.todos.push(todo);
            None
        };
        if let Some(old_date) = old_date.filter(|d| *d != new_date) {
            renumber_orders(&mut self.todos, &old_date);
        }
        renumber_orders(&mut self.todos, &new_date);
        self.store.save(keys::TODOS, &self.todos)
    }

    pub fn set_todo_done(&mut self, id: &str, done: bool) -> Result<bool, StoreError> {
        let Some(todo) = self.todos.iter_mut().find(|t| t.id == id) else {
            return Ok(false);
        };
        todo.done = done;
        self.store.save(keys::TODOS, &self.todos)?;
        Ok(true)
    }

    pub fn delete_todo(&mut self, id: &str) -> Result<bool, StoreError> {
        let Some(todo) = self.todos.iter().find(|t| t.id == id) else {
            return Ok(false);
        };
        let date = todo.date.clone();
        self.todos.retain(|t| t.id != id);
        renumber_orders(&mut self.todos, &date);
        self.store.save(keys::TODOS, &self.todos)?;
        Ok(true)
    }

    // --- day ratings ---

    pub fn day_rating(&self, date: &str) -> Option<&DayRating> {
        self.day_ratings.iter().find(|r| r.date == date)
    }

    /// Merge a patch over the stored rating for `date` and re-normalize.
    /// An empty result deletes the stored record instead of persisting a
    /// placeholder. Returns whether anything changed.
    pub fn set_day_rating(&mut self, date: &str, patch: RatingPatch) -> Result<bool, StoreError> {
        if date.is_empty() {
            return Ok(false);
        }
        let existing = self.day_rating(date).cloned().unwrap_or(DayRating {
            date: date.to_string(),
            work_time: String::new(),
            training_time: String::new(),
            commit: String::new(),
        });
        let merged = DayRating {
            date: date.to_string(),
            work_time: patch.work_time.unwrap_or(existing.work_time),
            training_time: patch.training_time.unwrap_or(existing.training_time),
            commit: patch.commit.unwrap_or(existing.commit),
        };
        let raw = serde_json::to_value(&merged).map_err(|source| StoreError::SerializeError {
            key: keys::RATINGS.to_string(),
            source,
        })?;
        let Some(normalized) = normalize_day_rating(&raw) else {
            return Ok(false);
        };
        let index = self.day_ratings.iter().position(|r| r.date == date);
        if is_day_rating_empty(&normalized) {
            let Some(index) = index else {
                return Ok(false);
            };
            self.day_ratings.remove(index);
            self.store.save(keys::RATINGS, &self.day_ratings)?;
            return Ok(true);
        }
        match index {
            Some(index) if self.day_ratings[index] == normalized => Ok(false),
            Some(index) => {
                self.day_ratings[index] = normalized;
                self.store.save(keys::RATINGS, &self.day_ratings)?;
                Ok(true)
            }
            None => {
                self.day_ratings.push(normalized);
                self.store.save(keys::RATINGS, &self.day_ratings)?;
                Ok(true)
            }
        }
    }

    // --- research logs ---

    pub fn upsert_log(&mut self, log: ResearchLog) -> Result<(), StoreError> {
        if let Some(existing) = self.lab_logs.iter_mut().find(|l| l.id == log.id) {
            *existing = log;
        } else {
            self.lab_logs.push(log);
        }
        sort_logs(&mut self.lab_logs);
        self.store.save(keys::LOGS, &self.lab_logs)
    }

    pub fn delete_log(&mut self, id: &str) -> Result<bool, StoreError> {
        let before = self.lab_logs.len();
        self.lab_logs.retain(|l| l.id != id);
        if self.lab_logs.len() == before {
            return Ok(false);
        }
        self.store.save(keys::LOGS, &self.lab_logs)?;
        Ok(true)
    }

    // --- ledger ---

    /// Store a raw value under a validated ledger field key.
    pub fn set_ledger_field(&mut self, field: &str, value: String) -> Result<bool, StoreError> {
        if !is_ledger_field(field) {
            return Ok(false);
        }
        if self.ledger.get(field) == Some(value.as_str()) {
            return Ok(false);
        }
        self.ledger.set(field, value);
        self.store.save(keys::LEDGER, &self.ledger)?;
        Ok(true)
    }

    /// Apply a signed adjustment to a ledger field and record it under
    /// `date`. Zero amounts after rounding are ignored.
    pub fn adjust_ledger(
        &mut self,
        date: &str,
        field: &str,
        direction: Direction,
        amount: f64,
    ) -> Result<Option<LedgerHistoryEntry>, StoreError> {
        if date.is_empty() || !is_ledger_field(field) {
            return Ok(None);
        }
        let amount = round2(amount.abs());
        if amount == 0.0 {
            return Ok(None);
        }
        let delta = match direction {
            Direction::Subtract => -amount,
            Direction::Add => amount,
        };
        let current = to_number(&Value::String(
            self.ledger.get(field).unwrap_or_default().to_string(),
        ));
        let next = round2(current + delta);
        self.ledger.set(field, format_amount(next));
        self.store.save(keys::LEDGER, &self.ledger)?;

        let entry = LedgerHistoryEntry {
            id: new_id(),
            date: date.to_string(),
            field: field.to_string(),
            direction,
            delta,
            created_at: iso_instant(Utc::now()),
        };
        self.ledger_history
            .entry(date.to_string())
            .or_default()
            .push(entry.clone());
        self.store.save(keys::LEDGER_HISTORY, &self.ledger_history)?;
        Ok(Some(entry))
    }

    /// Remove a history entry, deterministically un-applying its delta to
    /// the live snapshot value (current minus delta, rounded).
    pub fn remove_ledger_adjustment(&mut self, date: &str, id: &str) -> Result<bool, StoreError> {
        let Some(entries) = self.ledger_history.get_mut(date) else {
            return Ok(false);
        };
        let Some(index) = entries.iter().position(|e| e.id == id) else {
            return Ok(false);
        };
        let entry = entries.remove(index);
        if entries.is_empty() {
            self.ledger_history.remove(date);
        }
        let current = to_number(&Value::String(
            self.ledger.get(&entry.field).unwrap_or_default().to_string(),
        ));
        let next = round2(current - entry.delta);
        self.ledger.set(&entry.field, format_amount(next));
        self.store.save(keys::LEDGER, &self.ledger)?;
        self.store.save(keys::LEDGER_HISTORY, &self.ledger_history)?;
        Ok(true)
    }

    /// Tolerant sum of the designated total fields, rounded to cents.
    pub fn ledger_total(&self) -> f64 {
        let sum = LEDGER_TOTAL_KEYS
            .iter()
            .map(|key| to_number(&Value::String(self.ledger.get(key).unwrap_or_default().to_string())))
            .sum();
        round2(sum)
    }

    // --- workspace & settings ---

    pub fn update_workspace_field(&mut self, key: &str, value: String) -> Result<bool, StoreError> {
        match key {
            "project" => self.workspace.project = value,
            "fitness" => self.workspace.fitness = value,
            "money" => self.workspace.money = value,
            _ => return Ok(false),
        }
        self.store.save(keys::WORKSPACE, &self.workspace)?;
        Ok(true)
    }

    /// Switch the presentation timezone; values outside the allow-list are
    /// rejected.
    pub fn set_time_zone(&mut self, time_zone: &str) -> Result<bool, StoreError> {
        if !TIMEZONE_OPTIONS.contains(&time_zone) || self.settings.time_zone == time_zone {
            return Ok(false);
        }
        self.settings.time_zone = time_zone.to_string();
        self.store.save(keys::SETTINGS, &self.settings)?;
        Ok(true)
    }

    pub fn set_theme(&mut self, theme: &str) -> Result<(), StoreError> {
        self.settings.theme = theme.to_string();
        self.store.save(keys::SETTINGS, &self.settings)
    }
}

fn sort_journal(journal: &mut [JournalEntry]) {
    journal.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.time.cmp(&b.time))
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn sort_logs(logs: &mut [ResearchLog]) {
    logs.sort_by(|a, b| {
        b.sort_key()
            .cmp(a.sort_key())
            .then_with(|| a.title.cmp(&b.title))
    });
}

/// Renumber the todos on `date` to a dense 1..N by their current order.
fn renumber_orders(todos: &mut [Todo], date: &str) {
    let mut indices: Vec<usize> = todos
        .iter()
        .enumerate()
        .filter(|(_, t)| t.date == date)
        .map(|(i, _)| i)
        .collect();
    indices.sort_by_key(|&i| todos[i].order);
    for (position, index) in indices.into_iter().enumerate() {
        todos[index].order = position as i64 + 1;
    }
}
