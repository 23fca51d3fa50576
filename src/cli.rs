use chrono::Utc;
use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::models::{
    Direction, JournalEntry, LogStep, ResearchLog, SequenceEntry, SequenceKind, Todo,
    LEDGER_FIELDS,
};
use crate::normalize::iso_instant;
use crate::state::{AppState, RatingPatch};
use crate::store::StoreError;
use crate::utils::{get_current_date_string, get_current_time_string, new_id, parse_date, parse_tags};

#[derive(Parser)]
#[command(name = "dm")]
#[command(about = "Daymark - daily journal, todos, ratings, research logs and a money ledger")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/data directory)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a journal entry
    AddJournal {
        /// Entry content
        content: String,
        /// Entry date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
        /// Entry time (HH:MM, default now)
        #[arg(long)]
        time: Option<String>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
    },
    /// Add a todo
    AddTodo {
        /// Todo title
        title: String,
        /// Todo date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
        /// Free-text note
        #[arg(long)]
        note: Option<String>,
    },
    /// Mark a todo as done (or not done with --undo)
    DoneTodo {
        /// Todo id
        id: String,
        /// Mark as not done instead
        #[arg(long)]
        undo: bool,
    },
    /// Delete a todo
    DeleteTodo {
        /// Todo id
        id: String,
    },
    /// Set the rating slots for a day
    RateDay {
        /// Day to rate (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
        /// Work rating, 0-10
        #[arg(long)]
        work: Option<String>,
        /// Training rating, 0-10
        #[arg(long)]
        training: Option<String>,
        /// Commit note for the day
        #[arg(long)]
        commit: Option<String>,
    },
    /// Set a ledger field to a raw value
    LedgerSet {
        /// Field key (alipay, wechat, bankCn, debt, bankUk)
        field: String,
        /// New value
        value: String,
    },
    /// Record a signed adjustment against a ledger field
    LedgerAdjust {
        /// Field key (alipay, wechat, bankCn, debt, bankUk)
        field: String,
        /// Adjustment amount
        amount: f64,
        /// Subtract instead of add
        #[arg(long)]
        subtract: bool,
        /// Day to record the adjustment under (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Remove a recorded adjustment, un-applying its delta
    LedgerRemove {
        /// Day the adjustment was recorded under
        date: String,
        /// Adjustment id
        id: String,
    },
    /// Print the combined ledger total
    LedgerTotal,
    /// Start a research log
    AddLog {
        /// Log title
        title: String,
        /// Free-text description
        #[arg(long)]
        description: Option<String>,
    },
    /// Append a step to a research log
    AddStep {
        /// Log id
        log: String,
        /// Step note
        note: String,
        /// Commit reference (repeatable)
        #[arg(long = "commit")]
        commits: Vec<String>,
        /// Code or URL reference (repeatable)
        #[arg(long = "code")]
        codes: Vec<String>,
    },
    /// Show everything recorded for a day (default if no subcommand)
    Show {
        /// Day to show (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
    #[error("Failed to parse date: {0}")]
    DateParseError(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Resolve an optional date argument, defaulting to today.
fn resolve_date(date: Option<String>) -> Result<String, CliError> {
    match date {
        Some(date) => {
            parse_date(&date).map_err(|e| {
                CliError::DateParseError(format!("Invalid date format '{}': {}", date, e))
            })?;
            Ok(date)
        }
        None => Ok(get_current_date_string()),
    }
}

fn require_ledger_field(field: &str) -> Result<(), CliError> {
    if LEDGER_FIELDS.contains(&field) {
        Ok(())
    } else {
        Err(CliError::InvalidInput(format!(
            "Unknown ledger field '{}', expected one of: {}",
            field,
            LEDGER_FIELDS.join(", ")
        )))
    }
}

/// Handle the add-journal command
pub fn handle_add_journal(
    content: String,
    date: Option<String>,
    time: Option<String>,
    tags: Option<String>,
    state: &mut AppState,
) -> Result<(), CliError> {
    let content = content.trim().to_string();
    if content.is_empty() {
        return Err(CliError::InvalidInput("Journal content is empty".to_string()));
    }
    let date = resolve_date(date)?;
    let time = time.unwrap_or_else(get_current_time_string);
    let tags = tags.map(|t| parse_tags(&t)).unwrap_or_default();

    let entry = JournalEntry::new(date, time, content, tags);
    let id = entry.id.clone();
    state.upsert_journal(entry)?;
    println!("Journal entry created successfully (ID: {})", id);

    Ok(())
}

/// Handle the add-todo command
pub fn handle_add_todo(
    title: String,
    date: Option<String>,
    note: Option<String>,
    state: &mut AppState,
) -> Result<(), CliError> {
    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(CliError::InvalidInput("Todo title is empty".to_string()));
    }
    let date = resolve_date(date)?;

    let todo = Todo::new(date, title, note.unwrap_or_default());
    let id = todo.id.clone();
    state.upsert_todo(todo)?;
    println!("Todo created successfully (ID: {})", id);

    Ok(())
}

/// Handle the done-todo command
pub fn handle_done_todo(id: String, undo: bool, state: &mut AppState) -> Result<(), CliError> {
    if !state.set_todo_done(&id, !undo)? {
        return Err(CliError::NotFound(format!("No todo with id {}", id)));
    }
    println!("Todo {} marked as {}", id, if undo { "not done" } else { "done" });
    Ok(())
}

/// Handle the delete-todo command
pub fn handle_delete_todo(id: String, state: &mut AppState) -> Result<(), CliError> {
    if !state.delete_todo(&id)? {
        return Err(CliError::NotFound(format!("No todo with id {}", id)));
    }
    println!("Todo {} deleted", id);
    Ok(())
}

/// Handle the rate-day command
pub fn handle_rate_day(
    date: Option<String>,
    work: Option<String>,
    training: Option<String>,
    commit: Option<String>,
    state: &mut AppState,
) -> Result<(), CliError> {
    let date = resolve_date(date)?;
    let patch = RatingPatch {
        work_time: work,
        training_time: training,
        commit,
    };
    let changed = state.set_day_rating(&date, patch)?;
    match state.day_rating(&date) {
        Some(rating) => println!(
            "Rating for {}: work {} training {}{}",
            date,
            if rating.work_time.is_empty() { "-" } else { &rating.work_time },
            if rating.training_time.is_empty() { "-" } else { &rating.training_time },
            if changed { "" } else { " (unchanged)" },
        ),
        None => println!("Rating for {} cleared", date),
    }
    Ok(())
}

/// Handle the ledger-set command
pub fn handle_ledger_set(field: String, value: String, state: &mut AppState) -> Result<(), CliError> {
    require_ledger_field(&field)?;
    state.set_ledger_field(&field, value)?;
    println!("Ledger field {} updated (total: {})", field, state.ledger_total());
    Ok(())
}

/// Handle the ledger-adjust command
pub fn handle_ledger_adjust(
    field: String,
    amount: f64,
    subtract: bool,
    date: Option<String>,
    state: &mut AppState,
) -> Result<(), CliError> {
    require_ledger_field(&field)?;
    let date = resolve_date(date)?;
    let direction = if subtract { Direction::Subtract } else { Direction::Add };
    match state.adjust_ledger(&date, &field, direction, amount)? {
        Some(entry) => println!(
            "Adjustment recorded (ID: {}): {} {:+} (total: {})",
            entry.id,
            field,
            entry.delta,
            state.ledger_total()
        ),
        None => println!("Amount rounds to zero, nothing recorded"),
    }
    Ok(())
}

/// Handle the ledger-remove command
pub fn handle_ledger_remove(date: String, id: String, state: &mut AppState) -> Result<(), CliError> {
    if !state.remove_ledger_adjustment(&date, &id)? {
        return Err(CliError::NotFound(format!("No adjustment {} under {}", id, date)));
    }
    println!("Adjustment {} removed (total: {})", id, state.ledger_total());
    Ok(())
}

/// Handle the ledger-total command
pub fn handle_ledger_total(state: &AppState) -> Result<(), CliError> {
    println!("{}", state.ledger_total());
    Ok(())
}

/// Handle the add-log command
pub fn handle_add_log(
    title: String,
    description: Option<String>,
    state: &mut AppState,
) -> Result<(), CliError> {
    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(CliError::InvalidInput("Log title is empty".to_string()));
    }
    let now = iso_instant(Utc::now());
    let log = ResearchLog {
        id: new_id(),
        title,
        description: description.filter(|d| !d.trim().is_empty()),
        results: None,
        created_at: now.clone(),
        updated_at: now,
        steps: Vec::new(),
    };
    let id = log.id.clone();
    state.upsert_log(log)?;
    println!("Research log created successfully (ID: {})", id);

    Ok(())
}

/// Handle the add-step command
pub fn handle_add_step(
    log_id: String,
    note: String,
    commits: Vec<String>,
    codes: Vec<String>,
    state: &mut AppState,
) -> Result<(), CliError> {
    let note = note.trim().to_string();
    if note.is_empty() {
        return Err(CliError::InvalidInput("Step note is empty".to_string()));
    }
    let mut log = state
        .lab_logs
        .iter()
        .find(|l| l.id == log_id)
        .cloned()
        .ok_or_else(|| CliError::NotFound(format!("No research log with id {}", log_id)))?;

    let now = iso_instant(Utc::now());
    let sequence: Vec<SequenceEntry> = commits
        .iter()
        .map(|value| SequenceEntry { kind: SequenceKind::Commit, value: value.clone() })
        .chain(codes.iter().map(|value| SequenceEntry { kind: SequenceKind::Code, value: value.clone() }))
        .collect();
    let step = LogStep {
        id: new_id(),
        note,
        created_at: now.clone(),
        commits,
        codes,
        sequence: if sequence.is_empty() { None } else { Some(sequence) },
    };
    let step_id = step.id.clone();
    log.steps.push(step);
    log.updated_at = now;
    state.upsert_log(log)?;
    println!("Step added successfully (ID: {})", step_id);

    Ok(())
}

/// Handle the show command
pub fn handle_show(date: Option<String>, state: &AppState) -> Result<(), CliError> {
    let date = resolve_date(date)?;
    println!("== {} ==", date);

    let entries: Vec<_> = state.journal.iter().filter(|e| e.date == date).collect();
    if !entries.is_empty() {
        println!("Journal:");
        for entry in entries {
            let tags = if entry.tags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", entry.tags.join(", "))
            };
            println!("  {} {}{}", entry.time, entry.content, tags);
        }
    }

    let mut todos: Vec<_> = state.todos.iter().filter(|t| t.date == date).collect();
    todos.sort_by_key(|t| t.order);
    if !todos.is_empty() {
        println!("Todos:");
        for todo in todos {
            let mark = if todo.done { "x" } else { " " };
            println!("  [{}] {}. {} ({})", mark, todo.order, todo.title, todo.id);
        }
    }

    if let Some(rating) = state.day_rating(&date) {
        println!(
            "Rating: work {} training {}",
            if rating.work_time.is_empty() { "-" } else { &rating.work_time },
            if rating.training_time.is_empty() { "-" } else { &rating.training_time },
        );
        if !rating.commit.is_empty() {
            println!("  commit: {}", rating.commit);
        }
    }

    if let Some(adjustments) = state.ledger_history.get(&date) {
        println!("Ledger adjustments:");
        for entry in adjustments {
            println!("  {} {:+} ({})", entry.field, entry.delta, entry.id);
        }
    }
    println!("Ledger total: {}", state.ledger_total());

    Ok(())
}
