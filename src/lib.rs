pub mod cli;
pub mod config;
pub mod models;
pub mod normalize;
pub mod state;
pub mod store;
pub mod utils;

pub use config::Config;
pub use models::{DayRating, JournalEntry, LedgerSnapshot, ResearchLog, Todo};
pub use state::AppState;
pub use store::Store;
pub use utils::Profile;
