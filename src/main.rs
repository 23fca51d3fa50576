use clap::Parser;
use color_eyre::Result;
use daymark::cli::{self, Cli, Commands};
use daymark::{AppState, Config, Profile, Store};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Determine profile: --dev flag enables dev mode, otherwise use prod
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    // Load configuration with the determined profile
    // Note: --config option is parsed but not yet used to override config path
    // This can be enhanced in the future if needed
    let config = Config::load_with_profile(profile)?;

    // Open the data store and load every collection through normalization
    let store = Store::new(&config.get_data_dir())?;
    let mut state = AppState::load(store);

    // Dispatch to appropriate command handler
    match cli.command.unwrap_or(Commands::Show { date: None }) {
        Commands::AddJournal { content, date, time, tags } => {
            cli::handle_add_journal(content, date, time, tags, &mut state)?;
        }
        Commands::AddTodo { title, date, note } => {
            cli::handle_add_todo(title, date, note, &mut state)?;
        }
        Commands::DoneTodo { id, undo } => {
            cli::handle_done_todo(id, undo, &mut state)?;
        }
        Commands::DeleteTodo { id } => {
            cli::handle_delete_todo(id, &mut state)?;
        }
        Commands::RateDay { date, work, training, commit } => {
            cli::handle_rate_day(date, work, training, commit, &mut state)?;
        }
        Commands::LedgerSet { field, value } => {
            cli::handle_ledger_set(field, value, &mut state)?;
        }
        Commands::LedgerAdjust { field, amount, subtract, date } => {
            cli::handle_ledger_adjust(field, amount, subtract, date, &mut state)?;
        }
        Commands::LedgerRemove { date, id } => {
            cli::handle_ledger_remove(date, id, &mut state)?;
        }
        Commands::LedgerTotal => {
            cli::handle_ledger_total(&state)?;
        }
        Commands::AddLog { title, description } => {
            cli::handle_add_log(title, description, &mut state)?;
        }
        Commands::AddStep { log, note, commits, codes } => {
            cli::handle_add_step(log, note, commits, codes, &mut state)?;
        }
        Commands::Show { date } => {
            cli::handle_show(date, &state)?;
        }
    }

    Ok(())
}
