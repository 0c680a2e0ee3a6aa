use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use taskflow::cli::{self, Cli, Commands, NewTask, TaskEdit};
use taskflow::{Config, Database, ListStore, Persistence, Profile, TaskStore};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    // RUST_LOG overrides the default; invalid filters fall back to warn
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();

    // Determine profile: --dev flag enables dev mode, otherwise use prod
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from_path(Path::new(path))?,
        None => Config::load_with_profile(profile)?,
    };

    let db_path = config.get_database_path();
    let db = Database::new(
        db_path
            .to_str()
            .ok_or_else(|| color_eyre::eyre::eyre!("Database path contains invalid UTF-8"))?,
    )?;
    let persistence = Persistence::new(Arc::new(db));

    // Commands run against a store that has already been fetched
    let mut tasks = TaskStore::new(persistence.clone(), config.fetch_latency());
    tasks.fetch().await?;
    let mut lists = ListStore::new(persistence);
    lists.load();

    match cli.command {
        Commands::Tasks { view, list } => cli::handle_tasks(&tasks, view, list)?,
        Commands::Add { title, priority, due, important, list, notes } => {
            let new = NewTask { title, priority, due, important, list, notes };
            cli::handle_add(&mut tasks, new, config.default_priority)?;
        }
        Commands::Complete { id } => cli::handle_complete(&mut tasks, &id)?,
        Commands::Star { id } => cli::handle_star(&mut tasks, &id)?,
        Commands::Edit { id, title, priority, due, clear_due, notes } => {
            let edit = TaskEdit { title, priority, due, clear_due, notes };
            cli::handle_edit(&mut tasks, &id, edit)?;
        }
        Commands::Remove { id } => cli::handle_remove(&mut tasks, &id)?,
        Commands::Lists => cli::handle_lists(&lists, &tasks)?,
        Commands::AddList { name, id } => cli::handle_add_list(&mut lists, name, id)?,
        Commands::RemoveList { id } => cli::handle_remove_list(&mut lists, &id)?,
        Commands::Stats => cli::handle_stats(&tasks)?,
    }

    if let Some(err) = tasks.last_persist_error() {
        eprintln!("warning: changes may not have been saved: {}", err);
    }

    Ok(())
}
