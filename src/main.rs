use clap::Parser;
use color_eyre::Result;
use std::sync::Arc;
use tasktrack::{
    Config, Database, PreferenceStore, Profile, TaskEngine,
    cli::{self, Cli, Commands},
    clock::SystemClock,
    utils,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Determine profile: --dev flag enables dev mode, otherwise use prod
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    // An explicit --config file wins over the profile's config
    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from_path(&utils::expand_path(path))?,
        None => Config::load_with_profile(profile)?,
    };

    init_tracing(&config.log_level);

    let db_path = config.get_database_path();
    let db = Database::new(
        db_path
            .to_str()
            .ok_or_else(|| color_eyre::eyre::eyre!("Database path contains invalid UTF-8"))?,
    )?;
    let preferences = PreferenceStore::open(config.get_preferences_path())?;

    let mut engine = TaskEngine::new(db, preferences, Arc::new(SystemClock), config.engine_options())?;

    let command = cli.command.unwrap_or(Commands::List { json: false });
    cli::run(command, &mut engine)?;

    Ok(())
}

/// RUST_LOG takes precedence over the configured level; invalid filters fall back to "warn"
fn init_tracing(configured: &str) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .filter(|raw| !raw.trim().is_empty())
        .and_then(|raw| EnvFilter::try_new(raw.trim()).ok())
        .or_else(|| EnvFilter::try_new(configured).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
