//! bento-bridge - forwards membership and course events to Bento.

mod app;
mod commands;
mod output;
mod snapshot;

use std::path::PathBuf;

use anyhow::Result;
use app::App;
use bridge_config::{init_logging, Config, Paths};
use clap::{Parser, Subcommand};
use tracing::debug;

/// Command-line driver for the event bridge.
#[derive(Parser)]
#[command(name = "bento-bridge")]
#[command(about = "Resolve, deliver and backfill membership and course events")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for runtime files (config, database, logs). Defaults to ~/.bento-bridge
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Configuration file to use instead of <base-dir>/config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print events as JSON lines instead of sending them
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage integration settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Print the resolved event for a user, ignoring the enabled flag
    Resolve {
        /// Event key (e.g. pmpro_checkout)
        #[arg(short, long)]
        event: String,
        /// User ID
        #[arg(short, long)]
        user: u64,
        /// Event payload as a JSON object
        #[arg(short, long, default_value = "{}")]
        payload: String,
        /// Host snapshot file
        #[arg(short, long)]
        snapshot: PathBuf,
    },
    /// Send a test event to check connectivity
    TestEvent {
        /// User ID
        #[arg(short, long)]
        user: u64,
        /// Host snapshot file
        #[arg(short, long)]
        snapshot: PathBuf,
    },
    /// Replay recorded host callbacks as one unit of work
    Replay {
        /// Host snapshot file
        #[arg(short, long)]
        snapshot: PathBuf,
        /// JSON list of host notifications
        notifications: PathBuf,
    },
    /// Backfill existing records
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Sanitise and save a raw settings file
    Import {
        /// Settings JSON file
        file: PathBuf,
    },
    /// Print saved settings
    Show,
    /// List custom field keys defined in the Bento account
    Fields,
}

#[derive(Subcommand)]
enum SyncCommands {
    /// Start a sync and run it to completion
    Start {
        /// Sync type (primary or secondary)
        #[arg(short = 't', long = "type")]
        sync_type: String,
        /// Level or course ID to restrict to (0 for all)
        #[arg(short, long, default_value = "0")]
        filter: u64,
        /// Host snapshot file
        #[arg(short, long)]
        snapshot: PathBuf,
    },
    /// Show the last recorded progress
    Status {
        /// Sync type (primary or secondary)
        #[arg(short = 't', long = "type")]
        sync_type: String,
    },
}

fn load_config(cli: &Cli, paths: &Paths) -> Result<Config> {
    let Some(path) = &cli.config else {
        return Ok(Config::load(paths)?);
    };
    let mut config = Config::load_from_file(path)?;
    config.apply_overrides(|name| std::env::var(name).ok());
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = match &cli.base_dir {
        Some(base) => Paths::with_base_dir(base.clone()),
        None => Paths::new()?,
    };
    let config = load_config(&cli, &paths)?;

    let level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    init_logging(&level, Some(paths.log_file()));
    debug!(base_dir = %paths.base_dir().display(), "Configuration loaded");

    let app = App::open(paths, config, cli.dry_run)?;

    match cli.command {
        Commands::Settings { command } => match command {
            SettingsCommands::Import { file } => commands::settings_import(&app, &file)?,
            SettingsCommands::Show => commands::settings_show(&app)?,
            SettingsCommands::Fields => commands::settings_fields(&app).await?,
        },
        Commands::Resolve {
            event,
            user,
            payload,
            snapshot,
        } => commands::resolve(&app, &snapshot, &event, user, &payload)?,
        Commands::TestEvent { user, snapshot } => commands::test_event(&app, &snapshot, user).await?,
        Commands::Replay {
            snapshot,
            notifications,
        } => commands::replay(&app, &snapshot, &notifications).await?,
        Commands::Sync { command } => match command {
            SyncCommands::Start {
                sync_type,
                filter,
                snapshot,
            } => commands::sync_start(&app, &snapshot, &sync_type, filter).await?,
            SyncCommands::Status { sync_type } => commands::sync_status(&app, &sync_type)?,
        },
    }

    Ok(())
}
