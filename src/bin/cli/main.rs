mod app;
mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "learn-swiping-cli", about = "Learn Swiping maintenance CLI", version)]
struct Cli {
    /// Path to a TOML config file (default: $LEARN_SWIPING_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the database path from the config
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database or migrate it to the latest schema
    Init,

    /// Count hidden cards down by a number of days
    AdvanceDays {
        /// Days to advance
        days: u32,
    },

    /// List the cards due for an account in a deck
    Due {
        /// Bearer token of the account
        token: String,
        /// Deck id
        deck: i64,
    },

    /// Show an account's progress through a deck
    Summary {
        /// Bearer token of the account
        token: String,
        /// Deck id
        deck: i64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = app::App::load_config(cli.config.as_deref(), cli.database)?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    let app = app::App::new(&config)?;

    match cli.command {
        Command::Init => commands::init::run(&app, &cli.format)?,
        Command::AdvanceDays { days } => commands::advance_days::run(&app, days, &cli.format)?,
        Command::Due { token, deck } => commands::due::run(&app, &token, deck, &cli.format)?,
        Command::Summary { token, deck } => {
            commands::summary::run(&app, &token, deck, &cli.format)?
        }
    }

    Ok(())
}
