use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;

use learn_swiping::accounts::{Account, AccountStore};
use learn_swiping::{Config, Database};

/// Shared state for CLI commands
pub struct App {
    pub db: Database,
}

impl App {
    /// Load config and apply the `--database` override
    pub fn load_config(config_path: Option<&Path>, database: Option<PathBuf>) -> Result<Config> {
        let mut config = Config::load(config_path).context("Failed to load config")?;
        if let Some(database) = database {
            config.database_path = database;
        }
        Ok(config)
    }

    /// Open (migrating) the configured database
    pub fn new(config: &Config) -> Result<Self> {
        let db = config
            .open_database()
            .with_context(|| format!("Failed to open database {:?}", config.database_path))?;

        Ok(Self { db })
    }

    pub fn connect(&self) -> Result<Connection> {
        self.db.connect().context("Failed to connect to database")
    }

    /// Resolve a bearer token the way the server does
    pub fn account(&self, conn: &Connection, token: &str) -> Result<Account> {
        AccountStore::new(conn)
            .resolve(token)
            .context("Token does not belong to a live account")
    }
}
