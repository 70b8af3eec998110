//! Service configuration: TOML file first, environment variables on top

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::Database;

pub const CONFIG_ENV: &str = "LEARN_SWIPING_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: PathBuf,
    pub bind_address: String,
    pub port: u16,
    /// Deadline for a single request's store work
    pub request_timeout_ms: u64,
    /// How long a connection waits on a locked database
    pub busy_timeout_ms: u64,
    pub token_ttl_days: i64,
    /// Default `env_logger` filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            bind_address: "0.0.0.0".to_string(),
            port: 9999,
            request_timeout_ms: 5000,
            busy_timeout_ms: 2000,
            token_ttl_days: crate::accounts::storage::DEFAULT_TOKEN_TTL_DAYS,
            log_level: "info".to_string(),
        }
    }
}

/// `<data dir>/learn-swiping/learn-swiping.db`, or the working directory if
/// the platform has no data dir
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("learn-swiping"))
        .unwrap_or_default()
        .join("learn-swiping.db")
}

impl Config {
    /// Load from `path` (or `$LEARN_SWIPING_CONFIG`), then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match file {
            Some(file) => Self::from_file(&file)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&text)?;
        log::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Overlay values found through `lookup`, keyed by environment variable name
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("LEARN_SWIPING_DB") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(address) = lookup("LEARN_SWIPING_BIND") {
            self.bind_address = address;
        }
        if let Some(port) = parse_override(&lookup, "PORT")? {
            self.port = port;
        }
        if let Some(timeout) = parse_override(&lookup, "LEARN_SWIPING_TIMEOUT_MS")? {
            self.request_timeout_ms = timeout;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "request_timeout_ms",
                reason: "must be positive".to_string(),
            });
        }
        if self.token_ttl_days <= 0 {
            return Err(ConfigError::Invalid {
                key: "token_ttl_days",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.token_ttl_days)
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Open (and migrate) the configured database
    pub fn open_database(&self) -> crate::error::Result<Database> {
        Database::open(self.database_path.clone(), self.busy_timeout())
    }
}

fn parse_override<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => {
            let value = raw.trim().parse().map_err(|e: T::Err| {
                log::warn!("Invalid {} value: {}", key, e);
                ConfigError::Invalid {
                    key,
                    reason: e.to_string(),
                }
            })?;
            log::debug!("{} overridden from environment", key);
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 9999);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.token_ttl(), chrono::Duration::days(7));
        assert!(config.database_path.ends_with("learn-swiping.db"));
    }

    #[test]
    fn test_file_with_partial_keys() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "port = 8080\nlog_level = \"debug\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.busy_timeout_ms, 2000);
    }

    #[test]
    fn test_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "port = \"not a number\"").unwrap();

        assert!(matches!(Config::from_file(&path), Err(ConfigError::Parse(_))));
        assert!(matches!(
            Config::from_file(&temp_dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_environment_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[
                ("LEARN_SWIPING_DB", "/tmp/cards.db"),
                ("PORT", "7000"),
                ("LEARN_SWIPING_TIMEOUT_MS", "250"),
            ]))
            .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/cards.db"));
        assert_eq!(config.port, 7000);
        assert_eq!(config.request_timeout_ms, 250);
        assert_eq!(config.listen_address(), "0.0.0.0:7000");
    }

    #[test]
    fn test_invalid_override() {
        let mut config = Config::default();
        let result = config.apply_overrides(env(&[("PORT", "ninety")]));
        assert!(matches!(result, Err(ConfigError::Invalid { key: "PORT", .. })));
    }

    #[test]
    fn test_validation() {
        let config = Config {
            token_ttl_days: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(Config::default().validate().is_ok());
    }
}
