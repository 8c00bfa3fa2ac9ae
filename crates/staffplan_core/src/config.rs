//! Runtime configuration read from the environment.
//!
//! # Responsibility
//! - Resolve database location and logging settings for the engine.
//! - Keep parsing separate from `std::env` so it can be tested with a map.
//!
//! # Invariants
//! - A configured log directory is always absolute.
//! - Log levels are normalized to one of `trace|debug|info|warn|error`.

use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DB_PATH_ENV: &str = "STAFFPLAN_DB";
pub const LOG_LEVEL_ENV: &str = "STAFFPLAN_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "STAFFPLAN_LOG_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    UnsupportedLogLevel(String),
    RelativeLogDir(String),
    EmptyValue(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLogLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::RelativeLogDir(dir) => {
                write!(f, "log directory must be an absolute path, got `{dir}`")
            }
            Self::EmptyValue(key) => write!(f, "{key} is set but empty"),
        }
    }
}

impl Error for ConfigError {}

/// File logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: &'static str,
    pub log_dir: PathBuf,
}

impl LogConfig {
    pub fn new(level: &str, log_dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let level = normalize_level(level)
            .ok_or_else(|| ConfigError::UnsupportedLogLevel(level.trim().to_string()))?;
        let log_dir = log_dir.as_ref();
        if log_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyValue(LOG_DIR_ENV));
        }
        if !log_dir.is_absolute() {
            return Err(ConfigError::RelativeLogDir(log_dir.display().to_string()));
        }
        Ok(Self {
            level,
            log_dir: log_dir.to_path_buf(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// `None` opens an in-memory database.
    pub db_path: Option<PathBuf>,
    /// `None` leaves file logging disabled.
    pub log: Option<LogConfig>,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, e.g. a map in tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = match lookup(DB_PATH_ENV) {
            Some(value) if value.trim().is_empty() => {
                return Err(ConfigError::EmptyValue(DB_PATH_ENV))
            }
            Some(value) => Some(PathBuf::from(value.trim())),
            None => None,
        };

        let level = lookup(LOG_LEVEL_ENV).unwrap_or_else(|| default_log_level().to_string());
        let log = match lookup(LOG_DIR_ENV) {
            Some(dir) => Some(LogConfig::new(&level, dir.trim())?),
            None => {
                // Validate the level even when logging stays off.
                normalize_level(&level)
                    .ok_or_else(|| ConfigError::UnsupportedLogLevel(level.trim().to_string()))?;
                None
            }
        };

        Ok(Self { db_path, log })
    }
}
