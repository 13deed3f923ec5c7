//! Startup configuration for the storage binding and logging.
//!
//! # Responsibility
//! - Describe which backend the process binds and how calls are bounded.
//! - Load settings from JSON or `BOOKSHELF_*` environment variables.
//!
//! # Invariants
//! - Configuration is read once at startup and not mutated afterwards.
//! - Unknown backend names are rejected, never defaulted.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_BACKEND: &str = "BOOKSHELF_BACKEND";
pub const ENV_DB_PATH: &str = "BOOKSHELF_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "BOOKSHELF_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "BOOKSHELF_LOG_DIR";
pub const ENV_CALL_TIMEOUT_MS: &str = "BOOKSHELF_CALL_TIMEOUT_MS";

/// Storage backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// In-memory reference adapter; state is lost on exit.
    Memory,
    /// SQLite adapter. `path: None` opens an in-memory database.
    Sqlite {
        #[serde(default)]
        path: Option<PathBuf>,
    },
}

/// Process-wide settings resolved at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub backend: BackendConfig,
    pub log_level: String,
    /// Absolute directory for rolling log files; logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    /// Per-call deadline applied by services; unbounded when unset.
    pub call_timeout_ms: Option<u64>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::Memory,
            log_level: default_log_level().to_string(),
            log_dir: None,
            call_timeout_ms: None,
        }
    }
}

/// Configuration parse errors.
#[derive(Debug)]
pub enum ConfigError {
    InvalidJson(serde_json::Error),
    UnknownBackend(String),
    InvalidTimeout(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidJson(err) => write!(f, "invalid configuration json: {err}"),
            Self::UnknownBackend(value) => {
                write!(f, "unknown backend `{value}`; expected memory|sqlite")
            }
            Self::InvalidTimeout(value) => {
                write!(f, "call timeout must be a positive integer of milliseconds, got `{value}`")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidJson(err) => Some(err),
            Self::UnknownBackend(_) | Self::InvalidTimeout(_) => None,
        }
    }
}

impl CoreConfig {
    /// Parses a JSON document; missing keys fall back to defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(ConfigError::InvalidJson)?;
        if config.call_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidTimeout("0".to_string()));
        }
        Ok(config)
    }

    /// Reads `BOOKSHELF_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves settings through `lookup`, one key at a time.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let db_path = non_blank(ENV_DB_PATH).map(PathBuf::from);
        config.backend = match non_blank(ENV_BACKEND) {
            None if db_path.is_some() => BackendConfig::Sqlite { path: db_path },
            None => BackendConfig::Memory,
            Some(name) => match name.trim().to_ascii_lowercase().as_str() {
                "memory" => BackendConfig::Memory,
                "sqlite" => BackendConfig::Sqlite { path: db_path },
                _ => return Err(ConfigError::UnknownBackend(name)),
            },
        };

        if let Some(level) = non_blank(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        config.log_dir = non_blank(ENV_LOG_DIR).map(PathBuf::from);

        if let Some(raw) = non_blank(ENV_CALL_TIMEOUT_MS) {
            let millis = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|millis| *millis > 0)
                .ok_or_else(|| ConfigError::InvalidTimeout(raw.clone()))?;
            config.call_timeout_ms = Some(millis);
        }

        Ok(config)
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BackendConfig, ConfigError, CoreConfig, ENV_BACKEND, ENV_CALL_TIMEOUT_MS, ENV_DB_PATH,
    };
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_memory_backend() {
        let config = CoreConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.backend, BackendConfig::Memory);
    }

    #[test]
    fn db_path_alone_selects_sqlite() {
        let config =
            CoreConfig::from_lookup(lookup_from(&[(ENV_DB_PATH, "/tmp/books.db")])).unwrap();
        assert_eq!(
            config.backend,
            BackendConfig::Sqlite {
                path: Some(PathBuf::from("/tmp/books.db"))
            }
        );
    }

    #[test]
    fn rejects_unknown_backend_and_bad_timeout() {
        let err = CoreConfig::from_lookup(lookup_from(&[(ENV_BACKEND, "fedora")])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownBackend(name) if name == "fedora"));

        let err =
            CoreConfig::from_lookup(lookup_from(&[(ENV_CALL_TIMEOUT_MS, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimeout(_)));

        let err = CoreConfig::from_json_str(r#"{ "call_timeout_ms": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimeout(value) if value == "0"));
    }

    #[test]
    fn json_config_fills_missing_keys_with_defaults() {
        let config = CoreConfig::from_json_str(
            r#"{ "backend": { "kind": "sqlite" }, "call_timeout_ms": 250 }"#,
        )
        .unwrap();
        assert_eq!(config.backend, BackendConfig::Sqlite { path: None });
        assert_eq!(config.call_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.log_level, CoreConfig::default().log_level);
    }
}
