use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tally_core::DatabaseConfig;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_MAX_KEYWORDS: usize = 20;
pub const DEFAULT_MAX_STEPS: usize = 20;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {details}")]
    InvalidConfiguration { details: String },
}

/// Step editor limits, defaulted and checked the same way wherever they
/// are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorLimits {
    pub max_keywords: usize,
    pub max_steps: usize,
}

impl EditorLimits {
    pub fn new(max_keywords: Option<usize>, max_steps: Option<usize>) -> Result<Self, ConfigError> {
        let limits = EditorLimits {
            max_keywords: max_keywords.unwrap_or(DEFAULT_MAX_KEYWORDS),
            max_steps: max_steps.unwrap_or(DEFAULT_MAX_STEPS),
        };
        if limits.max_keywords == 0 || limits.max_steps == 0 {
            return Err(ConfigError::InvalidConfiguration {
                details: "editor limits must be at least 1".to_string(),
            });
        }
        Ok(limits)
    }
}

impl Default for EditorLimits {
    fn default() -> Self {
        EditorLimits {
            max_keywords: DEFAULT_MAX_KEYWORDS,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    // Required fields
    pub address: String,
    pub database_url: String,

    // Fixed value
    pub api_base_url: String,

    // Connection pool settings (all optional with defaults)
    pub db_max_connections: Option<u32>,
    pub db_min_connections: Option<u32>,
    pub db_connect_timeout_secs: Option<u64>,
    pub db_acquire_timeout_secs: Option<u64>,

    // Funnel editor limits
    pub max_keywords: Option<usize>,
    pub max_steps: Option<usize>,
}

impl ServerConfig {
    /// Create a configuration, reading optional settings from `TALLY_*`
    /// environment variables.
    pub fn new(address: String, database_url: String) -> Result<Self, ConfigError> {
        Self::with_lookup(address, database_url, |key| std::env::var(key).ok())
    }

    /// Same as [`new`](Self::new) with an explicit variable source.
    pub fn with_lookup<F>(
        address: String,
        database_url: String,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if address.trim().is_empty() {
            return Err(ConfigError::InvalidConfiguration {
                details: "address must not be empty".to_string(),
            });
        }
        if database_url.trim().is_empty() {
            return Err(ConfigError::InvalidConfiguration {
                details: "database url must not be empty".to_string(),
            });
        }

        let limits = EditorLimits::new(
            parse_var(&lookup, "TALLY_MAX_KEYWORDS")?,
            parse_var(&lookup, "TALLY_MAX_STEPS")?,
        )?;

        let config = ServerConfig {
            address,
            database_url,
            api_base_url: "/api".to_string(),

            db_max_connections: parse_var(&lookup, "TALLY_DB_MAX_CONNECTIONS")?.or(Some(20)),
            db_min_connections: parse_var(&lookup, "TALLY_DB_MIN_CONNECTIONS")?.or(Some(2)),
            db_connect_timeout_secs: parse_var(&lookup, "TALLY_DB_CONNECT_TIMEOUT")?.or(Some(30)),
            db_acquire_timeout_secs: parse_var(&lookup, "TALLY_DB_ACQUIRE_TIMEOUT")?.or(Some(30)),

            max_keywords: Some(limits.max_keywords),
            max_steps: Some(limits.max_steps),
        };

        debug!(
            "Loaded server config: address={}, max_steps={}, max_keywords={}",
            config.address,
            config.max_steps(),
            config.max_keywords()
        );

        Ok(config)
    }

    /// Pool settings in the shape the database crate expects
    pub fn database_config(&self) -> DatabaseConfig {
        let defaults = DatabaseConfig::default();
        DatabaseConfig {
            url: self.database_url.clone(),
            max_connections: self.db_max_connections.unwrap_or(defaults.max_connections),
            min_connections: self.db_min_connections.unwrap_or(defaults.min_connections),
            connect_timeout_secs: self
                .db_connect_timeout_secs
                .unwrap_or(defaults.connect_timeout_secs),
            acquire_timeout_secs: self
                .db_acquire_timeout_secs
                .unwrap_or(defaults.acquire_timeout_secs),
        }
    }

    pub fn editor_limits(&self) -> EditorLimits {
        EditorLimits {
            max_keywords: self.max_keywords(),
            max_steps: self.max_steps(),
        }
    }

    pub fn max_keywords(&self) -> usize {
        self.max_keywords.unwrap_or(DEFAULT_MAX_KEYWORDS)
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps.unwrap_or(DEFAULT_MAX_STEPS)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::with_lookup(
            "127.0.0.1:8080".to_string(),
            "sqlite::memory:".to_string(),
            move |key| vars.get(key).cloned(),
        )
    }

    #[test]
    fn test_defaults() {
        let config = config_with(&[]).unwrap();
        assert_eq!(config.api_base_url, "/api");
        assert_eq!(config.max_keywords(), 20);
        assert_eq!(config.max_steps(), 20);

        let db = config.database_config();
        assert_eq!(db.url, "sqlite::memory:");
        assert_eq!(db.max_connections, 20);
        assert_eq!(db.min_connections, 2);
        assert!(db.is_sqlite());
    }

    #[test]
    fn test_env_overrides() {
        let config = config_with(&[
            ("TALLY_DB_MAX_CONNECTIONS", "50"),
            ("TALLY_MAX_KEYWORDS", "5"),
            ("TALLY_MAX_STEPS", " 12 "),
        ])
        .unwrap();

        assert_eq!(config.database_config().max_connections, 50);
        assert_eq!(config.max_keywords(), 5);
        assert_eq!(config.max_steps(), 12);
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let err = config_with(&[("TALLY_MAX_STEPS", "many")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "TALLY_MAX_STEPS".to_string(),
                value: "many".to_string()
            }
        );
    }

    #[test]
    fn test_zero_limit_rejected() {
        let err = config_with(&[("TALLY_MAX_KEYWORDS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_editor_limits_defaults_and_zero() {
        assert_eq!(EditorLimits::new(None, None).unwrap(), EditorLimits::default());
        assert_eq!(
            EditorLimits::new(None, Some(7)).unwrap(),
            EditorLimits {
                max_keywords: 20,
                max_steps: 7
            }
        );
        assert!(matches!(
            EditorLimits::new(None, Some(0)),
            Err(ConfigError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            EditorLimits::new(Some(0), None),
            Err(ConfigError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_server_config_exposes_editor_limits() {
        let config = config_with(&[("TALLY_MAX_STEPS", "4")]).unwrap();
        assert_eq!(config.editor_limits().max_steps, 4);
        assert_eq!(config.editor_limits().max_keywords, 20);
    }

    #[test]
    fn test_empty_database_url_rejected() {
        let err = ServerConfig::with_lookup("0.0.0.0:80".into(), "  ".into(), |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_serializes_for_diagnostics() {
        let config = config_with(&[]).unwrap();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["address"], "127.0.0.1:8080");
        assert_eq!(json["max_steps"], 20);
    }
}
