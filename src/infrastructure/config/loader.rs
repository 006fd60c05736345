use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Directory holding project-local configuration and the default database.
pub const CONFIG_DIR: &str = ".reposcore";

/// Prefix of environment overrides. Nested keys use `__`, e.g.
/// `REPOSCORE_WORKER__MAX_CONCURRENT=8`.
pub const ENV_PREFIX: &str = "REPOSCORE_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["json", "pretty"];
const ROTATIONS: [&str; 3] = ["daily", "hourly", "never"];

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Worker command cannot be empty")]
    EmptyWorkerCommand,

    #[error("Invalid max_concurrent: {0}. Must be between 1 and 64")]
    InvalidMaxConcurrent(usize),

    #[error("Invalid event_timeout_secs: {0}. Must be at least 1")]
    InvalidEventTimeout(u64),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must not exceed max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid polling interval: {0}. Must be at least 1 second")]
    InvalidPollInterval(u64),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the current directory.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. .reposcore/config.yaml (created by init)
    /// 3. .reposcore/local.yaml (optional local overrides)
    /// 4. REPOSCORE_* environment variables
    pub fn load() -> Result<Config> {
        Self::load_from_dir(CONFIG_DIR)
    }

    /// Same as [`Self::load`] with the config directory at `dir`.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Config> {
        let dir = dir.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load an explicit file; environment overrides still apply.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        if !LOG_LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        if !LOG_FORMATS.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }
        if !ROTATIONS.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        if config.worker.command.trim().is_empty() {
            return Err(ConfigError::EmptyWorkerCommand);
        }
        if config.worker.max_concurrent == 0 || config.worker.max_concurrent > 64 {
            return Err(ConfigError::InvalidMaxConcurrent(config.worker.max_concurrent));
        }
        if config.worker.event_timeout_secs == 0 {
            return Err(ConfigError::InvalidEventTimeout(config.worker.event_timeout_secs));
        }

        if config.retry.initial_backoff_ms > config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        if config.polling.interval_secs == 0 {
            return Err(ConfigError::InvalidPollInterval(config.polling.interval_secs));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) {
        fs::write(dir.path().join(name), contents).unwrap();
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.database.path, ".reposcore/reposcore.db");
        assert_eq!(config.retry.max_retries, 5);
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = temp_env::with_vars_unset(["REPOSCORE_WORKER__MAX_CONCURRENT"], || {
            ConfigLoader::load_from_dir(dir.path()).unwrap()
        });
        assert_eq!(config.worker.max_concurrent, 4);
        assert_eq!(config.polling.interval_secs, 3);
    }

    #[test]
    fn test_local_overrides_project_config() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "config.yaml",
            "worker:\n  command: node\n  max_concurrent: 2\nlogging:\n  level: debug\n  format: json\n",
        );
        write(&dir, "local.yaml", "worker:\n  max_concurrent: 6\nlogging:\n  level: warn\n");

        let config = ConfigLoader::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.worker.max_concurrent, 6, "local.yaml should win");
        assert_eq!(config.worker.command, "node", "unset keys keep project values");
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_env_overrides_files() {
        let dir = TempDir::new().unwrap();
        write(&dir, "config.yaml", "retry:\n  max_retries: 2\n");

        let config = temp_env::with_vars(
            [
                ("REPOSCORE_RETRY__MAX_RETRIES", Some("7")),
                ("REPOSCORE_SCORING__BASE_SCORE", Some("50")),
            ],
            || ConfigLoader::load_from_dir(dir.path()).unwrap(),
        );
        assert_eq!(config.retry.max_retries, 7);
        assert_eq!(config.scoring.base_score, 50);
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let err = ConfigLoader::load_from_file(dir.path().join("nope.yaml")).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_invalid_file_value_is_rejected() {
        let dir = TempDir::new().unwrap();
        write(&dir, "custom.yaml", "worker:\n  max_concurrent: 0\n");
        let err = ConfigLoader::load_from_file(dir.path().join("custom.yaml")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidMaxConcurrent(0))
        ));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "loud"),
            other => panic!("Expected InvalidLogLevel, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format_and_rotation() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogFormat(_))
        ));

        let mut config = Config::default();
        config.logging.rotation = "weekly".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidRotation(_))
        ));
    }

    #[test]
    fn test_validate_database() {
        let mut config = Config::default();
        config.database.path = "  ".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyDatabasePath)
        ));

        let mut config = Config::default();
        config.database.max_connections = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxConnections(0))
        ));
    }

    #[test]
    fn test_validate_worker() {
        let mut config = Config::default();
        config.worker.command = String::new();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyWorkerCommand)
        ));

        let mut config = Config::default();
        config.worker.max_concurrent = 65;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxConcurrent(65))
        ));

        let mut config = Config::default();
        config.worker.event_timeout_secs = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidEventTimeout(0))
        ));
    }

    #[test]
    fn test_validate_backoff_and_polling() {
        let mut config = Config::default();
        config.retry.initial_backoff_ms = 30_000;
        config.retry.max_backoff_ms = 10_000;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidBackoff(30_000, 10_000))
        ));

        let mut config = Config::default();
        config.retry.max_retries = 0;
        assert!(ConfigLoader::validate(&config).is_ok(), "zero retries is allowed");

        let mut config = Config::default();
        config.polling.interval_secs = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidPollInterval(0))
        ));
    }
}
