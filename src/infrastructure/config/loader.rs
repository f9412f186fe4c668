use std::path::Path;

use anyhow::{Context, Result};
use chrono::format::{Item, StrftimeItems};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project-local configuration directory.
pub const CONFIG_DIR: &str = ".upkeep";

/// Prefix for environment overrides, e.g. `UPKEEP_LOGGING__LEVEL=debug`.
pub const ENV_PREFIX: &str = "UPKEEP_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid {field}: {value}. Must be at least 1")]
    InvalidHorizon { field: &'static str, value: u32 },

    #[error("Invalid preview_count: {0}. Must be between 1 and 100")]
    InvalidPreviewCount(usize),

    #[error("Invalid date_format: {0}")]
    InvalidDateFormat(String),

    #[error("Invalid max_per_plan: {0}. Must be at least 1")]
    InvalidMaxPerPlan(usize),

    #[error("Invalid poll_interval_secs: {0}. Must be at least 1")]
    InvalidPollInterval(u64),

    #[error("Invalid max_consecutive_failures: {0}. Must be at least 1")]
    InvalidMaxFailures(u32),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. .upkeep/config.yaml
    /// 3. .upkeep/local.yaml (optional overrides)
    /// 4. Environment variables (`UPKEEP_*`, `__` between sections)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(CONFIG_DIR)
    }

    /// Same as [`ConfigLoader::load`], reading the YAML files from `dir`.
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

    /// Load configuration from a specific file, still honoring environment
    /// overrides.
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

        let logging = &config.logging;
        if !["trace", "debug", "info", "warn", "error"].contains(&logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(logging.level.clone()));
        }
        if !["json", "pretty"].contains(&logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(logging.format.clone()));
        }
        if !["daily", "hourly", "never"].contains(&logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(logging.rotation.clone()));
        }

        let recurrence = &config.recurrence;
        if recurrence.weekly_horizon_weeks == 0 {
            return Err(ConfigError::InvalidHorizon {
                field: "weekly_horizon_weeks",
                value: recurrence.weekly_horizon_weeks,
            });
        }
        if recurrence.monthly_horizon_months == 0 {
            return Err(ConfigError::InvalidHorizon {
                field: "monthly_horizon_months",
                value: recurrence.monthly_horizon_months,
            });
        }
        if recurrence.preview_count == 0 || recurrence.preview_count > 100 {
            return Err(ConfigError::InvalidPreviewCount(recurrence.preview_count));
        }
        if recurrence.date_format.is_empty()
            || StrftimeItems::new(&recurrence.date_format).any(|item| matches!(item, Item::Error))
        {
            return Err(ConfigError::InvalidDateFormat(recurrence.date_format.clone()));
        }

        let materialization = &config.materialization;
        if materialization.max_per_plan == 0 {
            return Err(ConfigError::InvalidMaxPerPlan(materialization.max_per_plan));
        }
        if materialization.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidPollInterval(materialization.poll_interval_secs));
        }
        if materialization.max_consecutive_failures == 0 {
            return Err(ConfigError::InvalidMaxFailures(
                materialization.max_consecutive_failures,
            ));
        }

        Ok(())
    }
}
