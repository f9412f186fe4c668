use serde::{Deserialize, Serialize};

/// Main configuration structure for Upkeep
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Occurrence generation and preview configuration
    #[serde(default)]
    pub recurrence: RecurrenceConfig,

    /// Work-order materialization configuration
    #[serde(default)]
    pub materialization: MaterializationConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".upkeep/upkeep.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// `sqlx` connection URL for the configured path.
    pub fn url(&self) -> String {
        if self.path.starts_with("sqlite:") {
            self.path.clone()
        } else {
            format!("sqlite:{}", self.path)
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// File rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Occurrence generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RecurrenceConfig {
    /// Weeks scanned by weekly rules before giving up
    #[serde(default = "default_weekly_horizon_weeks")]
    pub weekly_horizon_weeks: u32,

    /// Calendar months scanned by monthly rules before giving up
    #[serde(default = "default_monthly_horizon_months")]
    pub monthly_horizon_months: u32,

    /// Number of dates shown in a preview
    #[serde(default = "default_preview_count")]
    pub preview_count: usize,

    /// `strftime` pattern used to display preview dates
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

const fn default_weekly_horizon_weeks() -> u32 {
    52
}

const fn default_monthly_horizon_months() -> u32 {
    12
}

const fn default_preview_count() -> usize {
    10
}

fn default_date_format() -> String {
    "%d/%m/%Y".to_string()
}

impl Default for RecurrenceConfig {
    fn default() -> Self {
        Self {
            weekly_horizon_weeks: default_weekly_horizon_weeks(),
            monthly_horizon_months: default_monthly_horizon_months(),
            preview_count: default_preview_count(),
            date_format: default_date_format(),
        }
    }
}

/// Work-order materialization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MaterializationConfig {
    /// Materialize through the end of the month this many months ahead
    #[serde(default = "default_lookahead_months")]
    pub lookahead_months: u32,

    /// Maximum work orders created for one plan in one run
    #[serde(default = "default_max_per_plan")]
    pub max_per_plan: usize,

    /// Seconds between automatic materialization runs in daemon mode
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Consecutive failed runs before the daemon gives up
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
}

const fn default_lookahead_months() -> u32 {
    1
}

const fn default_max_per_plan() -> usize {
    100
}

const fn default_poll_interval_secs() -> u64 {
    3600
}

const fn default_max_consecutive_failures() -> u32 {
    5
}

impl Default for MaterializationConfig {
    fn default() -> Self {
        Self {
            lookahead_months: default_lookahead_months(),
            max_per_plan: default_max_per_plan(),
            poll_interval_secs: default_poll_interval_secs(),
            max_consecutive_failures: default_max_consecutive_failures(),
        }
    }
}
