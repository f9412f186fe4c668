//! CLI command implementations.

pub mod daemon;
pub mod materialize;
pub mod plan;
pub mod preview;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use sqlx::SqlitePool;

use crate::adapters::sqlite::initialize_database;
use crate::domain::errors::DomainError;
use crate::domain::models::config::Config;
use crate::domain::models::frequency::{validate, FrequencySpec, RawFrequency};
use crate::services::occurrence_generator::{OccurrenceGenerator, ScanHorizon};

/// Frequency rule flags shared by `preview`, `plan create` and
/// `plan set-frequency`.
#[derive(Args, Debug, Clone, Default)]
pub struct FrequencyArgs {
    /// Frequency kind: daily, weekly, monthly or custom
    #[arg(short, long)]
    pub kind: Option<String>,

    /// Repeat every N days, weeks or months (default 1)
    #[arg(long, allow_negative_numbers = true)]
    pub interval: Option<i64>,

    /// Weekdays for weekly rules, e.g. mon,thu
    #[arg(long, value_delimiter = ',')]
    pub weekdays: Vec<String>,

    /// Day of month for monthly rules (clamped to short months)
    #[arg(long, allow_negative_numbers = true)]
    pub day_of_month: Option<i64>,

    /// Which occurrence of --weekday in the month (1-4)
    #[arg(long, allow_negative_numbers = true)]
    pub ordinal: Option<i64>,

    /// Weekday for an ordinal monthly rule, e.g. tue
    #[arg(long)]
    pub weekday: Option<String>,

    /// Explicit dates for custom rules (YYYY-MM-DD, comma separated)
    #[arg(long, value_delimiter = ',')]
    pub dates: Vec<String>,
}

impl FrequencyArgs {
    pub fn to_raw(&self) -> RawFrequency {
        RawFrequency {
            kind: self.kind.clone(),
            interval: self.interval,
            weekdays: self.weekdays.clone(),
            day_of_month: self.day_of_month,
            ordinal: self.ordinal,
            weekday: self.weekday.clone(),
            dates: self.dates.clone(),
        }
    }

    /// Validate the flags into a frequency rule.
    pub fn to_spec(&self) -> Result<FrequencySpec, DomainError> {
        Ok(validate(&self.to_raw())?)
    }
}

/// Largest number of dates a preview may show.
pub const MAX_PREVIEW_COUNT: usize = 100;

/// Parse a `--count` flag, keeping it within 1..=100.
pub fn parse_count(value: &str) -> Result<usize, String> {
    let count: usize = value.parse().map_err(|_| format!("'{value}' is not a number"))?;
    if count == 0 || count > MAX_PREVIEW_COUNT {
        return Err(format!("must be between 1 and {MAX_PREVIEW_COUNT}"));
    }
    Ok(count)
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn generator_for(config: &Config) -> OccurrenceGenerator {
    OccurrenceGenerator::new(ScanHorizon {
        weeks: config.recurrence.weekly_horizon_weeks,
        months: config.recurrence.monthly_horizon_months,
    })
}

pub async fn open_database(config: &Config) -> Result<SqlitePool> {
    initialize_database(&config.database)
        .await
        .with_context(|| format!("Failed to open database at {}", config.database.path))
}
