//! Read-only preview of upcoming occurrences.
//!
//! Used by the plan editor to show "next N dates" before a plan is saved.
//! All date math is delegated to [`OccurrenceGenerator`].

use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::models::config::RecurrenceConfig;
use crate::domain::models::frequency::{validate, FrequencySpec, RawFrequency, ValidationErrors};
use crate::services::occurrence_generator::{OccurrenceGenerator, ScanHorizon};

/// Informational note attached to a short preview. Never blocks a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PreviewNotice {
    /// The rule yields no upcoming dates within the scan horizon.
    NoUpcomingDates,
    /// The rule yields some dates, but fewer than a full preview.
    FewerThanRequested { requested: usize, found: usize },
}

impl PreviewNotice {
    pub fn message(&self) -> String {
        match self {
            Self::NoUpcomingDates => "No upcoming dates with this configuration".to_string(),
            Self::FewerThanRequested { requested, found } => {
                format!("Only {found} of {requested} upcoming dates with this configuration")
            }
        }
    }
}

/// Upcoming occurrences of a rule, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    pub dates: Vec<NaiveDate>,
    /// `dates` rendered with the configured date format.
    pub formatted: Vec<String>,
    /// More occurrences exist beyond the preview window.
    pub has_more: bool,
    pub notice: Option<PreviewNotice>,
}

#[derive(Debug, Clone)]
pub struct RecurrencePreviewer {
    generator: OccurrenceGenerator,
    count: usize,
    date_format: String,
}

impl Default for RecurrencePreviewer {
    fn default() -> Self {
        Self::from_config(&RecurrenceConfig::default())
    }
}

impl RecurrencePreviewer {
    pub fn new(generator: OccurrenceGenerator, count: usize, date_format: impl Into<String>) -> Self {
        Self {
            generator,
            count,
            date_format: date_format.into(),
        }
    }

    pub fn from_config(config: &RecurrenceConfig) -> Self {
        let horizon = ScanHorizon {
            weeks: config.weekly_horizon_weeks,
            months: config.monthly_horizon_months,
        };
        Self::new(
            OccurrenceGenerator::new(horizon),
            config.preview_count,
            config.date_format.clone(),
        )
    }

    /// Number of dates shown in a preview.
    pub const fn count(&self) -> usize {
        self.count
    }

    /// First occurrences of `spec` on or after `start`.
    pub fn preview(&self, spec: &FrequencySpec, start: NaiveDate) -> Preview {
        let mut dates = self.generator.generate(spec, start, self.count.saturating_add(1));
        let has_more = dates.len() > self.count;
        dates.truncate(self.count);

        let notice = if dates.is_empty() {
            Some(PreviewNotice::NoUpcomingDates)
        } else if dates.len() < self.count {
            Some(PreviewNotice::FewerThanRequested {
                requested: self.count,
                found: dates.len(),
            })
        } else {
            None
        };

        let formatted = dates.iter().map(|d| self.format_date(*d)).collect();
        Preview {
            dates,
            formatted,
            has_more,
            notice,
        }
    }

    /// Validate a form's rule, then preview it.
    pub fn preview_raw(&self, raw: &RawFrequency, start: NaiveDate) -> Result<Preview, ValidationErrors> {
        let spec = validate(raw)?;
        Ok(self.preview(&spec, start))
    }

    /// Format with the configured pattern, falling back to ISO-8601 when the
    /// pattern is unusable.
    pub fn format_date(&self, date: NaiveDate) -> String {
        let mut out = String::new();
        if write!(out, "{}", date.format(&self.date_format)).is_err() {
            return date.format("%Y-%m-%d").to_string();
        }
        out
    }
}
