//! Frequency rules for preventive-maintenance plans.
//!
//! A [`FrequencySpec`] is the validated, typed description of "how often" a
//! plan comes due. Forms and CLI flags produce a loosely typed
//! [`RawFrequency`]; [`validate`] turns it into a spec or reports one
//! [`ValidationError`] per offending field.
//!
//! Stored specs are JSON with a `kind` tag:
//!
//! ```json
//! {"kind":"weekly","interval_weeks":2,"weekdays":["mon","thu"]}
//! {"kind":"monthly","interval_months":1,"anchor":{"type":"day_of_month","day":31}}
//! ```
//!
//! Deserializing a stored spec runs the same validation as [`validate`].

use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest ordinal accepted for an nth-weekday anchor.
///
/// Every weekday occurs at least four times in every month, so ordinals
/// 1..=4 always resolve. A fifth occurrence exists only in some months and
/// is rejected.
pub const MAX_WEEKDAY_ORDINAL: u32 = 4;

/// Highest day accepted for a day-of-month anchor.
pub const MAX_DAY_OF_MONTH: u32 = 31;

/// Day of the week, ordered Sunday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Sun,
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
}

impl DayOfWeek {
    /// All days, Sunday first.
    pub const ALL: [Self; 7] = [
        Self::Sun,
        Self::Mon,
        Self::Tue,
        Self::Wed,
        Self::Thu,
        Self::Fri,
        Self::Sat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sun => "sun",
            Self::Mon => "mon",
            Self::Tue => "tue",
            Self::Wed => "wed",
            Self::Thu => "thu",
            Self::Fri => "fri",
            Self::Sat => "sat",
        }
    }

    /// Parse a weekday from a short name, full name, or number (0 = Sunday).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sun" | "sunday" | "0" => Some(Self::Sun),
            "mon" | "monday" | "1" => Some(Self::Mon),
            "tue" | "tues" | "tuesday" | "2" => Some(Self::Tue),
            "wed" | "wednesday" | "3" => Some(Self::Wed),
            "thu" | "thur" | "thurs" | "thursday" | "4" => Some(Self::Thu),
            "fri" | "friday" | "5" => Some(Self::Fri),
            "sat" | "saturday" | "6" => Some(Self::Sat),
            _ => None,
        }
    }

    /// Days since Sunday, 0..=6.
    pub const fn days_from_sunday(self) -> u32 {
        self as u32
    }

    pub fn of(date: NaiveDate) -> Self {
        use chrono::Datelike;
        Self::from(date.weekday())
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        Self::ALL[day.num_days_from_sunday() as usize]
    }
}

impl From<DayOfWeek> for Weekday {
    fn from(day: DayOfWeek) -> Self {
        match day {
            DayOfWeek::Sun => Weekday::Sun,
            DayOfWeek::Mon => Weekday::Mon,
            DayOfWeek::Tue => Weekday::Tue,
            DayOfWeek::Wed => Weekday::Wed,
            DayOfWeek::Thu => Weekday::Thu,
            DayOfWeek::Fri => Weekday::Fri,
            DayOfWeek::Sat => Weekday::Sat,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which day of the month a monthly rule lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", try_from = "StoredAnchor")]
pub enum MonthlyAnchor {
    /// Intended day of the month. Clamped to the last day of shorter months.
    DayOfMonth { day: u32 },
    /// The `ordinal`-th `weekday` of the month, e.g. the third Tuesday.
    NthWeekdayOfMonth { ordinal: u32, weekday: DayOfWeek },
}

impl MonthlyAnchor {
    pub fn day_of_month(day: u32) -> Result<Self, ValidationError> {
        if day == 0 || day > MAX_DAY_OF_MONTH {
            return Err(ValidationError::DayOutOfRange(i64::from(day)));
        }
        Ok(Self::DayOfMonth { day })
    }

    pub fn nth_weekday(ordinal: u32, weekday: DayOfWeek) -> Result<Self, ValidationError> {
        if ordinal == 0 || ordinal > MAX_WEEKDAY_ORDINAL {
            return Err(ValidationError::OrdinalOutOfRange(i64::from(ordinal)));
        }
        Ok(Self::NthWeekdayOfMonth { ordinal, weekday })
    }

    pub fn description(&self) -> String {
        match self {
            Self::DayOfMonth { day } => format!("on day {day}"),
            Self::NthWeekdayOfMonth { ordinal, weekday } => {
                let suffix = match ordinal {
                    1 => "st",
                    2 => "nd",
                    3 => "rd",
                    _ => "th",
                };
                format!("on the {ordinal}{suffix} {weekday}")
            }
        }
    }
}

/// Discriminant of a [`FrequencySpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyKind {
    Daily,
    Weekly,
    Monthly,
    Custom,
}

impl FrequencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Custom => "custom",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// A validated recurrence rule.
///
/// Values are immutable once attached to a plan; changing a plan's frequency
/// replaces the whole spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", try_from = "StoredFrequency")]
pub enum FrequencySpec {
    /// Every `interval_days` days.
    Daily { interval_days: u32 },
    /// On the listed weekdays of every `interval_weeks`-th week.
    Weekly {
        interval_weeks: u32,
        weekdays: BTreeSet<DayOfWeek>,
    },
    /// Once in every `interval_months`-th month, on the anchor day.
    Monthly {
        interval_months: u32,
        anchor: MonthlyAnchor,
    },
    /// An explicit list of dates.
    Custom { dates: BTreeSet<NaiveDate> },
}

impl FrequencySpec {
    pub fn daily(interval_days: u32) -> Result<Self, ValidationError> {
        Ok(Self::Daily {
            interval_days: positive_interval("interval_days", i64::from(interval_days))?,
        })
    }

    pub fn weekly(
        interval_weeks: u32,
        weekdays: impl IntoIterator<Item = DayOfWeek>,
    ) -> Result<Self, ValidationError> {
        let interval_weeks = positive_interval("interval_weeks", i64::from(interval_weeks))?;
        let weekdays: BTreeSet<DayOfWeek> = weekdays.into_iter().collect();
        if weekdays.is_empty() {
            return Err(ValidationError::EmptyWeekdays);
        }
        Ok(Self::Weekly {
            interval_weeks,
            weekdays,
        })
    }

    pub fn monthly(interval_months: u32, anchor: MonthlyAnchor) -> Result<Self, ValidationError> {
        Ok(Self::Monthly {
            interval_months: positive_interval("interval_months", i64::from(interval_months))?,
            anchor,
        })
    }

    pub fn custom(dates: impl IntoIterator<Item = NaiveDate>) -> Result<Self, ValidationError> {
        let dates: BTreeSet<NaiveDate> = dates.into_iter().collect();
        if dates.is_empty() {
            return Err(ValidationError::NoCustomDates);
        }
        Ok(Self::Custom { dates })
    }

    pub fn kind(&self) -> FrequencyKind {
        match self {
            Self::Daily { .. } => FrequencyKind::Daily,
            Self::Weekly { .. } => FrequencyKind::Weekly,
            Self::Monthly { .. } => FrequencyKind::Monthly,
            Self::Custom { .. } => FrequencyKind::Custom,
        }
    }

    /// Human-readable description of the rule.
    pub fn description(&self) -> String {
        match self {
            Self::Daily { interval_days: 1 } => "every day".to_string(),
            Self::Daily { interval_days } => format!("every {interval_days} days"),
            Self::Weekly {
                interval_weeks,
                weekdays,
            } => {
                let days = weekdays
                    .iter()
                    .map(DayOfWeek::as_str)
                    .collect::<Vec<_>>()
                    .join(",");
                if *interval_weeks == 1 {
                    format!("weekly on {days}")
                } else {
                    format!("every {interval_weeks} weeks on {days}")
                }
            }
            Self::Monthly {
                interval_months,
                anchor,
            } => {
                if *interval_months == 1 {
                    format!("monthly {}", anchor.description())
                } else {
                    format!("every {interval_months} months {}", anchor.description())
                }
            }
            Self::Custom { dates } => format!("{} custom date(s)", dates.len()),
        }
    }
}

impl fmt::Display for FrequencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// A single field-level problem with a frequency rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("frequency kind is required")]
    MissingKind,

    #[error("unknown frequency kind '{0}'. Must be one of: daily, weekly, monthly, custom")]
    UnknownKind(String),

    #[error("{field} must be at least 1, got {value}")]
    NonPositiveInterval { field: &'static str, value: i64 },

    #[error("at least one weekday must be selected")]
    EmptyWeekdays,

    #[error("unknown weekday '{0}'")]
    UnknownWeekday(String),

    #[error("monthly frequency needs a day of month or an ordinal weekday")]
    MissingAnchor,

    #[error("day of month must be between 1 and 31, got {0}")]
    DayOutOfRange(i64),

    #[error("ordinal must be between 1 and 4, got {0}")]
    OrdinalOutOfRange(i64),

    #[error("an ordinal weekday anchor needs a weekday")]
    MissingAnchorWeekday,

    #[error("at least one valid custom date is required")]
    NoCustomDates,
}

impl ValidationError {
    /// Name of the input field the error belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingKind | Self::UnknownKind(_) => "kind",
            Self::NonPositiveInterval { field, .. } => *field,
            Self::EmptyWeekdays | Self::UnknownWeekday(_) => "weekdays",
            Self::MissingAnchor | Self::DayOutOfRange(_) => "day_of_month",
            Self::OrdinalOutOfRange(_) => "ordinal",
            Self::MissingAnchorWeekday => "weekday",
            Self::NoCustomDates => "dates",
        }
    }
}

/// Every field-level problem found in one rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", format_errors(.0))]
pub struct ValidationErrors(pub Vec<ValidationError>);

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field(), e))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    /// First message for the given field, if any.
    pub fn for_field(&self, field: &str) -> Option<&ValidationError> {
        self.0.iter().find(|e| e.field() == field)
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(err: ValidationError) -> Self {
        Self(vec![err])
    }
}

/// A frequency rule as typed into a form: nothing is checked yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFrequency {
    /// `daily`, `weekly`, `monthly` or `custom`.
    pub kind: Option<String>,
    /// Interval in the kind's unit. Defaults to 1.
    pub interval: Option<i64>,
    /// Weekday names for weekly rules.
    #[serde(default)]
    pub weekdays: Vec<String>,
    /// Day-of-month anchor for monthly rules.
    pub day_of_month: Option<i64>,
    /// Ordinal for an nth-weekday monthly anchor.
    pub ordinal: Option<i64>,
    /// Weekday for an nth-weekday monthly anchor.
    pub weekday: Option<String>,
    /// `YYYY-MM-DD` dates for custom rules.
    #[serde(default)]
    pub dates: Vec<String>,
}

/// Validate a raw rule into a [`FrequencySpec`].
///
/// All problems are reported together so a form can show one message per
/// field.
pub fn validate(raw: &RawFrequency) -> Result<FrequencySpec, ValidationErrors> {
    let Some(kind) = raw.kind.as_deref().filter(|k| !k.trim().is_empty()) else {
        return Err(ValidationError::MissingKind.into());
    };
    let kind =
        FrequencyKind::from_str(kind).ok_or_else(|| ValidationError::UnknownKind(kind.to_string()))?;

    let mut errors = Vec::new();
    let interval_field = match kind {
        FrequencyKind::Daily => "interval_days",
        FrequencyKind::Weekly => "interval_weeks",
        FrequencyKind::Monthly => "interval_months",
        FrequencyKind::Custom => "interval",
    };
    let interval = match positive_interval(interval_field, raw.interval.unwrap_or(1)) {
        Ok(interval) => interval,
        Err(e) => {
            errors.push(e);
            1
        }
    };

    let spec = match kind {
        FrequencyKind::Daily => Some(FrequencySpec::Daily {
            interval_days: interval,
        }),
        FrequencyKind::Weekly => {
            let mut weekdays = BTreeSet::new();
            for name in &raw.weekdays {
                match DayOfWeek::from_str(name) {
                    Some(day) => {
                        weekdays.insert(day);
                    }
                    None => errors.push(ValidationError::UnknownWeekday(name.clone())),
                }
            }
            if raw.weekdays.is_empty() {
                errors.push(ValidationError::EmptyWeekdays);
            }
            Some(FrequencySpec::Weekly {
                interval_weeks: interval,
                weekdays,
            })
        }
        FrequencyKind::Monthly => match raw_anchor(raw) {
            Ok(anchor) => Some(FrequencySpec::Monthly {
                interval_months: interval,
                anchor,
            }),
            Err(mut anchor_errors) => {
                errors.append(&mut anchor_errors);
                None
            }
        },
        FrequencyKind::Custom => {
            let dates: BTreeSet<NaiveDate> = raw
                .dates
                .iter()
                .filter_map(|s| match NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d") {
                    Ok(date) => Some(date),
                    Err(e) => {
                        tracing::warn!(value = %s, error = %e, "dropping unparseable custom date");
                        None
                    }
                })
                .collect();
            if dates.is_empty() {
                errors.push(ValidationError::NoCustomDates);
            }
            Some(FrequencySpec::Custom { dates })
        }
    };

    match spec {
        Some(spec) if errors.is_empty() => Ok(spec),
        _ => Err(ValidationErrors(errors)),
    }
}

fn raw_anchor(raw: &RawFrequency) -> Result<MonthlyAnchor, Vec<ValidationError>> {
    if raw.ordinal.is_some() || raw.weekday.is_some() {
        let mut errors = Vec::new();
        let ordinal = match raw.ordinal.unwrap_or(1) {
            n if (1..=i64::from(MAX_WEEKDAY_ORDINAL)).contains(&n) => n as u32,
            n => {
                errors.push(ValidationError::OrdinalOutOfRange(n));
                1
            }
        };
        let weekday = match raw.weekday.as_deref() {
            Some(name) => DayOfWeek::from_str(name).or_else(|| {
                errors.push(ValidationError::UnknownWeekday(name.to_string()));
                None
            }),
            None => {
                errors.push(ValidationError::MissingAnchorWeekday);
                None
            }
        };
        return match weekday {
            Some(weekday) if errors.is_empty() => {
                Ok(MonthlyAnchor::NthWeekdayOfMonth { ordinal, weekday })
            }
            _ => Err(errors),
        };
    }

    match raw.day_of_month {
        Some(day) if (1..=i64::from(MAX_DAY_OF_MONTH)).contains(&day) => {
            Ok(MonthlyAnchor::DayOfMonth { day: day as u32 })
        }
        Some(day) => Err(vec![ValidationError::DayOutOfRange(day)]),
        None => Err(vec![ValidationError::MissingAnchor]),
    }
}

fn positive_interval(field: &'static str, value: i64) -> Result<u32, ValidationError> {
    u32::try_from(value)
        .ok()
        .filter(|v| *v >= 1)
        .ok_or(ValidationError::NonPositiveInterval { field, value })
}

impl TryFrom<RawFrequency> for FrequencySpec {
    type Error = ValidationErrors;

    fn try_from(raw: RawFrequency) -> Result<Self, Self::Error> {
        validate(&raw)
    }
}

impl From<&FrequencySpec> for RawFrequency {
    fn from(spec: &FrequencySpec) -> Self {
        let mut raw = Self {
            kind: Some(spec.kind().as_str().to_string()),
            ..Self::default()
        };
        match spec {
            FrequencySpec::Daily { interval_days } => raw.interval = Some(i64::from(*interval_days)),
            FrequencySpec::Weekly {
                interval_weeks,
                weekdays,
            } => {
                raw.interval = Some(i64::from(*interval_weeks));
                raw.weekdays = weekdays.iter().map(|d| d.as_str().to_string()).collect();
            }
            FrequencySpec::Monthly {
                interval_months,
                anchor,
            } => {
                raw.interval = Some(i64::from(*interval_months));
                match anchor {
                    MonthlyAnchor::DayOfMonth { day } => raw.day_of_month = Some(i64::from(*day)),
                    MonthlyAnchor::NthWeekdayOfMonth { ordinal, weekday } => {
                        raw.ordinal = Some(i64::from(*ordinal));
                        raw.weekday = Some(weekday.as_str().to_string());
                    }
                }
            }
            FrequencySpec::Custom { dates } => {
                raw.dates = dates.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect();
            }
        }
        raw
    }
}

// -- Stored form --
//
// Deserialization goes through these mirrors so that stored rules are
// re-validated on load.

const fn default_interval() -> i64 {
    1
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum StoredFrequency {
    Daily {
        #[serde(default = "default_interval")]
        interval_days: i64,
    },
    Weekly {
        #[serde(default = "default_interval")]
        interval_weeks: i64,
        weekdays: Vec<DayOfWeek>,
    },
    Monthly {
        #[serde(default = "default_interval")]
        interval_months: i64,
        anchor: StoredAnchor,
    },
    Custom {
        dates: Vec<NaiveDate>,
    },
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StoredAnchor {
    DayOfMonth { day: i64 },
    NthWeekdayOfMonth { ordinal: i64, weekday: DayOfWeek },
}

impl TryFrom<StoredAnchor> for MonthlyAnchor {
    type Error = ValidationError;

    fn try_from(stored: StoredAnchor) -> Result<Self, Self::Error> {
        match stored {
            StoredAnchor::DayOfMonth { day } => u32::try_from(day)
                .map_err(|_| ValidationError::DayOutOfRange(day))
                .and_then(Self::day_of_month),
            StoredAnchor::NthWeekdayOfMonth { ordinal, weekday } => u32::try_from(ordinal)
                .map_err(|_| ValidationError::OrdinalOutOfRange(ordinal))
                .and_then(|ordinal| Self::nth_weekday(ordinal, weekday)),
        }
    }
}

impl TryFrom<StoredFrequency> for FrequencySpec {
    type Error = ValidationError;

    fn try_from(stored: StoredFrequency) -> Result<Self, Self::Error> {
        match stored {
            StoredFrequency::Daily { interval_days } => {
                Self::daily(positive_interval("interval_days", interval_days)?)
            }
            StoredFrequency::Weekly {
                interval_weeks,
                weekdays,
            } => Self::weekly(positive_interval("interval_weeks", interval_weeks)?, weekdays),
            StoredFrequency::Monthly {
                interval_months,
                anchor,
            } => Self::monthly(
                positive_interval("interval_months", interval_months)?,
                MonthlyAnchor::try_from(anchor)?,
            ),
            StoredFrequency::Custom { dates } => Self::custom(dates),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(kind: &str) -> RawFrequency {
        RawFrequency {
            kind: Some(kind.to_string()),
            ..RawFrequency::default()
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_daily_interval_defaults_to_one() {
        let spec = validate(&raw("daily")).unwrap();
        assert_eq!(spec, FrequencySpec::Daily { interval_days: 1 });
    }

    #[test]
    fn test_missing_kind_rejected() {
        let err = validate(&RawFrequency::default()).unwrap_err();
        assert_eq!(err.errors(), &[ValidationError::MissingKind]);
        assert_eq!(err.errors()[0].field(), "kind");
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = validate(&raw("hourly")).unwrap_err();
        assert!(matches!(err.errors()[0], ValidationError::UnknownKind(ref k) if k == "hourly"));
    }

    #[test]
    fn test_zero_and_negative_intervals_rejected() {
        for value in [0, -3] {
            let mut input = raw("daily");
            input.interval = Some(value);
            let err = validate(&input).unwrap_err();
            assert_eq!(
                err.errors(),
                &[ValidationError::NonPositiveInterval {
                    field: "interval_days",
                    value
                }]
            );
        }
    }

    #[test]
    fn test_weekly_requires_weekdays() {
        let err = validate(&raw("weekly")).unwrap_err();
        assert_eq!(err.for_field("weekdays"), Some(&ValidationError::EmptyWeekdays));
    }

    #[test]
    fn test_weekly_reports_every_bad_field() {
        let mut input = raw("weekly");
        input.interval = Some(0);
        input.weekdays = vec!["mon".to_string(), "funday".to_string()];
        let err = validate(&input).unwrap_err();
        assert_eq!(err.errors().len(), 2);
        assert!(err.for_field("interval_weeks").is_some());
        assert_eq!(
            err.for_field("weekdays"),
            Some(&ValidationError::UnknownWeekday("funday".to_string()))
        );
    }

    #[test]
    fn test_weekly_parses_names_case_insensitively() {
        let mut input = raw("Weekly");
        input.interval = Some(2);
        input.weekdays = vec!["Thursday".to_string(), "MON".to_string(), "mon".to_string()];
        let spec = validate(&input).unwrap();
        assert_eq!(
            spec,
            FrequencySpec::Weekly {
                interval_weeks: 2,
                weekdays: [DayOfWeek::Mon, DayOfWeek::Thu].into_iter().collect(),
            }
        );
    }

    #[test]
    fn test_monthly_day_of_month_bounds() {
        let mut input = raw("monthly");
        input.day_of_month = Some(31);
        assert!(validate(&input).is_ok());

        for day in [0, 32] {
            input.day_of_month = Some(day);
            let err = validate(&input).unwrap_err();
            assert_eq!(err.errors(), &[ValidationError::DayOutOfRange(day)]);
        }
    }

    #[test]
    fn test_monthly_requires_anchor() {
        let err = validate(&raw("monthly")).unwrap_err();
        assert_eq!(err.errors(), &[ValidationError::MissingAnchor]);
    }

    #[test]
    fn test_monthly_fifth_ordinal_rejected() {
        let mut input = raw("monthly");
        input.ordinal = Some(5);
        input.weekday = Some("tue".to_string());
        let err = validate(&input).unwrap_err();
        assert_eq!(err.errors(), &[ValidationError::OrdinalOutOfRange(5)]);
        assert_eq!(err.errors()[0].field(), "ordinal");
    }

    #[test]
    fn test_monthly_ordinal_needs_weekday() {
        let mut input = raw("monthly");
        input.ordinal = Some(2);
        let err = validate(&input).unwrap_err();
        assert_eq!(err.errors(), &[ValidationError::MissingAnchorWeekday]);
    }

    #[test]
    fn test_monthly_nth_weekday() {
        let mut input = raw("monthly");
        input.interval = Some(3);
        input.ordinal = Some(3);
        input.weekday = Some("tue".to_string());
        assert_eq!(
            validate(&input).unwrap(),
            FrequencySpec::Monthly {
                interval_months: 3,
                anchor: MonthlyAnchor::NthWeekdayOfMonth {
                    ordinal: 3,
                    weekday: DayOfWeek::Tue
                },
            }
        );
    }

    #[test]
    fn test_custom_drops_unparseable_dates() {
        let mut input = raw("custom");
        input.dates = vec![
            "2025-06-01".to_string(),
            "not a date".to_string(),
            "2025-01-01".to_string(),
            "2025-06-01".to_string(),
        ];
        let spec = validate(&input).unwrap();
        assert_eq!(
            spec,
            FrequencySpec::Custom {
                dates: [date(2025, 1, 1), date(2025, 6, 1)].into_iter().collect()
            }
        );
    }

    #[test]
    fn test_custom_requires_a_parseable_date() {
        let mut input = raw("custom");
        input.dates = vec!["31/02/2025".to_string()];
        let err = validate(&input).unwrap_err();
        assert_eq!(err.errors(), &[ValidationError::NoCustomDates]);
    }

    #[test]
    fn test_serialized_form() {
        let spec = FrequencySpec::weekly(2, [DayOfWeek::Thu, DayOfWeek::Mon]).unwrap();
        let json = serde_json::to_string(&spec).unwrap();
        assert_eq!(
            json,
            r#"{"kind":"weekly","interval_weeks":2,"weekdays":["mon","thu"]}"#
        );

        let spec = FrequencySpec::monthly(1, MonthlyAnchor::day_of_month(31).unwrap()).unwrap();
        let json = serde_json::to_string(&spec).unwrap();
        assert_eq!(
            json,
            r#"{"kind":"monthly","interval_months":1,"anchor":{"type":"day_of_month","day":31}}"#
        );
    }

    #[test]
    fn test_stored_form_round_trips() {
        let specs = vec![
            FrequencySpec::daily(3).unwrap(),
            FrequencySpec::weekly(1, [DayOfWeek::Sat, DayOfWeek::Sun]).unwrap(),
            FrequencySpec::monthly(2, MonthlyAnchor::nth_weekday(4, DayOfWeek::Fri).unwrap())
                .unwrap(),
            FrequencySpec::custom([date(2025, 6, 1), date(2024, 12, 1)]).unwrap(),
        ];
        for spec in specs {
            let json = serde_json::to_string(&spec).unwrap();
            let back: FrequencySpec = serde_json::from_str(&json).unwrap();
            assert_eq!(back, spec);
            assert_eq!(serde_json::to_string(&back).unwrap(), json);
        }
    }

    #[test]
    fn test_stored_form_is_revalidated() {
        let bad = [
            r#"{"kind":"daily","interval_days":0}"#,
            r#"{"kind":"weekly","interval_weeks":1,"weekdays":[]}"#,
            r#"{"kind":"monthly","interval_months":1,"anchor":{"type":"nth_weekday_of_month","ordinal":5,"weekday":"mon"}}"#,
            r#"{"kind":"custom","dates":[]}"#,
        ];
        for json in bad {
            assert!(serde_json::from_str::<FrequencySpec>(json).is_err(), "{json}");
        }

        let defaulted: FrequencySpec = serde_json::from_str(r#"{"kind":"daily"}"#).unwrap();
        assert_eq!(defaulted, FrequencySpec::Daily { interval_days: 1 });
    }

    #[test]
    fn test_raw_round_trip() {
        let spec = FrequencySpec::monthly(6, MonthlyAnchor::nth_weekday(1, DayOfWeek::Mon).unwrap())
            .unwrap();
        let raw = RawFrequency::from(&spec);
        assert_eq!(validate(&raw).unwrap(), spec);
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(FrequencySpec::daily(1).unwrap().description(), "every day");
        assert_eq!(
            FrequencySpec::weekly(2, [DayOfWeek::Mon, DayOfWeek::Thu])
                .unwrap()
                .description(),
            "every 2 weeks on mon,thu"
        );
        assert_eq!(
            FrequencySpec::monthly(1, MonthlyAnchor::nth_weekday(3, DayOfWeek::Tue).unwrap())
                .unwrap()
                .description(),
            "monthly on the 3rd tue"
        );
    }

    #[test]
    fn test_day_of_week_conversions() {
        for day in DayOfWeek::ALL {
            assert_eq!(DayOfWeek::from(Weekday::from(day)), day);
            assert_eq!(DayOfWeek::from_str(day.as_str()), Some(day));
        }
        assert_eq!(DayOfWeek::of(date(2025, 1, 1)), DayOfWeek::Wed);
        assert_eq!(DayOfWeek::Sat.days_from_sunday(), 6);
    }
}
