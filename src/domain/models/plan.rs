//! Preventive-maintenance plan domain model.
//!
//! A MaintenancePlan pairs an asset with a frequency rule. The recurrence
//! engine reads plans but never mutates them; materialized occurrences are
//! tracked by the plan repository.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::frequency::FrequencySpec;

/// How a plan's occurrences are turned into work orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// Picked up by the recurring materialization job.
    #[default]
    Automatic,
    /// Only materialized when an operator triggers it.
    Manual,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::Manual => "manual",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "automatic" | "auto" => Some(Self::Automatic),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

/// A preventive-maintenance plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenancePlan {
    pub id: Uuid,
    /// Human-readable name for the plan (unique).
    pub name: String,
    /// Asset the plan maintains.
    pub asset: String,
    /// Work to perform on each occurrence.
    pub description: String,
    pub frequency: FrequencySpec,
    /// Date the current frequency rule took effect.
    pub start_date: NaiveDate,
    pub generation_mode: GenerationMode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MaintenancePlan {
    pub fn new(
        name: impl Into<String>,
        asset: impl Into<String>,
        frequency: FrequencySpec,
        start_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            asset: asset.into(),
            description: String::new(),
            frequency,
            start_date,
            generation_mode: GenerationMode::Automatic,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_generation_mode(mut self, mode: GenerationMode) -> Self {
        self.generation_mode = mode;
        self
    }

    /// Replace the frequency rule, starting it over from `effective_from`.
    ///
    /// Occurrences already materialized are left alone.
    pub fn change_frequency(&mut self, frequency: FrequencySpec, effective_from: NaiveDate) {
        self.frequency = frequency;
        self.start_date = effective_from;
        self.updated_at = Utc::now();
    }

    pub fn occurrence(&self, date: NaiveDate) -> Occurrence {
        Occurrence {
            plan_id: self.id,
            date,
        }
    }
}

/// A date on which a plan is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Occurrence {
    pub plan_id: Uuid,
    pub date: NaiveDate,
}

impl Occurrence {
    /// Key identifying the work order for this occurrence.
    pub fn idempotency_key(&self) -> String {
        format!("plan:{}:{}", self.plan_id, self.date.format("%Y-%m-%d"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_new_plan_defaults() {
        let plan = MaintenancePlan::new(
            "pump-greasing",
            "PUMP-01",
            FrequencySpec::daily(7).unwrap(),
            date(2025, 1, 1),
        );
        assert_eq!(plan.generation_mode, GenerationMode::Automatic);
        assert!(plan.description.is_empty());
        assert_eq!(plan.created_at, plan.updated_at);
    }

    #[test]
    fn test_change_frequency_moves_start() {
        let mut plan = MaintenancePlan::new(
            "filter-swap",
            "AHU-3",
            FrequencySpec::daily(30).unwrap(),
            date(2025, 1, 1),
        );
        plan.change_frequency(FrequencySpec::daily(14).unwrap(), date(2025, 3, 1));
        assert_eq!(plan.start_date, date(2025, 3, 1));
        assert_eq!(plan.frequency, FrequencySpec::Daily { interval_days: 14 });
    }

    #[test]
    fn test_generation_mode_parsing() {
        assert_eq!(GenerationMode::from_str("Manual"), Some(GenerationMode::Manual));
        assert_eq!(GenerationMode::from_str("auto"), Some(GenerationMode::Automatic));
        assert_eq!(GenerationMode::from_str("sometimes"), None);
    }

    #[test]
    fn test_idempotency_key() {
        let occurrence = Occurrence {
            plan_id: Uuid::nil(),
            date: date(2025, 2, 3),
        };
        assert_eq!(
            occurrence.idempotency_key(),
            "plan:00000000-0000-0000-0000-000000000000:2025-02-03"
        );
    }
}
