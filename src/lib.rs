//! Upkeep - preventive-maintenance recurrence engine
//!
//! Upkeep stores maintenance plans, each pairing an asset with a frequency
//! rule (daily, weekly, monthly or an explicit list of dates), previews a
//! rule's upcoming dates, and turns due occurrences into work orders exactly
//! once per plan and date.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): frequency rules, plans, work orders and the
//!   port traits persistence must satisfy
//! - **Service Layer** (`services`): occurrence generation, previews, plan
//!   management and materialization
//! - **Adapters** (`adapters`): SQLite implementations of the ports
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use upkeep::{DayOfWeek, FrequencySpec, OccurrenceGenerator};
//!
//! let spec = FrequencySpec::weekly(1, [DayOfWeek::Mon, DayOfWeek::Thu]).unwrap();
//! let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
//! let dates = OccurrenceGenerator::default().generate(&spec, start, 2);
//! assert_eq!(dates[0], NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    validate, Config, DayOfWeek, FrequencyKind, FrequencySpec, GenerationMode, MaintenancePlan,
    MonthlyAnchor, Occurrence, RawFrequency, ValidationError, ValidationErrors, WorkOrder,
};
pub use domain::ports::{PlanFilter, PlanRepository, WorkOrderService};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    MaterializationService, OccurrenceGenerator, PlanService, Preview, PreviewNotice,
    RecurrencePreviewer, ScanHorizon,
};
