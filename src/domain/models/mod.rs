pub mod config;
pub mod frequency;
pub mod plan;
pub mod work_order;

pub use config::{
    Config, DatabaseConfig, LoggingConfig, MaterializationConfig, RecurrenceConfig,
};
pub use frequency::{
    validate, DayOfWeek, FrequencyKind, FrequencySpec, MonthlyAnchor, RawFrequency,
    ValidationError, ValidationErrors,
};
pub use plan::{GenerationMode, MaintenancePlan, Occurrence};
pub use work_order::WorkOrder;
