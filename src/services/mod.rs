//! Application services: recurrence math, previews, plan management and
//! work-order materialization.

pub mod calendar;
pub mod materialization_scheduler;
pub mod materialization_service;
pub mod occurrence_generator;
pub mod plan_service;
pub mod recurrence_previewer;

pub use materialization_scheduler::{
    MaterializationScheduler, SchedulerConfig, SchedulerEvent, SchedulerHandle, SchedulerStatus, StopReason,
};
pub use materialization_service::{MaterializationReport, MaterializationService, MaterializedOccurrence, RunSummary};
pub use occurrence_generator::{OccurrenceGenerator, Occurrences, ScanHorizon};
pub use plan_service::PlanService;
pub use recurrence_previewer::{Preview, PreviewNotice, RecurrencePreviewer};
