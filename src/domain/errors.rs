//! Domain errors for the Upkeep maintenance planner.

use thiserror::Error;
use uuid::Uuid;

use super::models::frequency::ValidationErrors;

/// Domain-level errors that can occur in Upkeep.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Maintenance plan not found: {0}")]
    PlanNotFound(String),

    #[error("Maintenance plan name already in use: {0}")]
    DuplicatePlanName(String),

    #[error("Invalid frequency: {0}")]
    InvalidFrequency(#[from] ValidationErrors),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Work order creation failed for plan {plan_id} on {date}: {reason}")]
    WorkOrderFailed {
        plan_id: Uuid,
        date: chrono::NaiveDate,
        reason: String,
    },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
