//! Work orders created from plan occurrences.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::plan::{MaintenancePlan, Occurrence};

/// A unit of maintenance work due on a given date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub asset: String,
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    /// One work order per `(plan, date)`; see [`Occurrence::idempotency_key`].
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
}

impl WorkOrder {
    pub fn for_occurrence(plan: &MaintenancePlan, occurrence: &Occurrence) -> Self {
        Self {
            id: Uuid::new_v4(),
            plan_id: plan.id,
            asset: plan.asset.clone(),
            title: format!("{} ({})", plan.name, occurrence.date.format("%Y-%m-%d")),
            description: plan.description.clone(),
            due_date: occurrence.date,
            idempotency_key: occurrence.idempotency_key(),
            created_at: Utc::now(),
        }
    }
}
