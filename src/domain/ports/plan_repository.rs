//! Repository port for maintenance plan persistence.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::plan::{GenerationMode, MaintenancePlan, Occurrence};

/// Filter for listing maintenance plans.
///
/// Passed explicitly with each request; there is no shared filter state.
#[derive(Debug, Default, Clone)]
pub struct PlanFilter {
    pub generation_mode: Option<GenerationMode>,
    pub asset: Option<String>,
}

#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Create a new plan.
    async fn create(&self, plan: &MaintenancePlan) -> DomainResult<()>;

    /// Get a plan by ID.
    async fn get(&self, id: Uuid) -> DomainResult<Option<MaintenancePlan>>;

    /// Get a plan by name.
    async fn get_by_name(&self, name: &str) -> DomainResult<Option<MaintenancePlan>>;

    /// Update an existing plan.
    async fn update(&self, plan: &MaintenancePlan) -> DomainResult<()>;

    /// Delete a plan and its occurrence history.
    async fn delete(&self, id: Uuid) -> DomainResult<()>;

    /// List plans matching the filter.
    async fn list(&self, filter: PlanFilter) -> DomainResult<Vec<MaintenancePlan>>;

    /// Record an occurrence in the plan's history.
    ///
    /// Returns `false` when the occurrence was already recorded, so that
    /// only one caller ever materializes a given `(plan, date)`.
    async fn claim_occurrence(&self, occurrence: &Occurrence) -> DomainResult<bool>;

    /// Link a claimed occurrence to the work order created for it.
    async fn attach_work_order(&self, occurrence: &Occurrence, work_order_id: Uuid) -> DomainResult<()>;

    /// Drop a claimed occurrence whose work order could not be created.
    async fn release_occurrence(&self, occurrence: &Occurrence) -> DomainResult<()>;

    /// Dates whose work order is attached, ascending.
    async fn materialized_dates(&self, plan_id: Uuid) -> DomainResult<Vec<NaiveDate>>;

    /// Claimed dates still waiting for a work order, ascending.
    ///
    /// A run that stops between claiming and attaching leaves these behind.
    async fn pending_occurrences(&self, plan_id: Uuid) -> DomainResult<Vec<NaiveDate>>;

    /// Latest date whose work order is attached.
    async fn last_materialized(&self, plan_id: Uuid) -> DomainResult<Option<NaiveDate>> {
        Ok(self.materialized_dates(plan_id).await?.last().copied())
    }
}
