//! Port for the work-order system that materialized occurrences feed.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::plan::{MaintenancePlan, Occurrence};
use crate::domain::models::work_order::WorkOrder;

#[async_trait]
pub trait WorkOrderService: Send + Sync {
    /// Create the work order for one due occurrence of a plan.
    async fn create_work_order(
        &self,
        plan: &MaintenancePlan,
        occurrence: &Occurrence,
    ) -> DomainResult<WorkOrder>;
}
