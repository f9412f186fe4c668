//! Service for managing maintenance plans.
//!
//! Coordinates between PlanRepository (persistence) and the
//! OccurrenceGenerator (upcoming dates for a saved plan).

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::frequency::FrequencySpec;
use crate::domain::models::plan::MaintenancePlan;
use crate::domain::ports::plan_repository::{PlanFilter, PlanRepository};
use crate::services::occurrence_generator::OccurrenceGenerator;

pub struct PlanService<R: PlanRepository> {
    repo: Arc<R>,
    generator: OccurrenceGenerator,
}

impl<R: PlanRepository> PlanService<R> {
    pub fn new(repo: Arc<R>, generator: OccurrenceGenerator) -> Self {
        Self { repo, generator }
    }

    /// Validate and persist a new plan.
    pub async fn create_plan(&self, plan: MaintenancePlan) -> DomainResult<MaintenancePlan> {
        if plan.name.trim().is_empty() {
            return Err(DomainError::ValidationFailed("Plan name cannot be empty".to_string()));
        }
        if plan.asset.trim().is_empty() {
            return Err(DomainError::ValidationFailed("Plan asset cannot be empty".to_string()));
        }
        if self.repo.get_by_name(&plan.name).await?.is_some() {
            return Err(DomainError::DuplicatePlanName(plan.name));
        }

        self.repo.create(&plan).await?;
        tracing::info!(
            plan_id = %plan.id,
            name = %plan.name,
            frequency = %plan.frequency,
            mode = plan.generation_mode.as_str(),
            "maintenance plan created"
        );
        Ok(plan)
    }

    pub async fn get_plan(&self, id: Uuid) -> DomainResult<Option<MaintenancePlan>> {
        self.repo.get(id).await
    }

    /// Find a plan by exact name, full UUID, or unique UUID prefix.
    pub async fn find_plan(&self, id_or_name: &str) -> DomainResult<MaintenancePlan> {
        if let Some(plan) = self.repo.get_by_name(id_or_name).await? {
            return Ok(plan);
        }
        if let Ok(id) = Uuid::parse_str(id_or_name) {
            if let Some(plan) = self.repo.get(id).await? {
                return Ok(plan);
            }
        }

        let prefix = id_or_name.to_lowercase();
        if prefix.len() >= 4 {
            let mut matches: Vec<MaintenancePlan> = self
                .repo
                .list(PlanFilter::default())
                .await?
                .into_iter()
                .filter(|p| p.id.to_string().starts_with(&prefix))
                .collect();
            match matches.len() {
                1 => return Ok(matches.remove(0)),
                0 => {}
                n => {
                    return Err(DomainError::ValidationFailed(format!(
                        "Ambiguous plan id prefix '{}' matches {} plans",
                        id_or_name, n
                    )))
                }
            }
        }

        Err(DomainError::PlanNotFound(id_or_name.to_string()))
    }

    pub async fn list_plans(&self, filter: PlanFilter) -> DomainResult<Vec<MaintenancePlan>> {
        self.repo.list(filter).await
    }

    /// Replace a plan's frequency rule, starting it over from `effective_from`.
    ///
    /// The history of materialized occurrences is kept as is.
    pub async fn change_frequency(
        &self,
        id: Uuid,
        frequency: FrequencySpec,
        effective_from: NaiveDate,
    ) -> DomainResult<MaintenancePlan> {
        let mut plan = self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| DomainError::PlanNotFound(id.to_string()))?;
        plan.change_frequency(frequency, effective_from);
        self.repo.update(&plan).await?;
        tracing::info!(
            plan_id = %plan.id,
            frequency = %plan.frequency,
            effective_from = %effective_from,
            "plan frequency changed"
        );
        Ok(plan)
    }

    pub async fn delete_plan(&self, id: Uuid) -> DomainResult<()> {
        self.repo.delete(id).await
    }

    /// Next `count` occurrences of a saved plan on or after `today`.
    pub fn upcoming(&self, plan: &MaintenancePlan, today: NaiveDate, count: usize) -> Vec<NaiveDate> {
        self.generator
            .occurrences_from(&plan.frequency, plan.start_date, today)
            .take(count)
            .collect()
    }

    pub async fn materialized_dates(&self, id: Uuid) -> DomainResult<Vec<NaiveDate>> {
        self.repo.materialized_dates(id).await
    }
}
