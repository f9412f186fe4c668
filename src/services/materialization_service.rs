//! Turns due plan occurrences into work orders.
//!
//! For each plan, the window of interest runs from the day after its last
//! materialized occurrence (or its start date) up to a horizon date. Dates
//! before `today` are never materialized. Each due date is first claimed in
//! the plan's occurrence history, then handed to the work-order service;
//! a claim that already exists means another run got there first, so
//! re-running a trigger, even concurrently, creates nothing twice.
//!
//! A claim counts as materialized only once its work order is attached.
//! Claims left pending by an interrupted run are completed at the start of
//! the next one, whatever their date. Work-order creation is idempotent per
//! occurrence, so completing a claim another run is still working on is safe.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::config::MaterializationConfig;
use crate::domain::models::plan::{GenerationMode, MaintenancePlan};
use crate::domain::ports::plan_repository::{PlanFilter, PlanRepository};
use crate::domain::ports::work_order_service::WorkOrderService;
use crate::services::calendar;
use crate::services::occurrence_generator::OccurrenceGenerator;

/// A work order created for one occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterializedOccurrence {
    pub date: NaiveDate,
    pub work_order_id: Uuid,
}

/// Result of materializing one plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaterializationReport {
    pub plan_id: Uuid,
    pub plan_name: String,
    /// First date considered, if the window was not empty.
    pub window_start: Option<NaiveDate>,
    pub through: Option<NaiveDate>,
    pub created: Vec<MaterializedOccurrence>,
    /// Claims left pending by an earlier run, now completed.
    pub recovered: Vec<MaterializedOccurrence>,
    /// Due dates that already had a work order.
    pub already_materialized: usize,
}

/// Result of materializing every plan of one generation mode.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub mode: Option<GenerationMode>,
    pub through: Option<NaiveDate>,
    pub reports: Vec<MaterializationReport>,
    /// Plans that failed, with the error message.
    pub failures: Vec<(Uuid, String)>,
}

impl RunSummary {
    pub fn created_count(&self) -> usize {
        self.reports.iter().map(|r| r.created.len()).sum()
    }

    pub fn recovered_count(&self) -> usize {
        self.reports.iter().map(|r| r.recovered.len()).sum()
    }
}

pub struct MaterializationService<R, W>
where
    R: PlanRepository,
    W: WorkOrderService,
{
    repo: Arc<R>,
    work_orders: Arc<W>,
    generator: OccurrenceGenerator,
    config: MaterializationConfig,
}

impl<R, W> MaterializationService<R, W>
where
    R: PlanRepository,
    W: WorkOrderService,
{
    pub fn new(
        repo: Arc<R>,
        work_orders: Arc<W>,
        generator: OccurrenceGenerator,
        config: MaterializationConfig,
    ) -> Self {
        Self {
            repo,
            work_orders,
            generator,
            config,
        }
    }

    /// Default horizon: end of the month `lookahead_months` after `today`.
    pub fn horizon_end(&self, today: NaiveDate) -> NaiveDate {
        calendar::end_of_month_after(today, self.config.lookahead_months).unwrap_or(NaiveDate::MAX)
    }

    /// Materialize the occurrences of one plan due through `through`.
    pub async fn materialize_plan(
        &self,
        plan: &MaintenancePlan,
        today: NaiveDate,
        through: NaiveDate,
    ) -> DomainResult<MaterializationReport> {
        let mut report = MaterializationReport {
            plan_id: plan.id,
            plan_name: plan.name.clone(),
            through: Some(through),
            ..MaterializationReport::default()
        };

        report.recovered = self.complete_pending(plan).await?;

        let mut window_start = plan.start_date.max(today);
        if let Some(last) = self.repo.last_materialized(plan.id).await? {
            match last.succ_opt() {
                Some(next) => window_start = window_start.max(next),
                None => return Ok(report),
            }
        }
        if window_start > through {
            tracing::debug!(plan_id = %plan.id, %window_start, %through, "nothing due");
            return Ok(report);
        }
        report.window_start = Some(window_start);

        let history: HashSet<NaiveDate> =
            self.repo.materialized_dates(plan.id).await?.into_iter().collect();
        let due: Vec<NaiveDate> = self
            .generator
            .occurrences_from(&plan.frequency, plan.start_date, window_start)
            .take_while(|date| *date <= through)
            .take(self.config.max_per_plan)
            .collect();

        for date in due {
            if history.contains(&date) {
                report.already_materialized += 1;
                continue;
            }
            let occurrence = plan.occurrence(date);
            if !self.repo.claim_occurrence(&occurrence).await? {
                tracing::debug!(plan_id = %plan.id, %date, "occurrence claimed by another run");
                report.already_materialized += 1;
                continue;
            }

            match self.work_orders.create_work_order(plan, &occurrence).await {
                Ok(work_order) => {
                    self.repo.attach_work_order(&occurrence, work_order.id).await?;
                    report.created.push(MaterializedOccurrence {
                        date,
                        work_order_id: work_order.id,
                    });
                }
                Err(err) => {
                    tracing::warn!(plan_id = %plan.id, %date, error = %err, "releasing occurrence claim");
                    // A claim that cannot be released stays pending and is retried next run.
                    if let Err(release_err) = self.repo.release_occurrence(&occurrence).await {
                        tracing::error!(plan_id = %plan.id, %date, error = %release_err, "claim left pending");
                    }
                    return Err(DomainError::WorkOrderFailed {
                        plan_id: plan.id,
                        date,
                        reason: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            plan_id = %plan.id,
            plan = %plan.name,
            created = report.created.len(),
            recovered = report.recovered.len(),
            already_materialized = report.already_materialized,
            "plan materialized"
        );
        Ok(report)
    }

    /// Create and attach work orders for claims an earlier run left pending.
    ///
    /// A failure leaves the claim pending for the next run.
    async fn complete_pending(&self, plan: &MaintenancePlan) -> DomainResult<Vec<MaterializedOccurrence>> {
        let mut recovered = Vec::new();
        for date in self.repo.pending_occurrences(plan.id).await? {
            let occurrence = plan.occurrence(date);
            let work_order = self
                .work_orders
                .create_work_order(plan, &occurrence)
                .await
                .map_err(|err| DomainError::WorkOrderFailed {
                    plan_id: plan.id,
                    date,
                    reason: err.to_string(),
                })?;
            self.repo.attach_work_order(&occurrence, work_order.id).await?;
            tracing::info!(plan_id = %plan.id, %date, work_order_id = %work_order.id, "pending occurrence completed");
            recovered.push(MaterializedOccurrence {
                date,
                work_order_id: work_order.id,
            });
        }
        Ok(recovered)
    }

    /// Materialize every plan of the given mode through the default horizon.
    pub async fn run(&self, mode: GenerationMode, today: NaiveDate) -> DomainResult<RunSummary> {
        let through = self.horizon_end(today);
        self.run_through(mode, today, through).await
    }

    /// Materialize every plan of the given mode through `through`.
    ///
    /// A failing plan is recorded in the summary and does not stop the run.
    pub async fn run_through(
        &self,
        mode: GenerationMode,
        today: NaiveDate,
        through: NaiveDate,
    ) -> DomainResult<RunSummary> {
        let plans = self
            .repo
            .list(PlanFilter {
                generation_mode: Some(mode),
                ..PlanFilter::default()
            })
            .await?;

        let mut summary = RunSummary {
            mode: Some(mode),
            through: Some(through),
            ..RunSummary::default()
        };
        for plan in &plans {
            match self.materialize_plan(plan, today, through).await {
                Ok(report) => summary.reports.push(report),
                Err(err) => {
                    tracing::error!(plan_id = %plan.id, plan = %plan.name, error = %err, "materialization failed");
                    summary.failures.push((plan.id, err.to_string()));
                }
            }
        }

        tracing::info!(
            mode = mode.as_str(),
            %through,
            plans = plans.len(),
            created = summary.created_count(),
            recovered = summary.recovered_count(),
            failures = summary.failures.len(),
            "materialization run finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqlitePlanRepository, SqliteWorkOrderService};
    use crate::domain::models::frequency::{DayOfWeek, FrequencySpec};
    use crate::domain::models::plan::Occurrence;
    use crate::domain::models::work_order::WorkOrder;
    use async_trait::async_trait;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    type SqliteService = MaterializationService<SqlitePlanRepository, SqliteWorkOrderService>;

    async fn setup() -> (SqliteService, Arc<SqlitePlanRepository>, Arc<SqliteWorkOrderService>) {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = Arc::new(SqlitePlanRepository::new(pool.clone()));
        let work_orders = Arc::new(SqliteWorkOrderService::new(pool));
        let service = MaterializationService::new(
            repo.clone(),
            work_orders.clone(),
            OccurrenceGenerator::default(),
            MaterializationConfig::default(),
        );
        (service, repo, work_orders)
    }

    #[tokio::test]
    async fn test_materialize_then_rerun_creates_nothing() {
        let (service, repo, work_orders) = setup().await;
        let plan = MaintenancePlan::new(
            "weekly-check",
            "LIFT-1",
            FrequencySpec::weekly(1, [DayOfWeek::Mon, DayOfWeek::Thu]).unwrap(),
            date(2025, 1, 1),
        );
        repo.create(&plan).await.unwrap();

        let through = date(2025, 1, 13);
        let first = service.materialize_plan(&plan, date(2025, 1, 1), through).await.unwrap();
        let dates: Vec<_> = first.created.iter().map(|c| c.date).collect();
        assert_eq!(
            dates,
            vec![date(2025, 1, 2), date(2025, 1, 6), date(2025, 1, 9), date(2025, 1, 13)]
        );

        let second = service.materialize_plan(&plan, date(2025, 1, 1), through).await.unwrap();
        assert!(second.created.is_empty());
        assert_eq!(second.window_start, None);
        assert_eq!(work_orders.list_for_plan(plan.id).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_no_backfill_before_today() {
        let (service, repo, _) = setup().await;
        let plan = MaintenancePlan::new(
            "daily-walk",
            "PLANT",
            FrequencySpec::daily(1).unwrap(),
            date(2025, 1, 1),
        );
        repo.create(&plan).await.unwrap();

        let report = service
            .materialize_plan(&plan, date(2025, 1, 20), date(2025, 1, 21))
            .await
            .unwrap();
        assert_eq!(report.window_start, Some(date(2025, 1, 20)));
        assert_eq!(report.created.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_runs_create_each_work_order_once() {
        let (service, repo, work_orders) = setup().await;
        let plan = MaintenancePlan::new(
            "every-3",
            "TANK-4",
            FrequencySpec::daily(3).unwrap(),
            date(2025, 1, 1),
        );
        repo.create(&plan).await.unwrap();

        let today = date(2025, 1, 1);
        let through = date(2025, 1, 31);
        let (a, b) = tokio::join!(
            service.materialize_plan(&plan, today, through),
            service.materialize_plan(&plan, today, through)
        );
        let created = a.unwrap().created.len() + b.unwrap().created.len();

        // Jan 1, 4, ..., 31.
        assert_eq!(created, 11);
        assert_eq!(work_orders.list_for_plan(plan.id).await.unwrap().len(), 11);
        assert_eq!(repo.materialized_dates(plan.id).await.unwrap().len(), 11);
    }

    #[tokio::test]
    async fn test_window_restarts_after_last_materialized() {
        let (service, repo, _) = setup().await;
        let plan = MaintenancePlan::new(
            "every-2",
            "PUMP-2",
            FrequencySpec::daily(2).unwrap(),
            date(2025, 1, 1),
        );
        repo.create(&plan).await.unwrap();

        let report = service
            .materialize_plan(&plan, date(2025, 1, 1), date(2025, 1, 5))
            .await
            .unwrap();
        assert_eq!(report.created.len(), 3);

        // The window restarts after the last materialized date.
        let report = service
            .materialize_plan(&plan, date(2025, 1, 1), date(2025, 1, 9))
            .await
            .unwrap();
        assert_eq!(report.window_start, Some(date(2025, 1, 6)));
        let dates: Vec<_> = report.created.iter().map(|c| c.date).collect();
        assert_eq!(dates, vec![date(2025, 1, 7), date(2025, 1, 9)]);
        assert_eq!(report.already_materialized, 0);
    }

    #[tokio::test]
    async fn test_run_only_touches_requested_mode() {
        let (service, repo, _) = setup().await;
        let auto = MaintenancePlan::new("auto", "A", FrequencySpec::daily(7).unwrap(), date(2025, 1, 1));
        let manual = MaintenancePlan::new("manual", "B", FrequencySpec::daily(7).unwrap(), date(2025, 1, 1))
            .with_generation_mode(GenerationMode::Manual);
        repo.create(&auto).await.unwrap();
        repo.create(&manual).await.unwrap();

        let summary = service.run(GenerationMode::Automatic, date(2025, 1, 1)).await.unwrap();
        assert_eq!(summary.through, Some(date(2025, 2, 28)));
        assert_eq!(summary.reports.len(), 1);
        assert_eq!(summary.reports[0].plan_name, "auto");
        // Jan 1, 8, 15, 22, 29, Feb 5, 12, 19, 26.
        assert_eq!(summary.created_count(), 9);
        assert!(repo.materialized_dates(manual.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pending_claim_gets_its_work_order() {
        let (service, repo, work_orders) = setup().await;
        let plan = MaintenancePlan::new("daily-log", "BOILER-1", FrequencySpec::daily(1).unwrap(), date(2025, 1, 1));
        repo.create(&plan).await.unwrap();

        // An interrupted run claimed Jan 1 but never created its work order.
        assert!(repo.claim_occurrence(&plan.occurrence(date(2025, 1, 1))).await.unwrap());

        let report = service
            .materialize_plan(&plan, date(2025, 1, 2), date(2025, 1, 3))
            .await
            .unwrap();
        let recovered: Vec<_> = report.recovered.iter().map(|c| c.date).collect();
        let created: Vec<_> = report.created.iter().map(|c| c.date).collect();
        assert_eq!(recovered, vec![date(2025, 1, 1)]);
        assert_eq!(created, vec![date(2025, 1, 2), date(2025, 1, 3)]);

        let due: Vec<_> = work_orders
            .list_for_plan(plan.id)
            .await
            .unwrap()
            .iter()
            .map(|o| o.due_date)
            .collect();
        assert_eq!(due, vec![date(2025, 1, 1), date(2025, 1, 2), date(2025, 1, 3)]);
        assert!(repo.pending_occurrences(plan.id).await.unwrap().is_empty());
        assert_eq!(repo.materialized_dates(plan.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_pending_claim_inside_window_is_not_skipped() {
        let (service, repo, work_orders) = setup().await;
        let plan = MaintenancePlan::new("daily-log", "BOILER-1", FrequencySpec::daily(1).unwrap(), date(2025, 1, 1));
        repo.create(&plan).await.unwrap();
        repo.claim_occurrence(&plan.occurrence(date(2025, 1, 1))).await.unwrap();

        let report = service
            .materialize_plan(&plan, date(2025, 1, 1), date(2025, 1, 3))
            .await
            .unwrap();
        assert_eq!(report.recovered.len(), 1);
        assert_eq!(report.created.len(), 2);
        assert_eq!(report.already_materialized, 0);
        assert_eq!(work_orders.list_for_plan(plan.id).await.unwrap().len(), 3);
    }

    struct FailingWorkOrders;

    #[async_trait]
    impl WorkOrderService for FailingWorkOrders {
        async fn create_work_order(
            &self,
            _plan: &MaintenancePlan,
            _occurrence: &Occurrence,
        ) -> DomainResult<WorkOrder> {
            Err(DomainError::ValidationFailed("work order system offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_failed_work_order_releases_claim() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = Arc::new(SqlitePlanRepository::new(pool));
        let service = MaterializationService::new(
            repo.clone(),
            Arc::new(FailingWorkOrders),
            OccurrenceGenerator::default(),
            MaterializationConfig::default(),
        );
        let plan = MaintenancePlan::new("fails", "X", FrequencySpec::daily(1).unwrap(), date(2025, 1, 1));
        repo.create(&plan).await.unwrap();

        let err = service
            .materialize_plan(&plan, date(2025, 1, 1), date(2025, 1, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::WorkOrderFailed { date: d, .. } if d == date(2025, 1, 1)));
        assert!(repo.materialized_dates(plan.id).await.unwrap().is_empty());

        let summary = service.run(GenerationMode::Automatic, date(2025, 1, 1)).await.unwrap();
        assert!(summary.reports.is_empty());
        assert_eq!(summary.failures.len(), 1);
    }

    #[tokio::test]
    async fn test_max_per_plan_caps_a_run() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = Arc::new(SqlitePlanRepository::new(pool.clone()));
        let service = MaterializationService::new(
            repo.clone(),
            Arc::new(SqliteWorkOrderService::new(pool)),
            OccurrenceGenerator::default(),
            MaterializationConfig {
                max_per_plan: 3,
                ..MaterializationConfig::default()
            },
        );
        let plan = MaintenancePlan::new("capped", "Y", FrequencySpec::daily(1).unwrap(), date(2025, 1, 1));
        repo.create(&plan).await.unwrap();

        let first = service.materialize_plan(&plan, date(2025, 1, 1), date(2025, 1, 31)).await.unwrap();
        assert_eq!(first.created.len(), 3);
        let second = service.materialize_plan(&plan, date(2025, 1, 1), date(2025, 1, 31)).await.unwrap();
        assert_eq!(second.window_start, Some(date(2025, 1, 4)));
        assert_eq!(second.created.len(), 3);
    }
}
