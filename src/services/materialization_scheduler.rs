//! Background scheduler for automatic plans.
//!
//! Wakes up on a fixed interval and materializes every automatic plan through
//! the default horizon. Manual plans are left to an operator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::{mpsc, Notify, RwLock};
use tokio::time::{interval, Instant, MissedTickBehavior};

use crate::domain::errors::DomainResult;
use crate::domain::models::config::MaterializationConfig;
use crate::domain::models::plan::GenerationMode;
use crate::domain::ports::plan_repository::PlanRepository;
use crate::domain::ports::work_order_service::WorkOrderService;
use crate::services::materialization_service::{MaterializationService, RunSummary};

/// Source of "today" for each run.
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub poll_interval: Duration,
    pub run_on_startup: bool,
    /// The scheduler stops after this many failed runs in a row.
    pub max_consecutive_failures: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from(&MaterializationConfig::default())
    }
}

impl From<&MaterializationConfig> for SchedulerConfig {
    fn from(config: &MaterializationConfig) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            run_on_startup: true,
            max_consecutive_failures: config.max_consecutive_failures,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    Started,
    RunStarted { run_number: u64, today: NaiveDate },
    RunCompleted {
        run_number: u64,
        summary: RunSummary,
        duration_ms: u64,
    },
    RunFailed { run_number: u64, error: String },
    Stopped { reason: StopReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Requested,
    TooManyFailures,
}

#[derive(Debug, Clone, Default)]
pub struct SchedulerStatus {
    pub running: bool,
    pub total_runs: u64,
    pub successful_runs: u64,
    pub failed_runs: u64,
    pub last_run: Option<Instant>,
    pub work_orders_created: u64,
    /// Plans that failed inside otherwise successful runs.
    pub plan_failures: u64,
}

/// Stops a running scheduler and reads its status.
#[derive(Clone)]
pub struct SchedulerHandle {
    stop_flag: Arc<AtomicBool>,
    stop_signal: Arc<Notify>,
    status: Arc<RwLock<SchedulerStatus>>,
}

impl SchedulerHandle {
    /// Ask the scheduler to stop. A run in progress finishes first; a wait
    /// for the next tick is cut short.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Release);
        // Stores a permit when the loop is not waiting yet.
        self.stop_signal.notify_one();
    }

    pub async fn status(&self) -> SchedulerStatus {
        self.status.read().await.clone()
    }
}

pub struct MaterializationScheduler<R, W>
where
    R: PlanRepository + 'static,
    W: WorkOrderService + 'static,
{
    service: Arc<MaterializationService<R, W>>,
    config: SchedulerConfig,
    clock: Clock,
    status: Arc<RwLock<SchedulerStatus>>,
    stop_flag: Arc<AtomicBool>,
    stop_signal: Arc<Notify>,
}

impl<R, W> MaterializationScheduler<R, W>
where
    R: PlanRepository + 'static,
    W: WorkOrderService + 'static,
{
    pub fn new(service: Arc<MaterializationService<R, W>>, config: SchedulerConfig) -> Self {
        Self {
            service,
            config,
            clock: Arc::new(|| chrono::Local::now().date_naive()),
            status: Arc::new(RwLock::new(SchedulerStatus::default())),
            stop_flag: Arc::new(AtomicBool::new(false)),
            stop_signal: Arc::new(Notify::new()),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            stop_flag: self.stop_flag.clone(),
            stop_signal: self.stop_signal.clone(),
            status: self.status.clone(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Spawn the scheduler loop, returning its event stream.
    pub fn spawn(self) -> mpsc::Receiver<SchedulerEvent> {
        let (tx, rx) = mpsc::channel(100);
        tokio::spawn(async move {
            self.run_loop(tx).await;
        });
        rx
    }

    async fn run_loop(self, tx: mpsc::Sender<SchedulerEvent>) {
        self.status.write().await.running = true;
        let _ = tx.send(SchedulerEvent::Started).await;
        tracing::info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            "materialization scheduler started"
        );

        let mut consecutive_failures = 0u32;
        let mut timer = interval(self.config.poll_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        timer.tick().await;

        if self.config.run_on_startup {
            self.run_cycle(&tx, &mut consecutive_failures).await;
        }

        let reason = loop {
            if self.stop_flag.load(Ordering::Acquire) {
                break StopReason::Requested;
            }
            if consecutive_failures >= self.config.max_consecutive_failures {
                break StopReason::TooManyFailures;
            }
            tokio::select! {
                _ = timer.tick() => {}
                _ = self.stop_signal.notified() => break StopReason::Requested,
            }
            if self.stop_flag.load(Ordering::Acquire) {
                break StopReason::Requested;
            }
            self.run_cycle(&tx, &mut consecutive_failures).await;
        };

        self.status.write().await.running = false;
        match reason {
            StopReason::Requested => tracing::info!("materialization scheduler stopped"),
            StopReason::TooManyFailures => tracing::error!(
                failures = consecutive_failures,
                "materialization scheduler stopped after repeated failures"
            ),
        }
        let _ = tx.send(SchedulerEvent::Stopped { reason }).await;
    }

    async fn run_cycle(&self, tx: &mpsc::Sender<SchedulerEvent>, consecutive_failures: &mut u32) {
        let run_number = {
            let mut status = self.status.write().await;
            status.total_runs += 1;
            status.total_runs
        };
        let today = (self.clock)();
        let _ = tx.send(SchedulerEvent::RunStarted { run_number, today }).await;

        let start = Instant::now();
        let result = self.run_once(today).await;
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(summary) => {
                *consecutive_failures = 0;
                {
                    let mut status = self.status.write().await;
                    status.successful_runs += 1;
                    status.last_run = Some(Instant::now());
                    status.work_orders_created += summary.created_count() as u64;
                    status.plan_failures += summary.failures.len() as u64;
                }
                let _ = tx
                    .send(SchedulerEvent::RunCompleted {
                        run_number,
                        summary,
                        duration_ms,
                    })
                    .await;
            }
            Err(err) => {
                *consecutive_failures += 1;
                self.status.write().await.failed_runs += 1;
                tracing::warn!(run_number, error = %err, "scheduled materialization failed");
                let _ = tx
                    .send(SchedulerEvent::RunFailed {
                        run_number,
                        error: err.to_string(),
                    })
                    .await;
            }
        }
    }

    /// Materialize automatic plans once, as of `today`.
    pub async fn run_once(&self, today: NaiveDate) -> DomainResult<RunSummary> {
        self.service.run(GenerationMode::Automatic, today).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqlitePlanRepository, SqliteWorkOrderService};
    use crate::domain::models::frequency::FrequencySpec;
    use crate::domain::models::plan::MaintenancePlan;
    use crate::services::occurrence_generator::OccurrenceGenerator;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_config_from_materialization_config() {
        let config = SchedulerConfig::from(&MaterializationConfig {
            poll_interval_secs: 60,
            max_consecutive_failures: 2,
            ..MaterializationConfig::default()
        });
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.max_consecutive_failures, 2);
        assert!(config.run_on_startup);
    }

    #[test]
    fn test_status_default() {
        let status = SchedulerStatus::default();
        assert!(!status.running);
        assert_eq!(status.total_runs, 0);
        assert!(status.last_run.is_none());
    }

    #[tokio::test]
    async fn test_startup_run_then_stop() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = Arc::new(SqlitePlanRepository::new(pool.clone()));
        repo.create(&MaintenancePlan::new(
            "weekly-walk",
            "SITE",
            FrequencySpec::daily(7).unwrap(),
            date(2025, 1, 1),
        ))
        .await
        .unwrap();
        let service = Arc::new(MaterializationService::new(
            repo,
            Arc::new(SqliteWorkOrderService::new(pool)),
            OccurrenceGenerator::default(),
            MaterializationConfig::default(),
        ));

        let scheduler = MaterializationScheduler::new(
            service,
            SchedulerConfig {
                poll_interval: Duration::from_secs(3600),
                run_on_startup: true,
                max_consecutive_failures: 3,
            },
        )
        .with_clock(Arc::new(|| NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));
        let handle = scheduler.handle();
        let mut events = scheduler.spawn();

        assert!(matches!(events.recv().await, Some(SchedulerEvent::Started)));
        assert!(matches!(
            events.recv().await,
            Some(SchedulerEvent::RunStarted { run_number: 1, .. })
        ));
        match events.recv().await {
            Some(SchedulerEvent::RunCompleted { summary, .. }) => {
                assert_eq!(summary.created_count(), 9);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        handle.stop();
        let status = handle.status().await;
        assert_eq!(status.successful_runs, 1);
        assert_eq!(status.work_orders_created, 9);
    }

    #[tokio::test]
    async fn test_stop_interrupts_wait_for_next_tick() {
        let pool = create_migrated_test_pool().await.unwrap();
        let service = Arc::new(MaterializationService::new(
            Arc::new(SqlitePlanRepository::new(pool.clone())),
            Arc::new(SqliteWorkOrderService::new(pool)),
            OccurrenceGenerator::default(),
            MaterializationConfig::default(),
        ));
        let scheduler = MaterializationScheduler::new(
            service,
            SchedulerConfig {
                poll_interval: Duration::from_secs(24 * 3600),
                run_on_startup: false,
                max_consecutive_failures: 3,
            },
        );
        let handle = scheduler.handle();
        let mut events = scheduler.spawn();
        assert!(matches!(events.recv().await, Some(SchedulerEvent::Started)));

        handle.stop();
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("scheduler kept waiting for its next tick");
        assert!(matches!(
            event,
            Some(SchedulerEvent::Stopped {
                reason: StopReason::Requested
            })
        ));
        assert!(!handle.status().await.running);
        assert_eq!(handle.status().await.total_runs, 0);
    }
}
