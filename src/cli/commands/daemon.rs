//! `upkeep daemon`: run the materialization scheduler in the foreground.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tokio::sync::mpsc;

use super::{generator_for, open_database};
use crate::adapters::sqlite::{SqlitePlanRepository, SqliteWorkOrderService};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::config::Config;
use crate::services::materialization_scheduler::{
    MaterializationScheduler, SchedulerConfig, SchedulerEvent, StopReason,
};
use crate::services::materialization_service::MaterializationService;

#[derive(Args, Debug)]
pub struct DaemonArgs {
    /// Seconds between runs (overrides materialization.poll_interval_secs)
    #[arg(long)]
    pub interval_secs: Option<u64>,

    /// Wait one interval before the first run
    #[arg(long)]
    pub no_startup_run: bool,
}

#[derive(Debug, Serialize)]
pub struct DaemonOutput {
    pub stop_reason: String,
    pub total_runs: u64,
    pub failed_runs: u64,
    pub work_orders_created: u64,
}

impl CommandOutput for DaemonOutput {
    fn to_human(&self) -> String {
        format!(
            "Scheduler stopped ({}): {} run(s), {} failed, {} work order(s) created",
            self.stop_reason, self.total_runs, self.failed_runs, self.work_orders_created
        )
    }
}

/// Drain events until the scheduler has finished its current run and stopped.
async fn wait_for_stop(events: &mut mpsc::Receiver<SchedulerEvent>) -> StopReason {
    while let Some(event) = events.recv().await {
        if let SchedulerEvent::Stopped { reason } = event {
            return reason;
        }
    }
    StopReason::Requested
}

pub async fn execute(args: DaemonArgs, config: &Config, json_mode: bool) -> Result<()> {
    let pool = open_database(config).await?;
    let service = Arc::new(MaterializationService::new(
        Arc::new(SqlitePlanRepository::new(pool.clone())),
        Arc::new(SqliteWorkOrderService::new(pool)),
        generator_for(config),
        config.materialization.clone(),
    ));

    let mut scheduler_config = SchedulerConfig::from(&config.materialization);
    if let Some(secs) = args.interval_secs {
        scheduler_config.poll_interval = Duration::from_secs(secs.max(1));
    }
    scheduler_config.run_on_startup = !args.no_startup_run;

    let scheduler = MaterializationScheduler::new(service, scheduler_config);
    let handle = scheduler.handle();
    let mut events = scheduler.spawn();

    let reason = loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SchedulerEvent::RunCompleted { run_number, summary, duration_ms }) => {
                    tracing::info!(
                        run_number,
                        created = summary.created_count(),
                        failures = summary.failures.len(),
                        duration_ms,
                        "scheduled run completed"
                    );
                }
                Some(SchedulerEvent::Stopped { reason }) => break reason,
                Some(_) => {}
                None => break StopReason::Requested,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received, stopping scheduler");
                handle.stop();
                break wait_for_stop(&mut events).await;
            }
        }
    };

    let status = handle.status().await;
    let out = DaemonOutput {
        stop_reason: match reason {
            StopReason::Requested => "requested",
            StopReason::TooManyFailures => "too many consecutive failures",
        }
        .to_string(),
        total_runs: status.total_runs,
        failed_runs: status.failed_runs,
        work_orders_created: status.work_orders_created,
    };
    output(&out, json_mode);

    if reason == StopReason::TooManyFailures {
        anyhow::bail!("materialization scheduler gave up after repeated failures");
    }
    Ok(())
}
