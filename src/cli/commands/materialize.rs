//! `upkeep materialize`: operator trigger for turning due occurrences into
//! work orders.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;

use super::{generator_for, open_database, today};
use crate::adapters::sqlite::{SqlitePlanRepository, SqliteWorkOrderService};
use crate::cli::output::{output, table_with_header, CommandOutput};
use crate::domain::models::config::Config;
use crate::domain::models::plan::GenerationMode;
use crate::services::materialization_service::{MaterializationReport, MaterializationService, RunSummary};
use crate::services::plan_service::PlanService;

#[derive(Args, Debug)]
pub struct MaterializeArgs {
    /// Plans to process: automatic or manual
    #[arg(long, default_value = "automatic")]
    pub mode: String,

    /// Only this plan (name, ID or ID prefix), whatever its mode
    #[arg(long)]
    pub plan: Option<String>,

    /// Reference date; nothing earlier is materialized (default today)
    #[arg(long)]
    pub today: Option<NaiveDate>,

    /// Last date to materialize (default end of the lookahead month)
    #[arg(long)]
    pub through: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct MaterializeOutput {
    pub through: NaiveDate,
    pub reports: Vec<MaterializationReport>,
    pub failures: Vec<FailureOutput>,
    pub total_created: usize,
    pub total_recovered: usize,
}

#[derive(Debug, Serialize)]
pub struct FailureOutput {
    pub plan_id: String,
    pub error: String,
}

impl MaterializeOutput {
    fn from_summary(summary: RunSummary, through: NaiveDate) -> Self {
        Self {
            through,
            total_created: summary.created_count(),
            total_recovered: summary.recovered_count(),
            failures: summary
                .failures
                .into_iter()
                .map(|(plan_id, error)| FailureOutput {
                    plan_id: plan_id.to_string(),
                    error,
                })
                .collect(),
            reports: summary.reports,
        }
    }
}

impl CommandOutput for MaterializeOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Created {} work order(s) through {}.",
            self.total_created, self.through
        )];

        let created: Vec<_> = self
            .reports
            .iter()
            .flat_map(|r| r.created.iter().map(move |c| (r, c)))
            .collect();
        if !created.is_empty() {
            let mut table = table_with_header(&["PLAN", "DUE", "WORK ORDER"]);
            for (report, occurrence) in created {
                table.add_row(vec![
                    report.plan_name.clone(),
                    occurrence.date.to_string(),
                    occurrence.work_order_id.to_string(),
                ]);
            }
            lines.push(table.to_string());
        }

        if self.total_recovered > 0 {
            lines.push(format!(
                "Completed {} occurrence(s) left pending by an earlier run.",
                self.total_recovered
            ));
        }
        let skipped: usize = self.reports.iter().map(|r| r.already_materialized).sum();
        if skipped > 0 {
            lines.push(format!("{skipped} occurrence(s) already had a work order."));
        }
        for failure in &self.failures {
            lines.push(format!(
                "{} plan {}: {}",
                console::style("Failed").red().bold(),
                failure.plan_id,
                failure.error
            ));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: MaterializeArgs, config: &Config, json_mode: bool) -> Result<()> {
    let mode = GenerationMode::from_str(&args.mode).with_context(|| {
        format!("Invalid generation mode '{}'. Must be one of: automatic, manual", args.mode)
    })?;
    let pool = open_database(config).await?;
    let repo = Arc::new(SqlitePlanRepository::new(pool.clone()));
    let service = MaterializationService::new(
        repo.clone(),
        Arc::new(SqliteWorkOrderService::new(pool)),
        generator_for(config),
        config.materialization.clone(),
    );

    let today = args.today.unwrap_or_else(today);
    let through = args.through.unwrap_or_else(|| service.horizon_end(today));
    if through < today {
        anyhow::bail!("--through ({through}) is before --today ({today})");
    }

    let summary = match args.plan {
        Some(id_or_name) => {
            let plan = PlanService::new(repo, generator_for(config))
                .find_plan(&id_or_name)
                .await?;
            let report = service.materialize_plan(&plan, today, through).await?;
            RunSummary {
                mode: Some(plan.generation_mode),
                through: Some(through),
                reports: vec![report],
                failures: Vec::new(),
            }
        }
        None => service.run_through(mode, today, through).await?,
    };

    output(&MaterializeOutput::from_summary(summary, through), json_mode);
    Ok(())
}
