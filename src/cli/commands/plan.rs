//! `upkeep plan`: create, inspect, reschedule and delete maintenance plans.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde::Serialize;

use super::{generator_for, open_database, parse_count, today, FrequencyArgs};
use crate::adapters::sqlite::SqlitePlanRepository;
use crate::cli::output::{output, short_id, table_with_header, truncate, CommandOutput};
use crate::domain::models::config::Config;
use crate::domain::models::plan::{GenerationMode, MaintenancePlan};
use crate::domain::ports::plan_repository::PlanFilter;
use crate::services::plan_service::PlanService;
use crate::services::recurrence_previewer::RecurrencePreviewer;

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(subcommand)]
    pub command: PlanCommands,
}

#[derive(Subcommand, Debug)]
pub enum PlanCommands {
    /// Create a maintenance plan
    Create {
        /// Plan name (unique)
        name: String,

        /// Asset the plan maintains
        #[arg(long)]
        asset: String,

        /// Work to perform on each occurrence
        #[arg(long, default_value = "")]
        description: String,

        /// Date the rule takes effect (YYYY-MM-DD, default today)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Generation mode: automatic or manual
        #[arg(long, default_value = "automatic")]
        mode: String,

        #[command(flatten)]
        frequency: FrequencyArgs,
    },

    /// List maintenance plans
    List {
        /// Filter by generation mode
        #[arg(long)]
        mode: Option<String>,

        /// Filter by asset
        #[arg(long)]
        asset: Option<String>,
    },

    /// Show a plan with its upcoming dates
    Show {
        /// Plan name, ID or ID prefix
        id_or_name: String,

        /// Number of upcoming dates to show (1-100)
        #[arg(long, value_parser = parse_count)]
        count: Option<usize>,
    },

    /// Replace a plan's frequency rule
    SetFrequency {
        /// Plan name, ID or ID prefix
        id_or_name: String,

        /// Date the new rule takes effect (YYYY-MM-DD, default today)
        #[arg(long)]
        effective_from: Option<NaiveDate>,

        #[command(flatten)]
        frequency: FrequencyArgs,
    },

    /// Delete a plan and its occurrence history
    Delete {
        /// Plan name, ID or ID prefix
        id_or_name: String,
    },
}

// -- Output structs --

#[derive(Debug, Serialize)]
pub struct PlanOutput {
    pub id: String,
    pub name: String,
    pub asset: String,
    pub description: String,
    pub frequency: String,
    pub start_date: NaiveDate,
    pub generation_mode: String,
    pub next_due: Option<NaiveDate>,
}

impl PlanOutput {
    fn new(plan: &MaintenancePlan, next_due: Option<NaiveDate>) -> Self {
        Self {
            id: plan.id.to_string(),
            name: plan.name.clone(),
            asset: plan.asset.clone(),
            description: plan.description.clone(),
            frequency: plan.frequency.description(),
            start_date: plan.start_date,
            generation_mode: plan.generation_mode.as_str().to_string(),
            next_due,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlanListOutput {
    pub plans: Vec<PlanOutput>,
    pub total: usize,
}

impl CommandOutput for PlanListOutput {
    fn to_human(&self) -> String {
        if self.plans.is_empty() {
            return "No maintenance plans found.".to_string();
        }

        let mut table = table_with_header(&["ID", "NAME", "ASSET", "FREQUENCY", "MODE", "NEXT DUE"]);
        for p in &self.plans {
            table.add_row(vec![
                short_id(&p.id).to_string(),
                truncate(&p.name, 24),
                truncate(&p.asset, 16),
                truncate(&p.frequency, 40),
                p.generation_mode.clone(),
                p.next_due.map_or_else(|| "-".to_string(), |d| d.to_string()),
            ]);
        }
        format!("Found {} plan(s):\n{}", self.total, table)
    }
}

#[derive(Debug, Serialize)]
pub struct PlanDetailOutput {
    pub plan: PlanOutput,
    pub upcoming: Vec<String>,
    pub materialized_count: usize,
    pub last_materialized: Option<NaiveDate>,
    pub created_at: String,
    pub updated_at: String,
}

impl CommandOutput for PlanDetailOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Plan: {}", console::style(&self.plan.name).bold()),
            format!("ID: {}", self.plan.id),
            format!("Asset: {}", self.plan.asset),
        ];
        if !self.plan.description.is_empty() {
            lines.push(format!("Description: {}", self.plan.description));
        }
        lines.push(format!("Frequency: {}", self.plan.frequency));
        lines.push(format!("Start date: {}", self.plan.start_date));
        lines.push(format!("Mode: {}", self.plan.generation_mode));
        lines.push(format!(
            "Work orders created: {}{}",
            self.materialized_count,
            self.last_materialized
                .map(|d| format!(" (last due {d})"))
                .unwrap_or_default()
        ));

        lines.push(String::new());
        if self.upcoming.is_empty() {
            lines.push("No upcoming dates.".to_string());
        } else {
            lines.push("Upcoming:".to_string());
            lines.extend(self.upcoming.iter().map(|d| format!("  {d}")));
        }

        lines.push(String::new());
        lines.push(format!("Created: {}", self.created_at));
        lines.push(format!("Updated: {}", self.updated_at));
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct PlanActionOutput {
    pub success: bool,
    pub plan_id: String,
    pub message: String,
}

impl CommandOutput for PlanActionOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }
}

fn parse_mode(mode: &str) -> Result<GenerationMode> {
    GenerationMode::from_str(mode)
        .with_context(|| format!("Invalid generation mode '{mode}'. Must be one of: automatic, manual"))
}

pub async fn execute(args: PlanArgs, config: &Config, json_mode: bool) -> Result<()> {
    let pool = open_database(config).await?;
    let repo = Arc::new(SqlitePlanRepository::new(pool));
    let service = PlanService::new(repo, generator_for(config));
    let today = today();

    match args.command {
        PlanCommands::Create {
            name,
            asset,
            description,
            start,
            mode,
            frequency,
        } => {
            let spec = frequency.to_spec()?;
            let plan = MaintenancePlan::new(name, asset, spec, start.unwrap_or(today))
                .with_description(description)
                .with_generation_mode(parse_mode(&mode)?);
            let plan = service.create_plan(plan).await?;

            let out = PlanActionOutput {
                success: true,
                plan_id: plan.id.to_string(),
                message: format!("Plan '{}' created: {}", plan.name, plan.frequency),
            };
            output(&out, json_mode);
        }

        PlanCommands::List { mode, asset } => {
            let filter = PlanFilter {
                generation_mode: mode.as_deref().map(parse_mode).transpose()?,
                asset,
            };
            let plans = service.list_plans(filter).await?;
            let out = PlanListOutput {
                total: plans.len(),
                plans: plans
                    .iter()
                    .map(|p| PlanOutput::new(p, service.upcoming(p, today, 1).first().copied()))
                    .collect(),
            };
            output(&out, json_mode);
        }

        PlanCommands::Show { id_or_name, count } => {
            let plan = service.find_plan(&id_or_name).await?;
            let previewer = RecurrencePreviewer::from_config(&config.recurrence);
            let upcoming = service.upcoming(&plan, today, count.unwrap_or(previewer.count()));
            let history = service.materialized_dates(plan.id).await?;

            let out = PlanDetailOutput {
                plan: PlanOutput::new(&plan, upcoming.first().copied()),
                upcoming: upcoming.iter().map(|d| previewer.format_date(*d)).collect(),
                materialized_count: history.len(),
                last_materialized: history.iter().max().copied(),
                created_at: plan.created_at.to_rfc3339(),
                updated_at: plan.updated_at.to_rfc3339(),
            };
            output(&out, json_mode);
        }

        PlanCommands::SetFrequency {
            id_or_name,
            effective_from,
            frequency,
        } => {
            let spec = frequency.to_spec()?;
            let plan = service.find_plan(&id_or_name).await?;
            let effective_from = effective_from.unwrap_or(today);
            let plan = service.change_frequency(plan.id, spec, effective_from).await?;

            let out = PlanActionOutput {
                success: true,
                plan_id: plan.id.to_string(),
                message: format!(
                    "Plan '{}' now {} from {}",
                    plan.name,
                    plan.frequency.description().to_lowercase(),
                    effective_from
                ),
            };
            output(&out, json_mode);
        }

        PlanCommands::Delete { id_or_name } => {
            let plan = service.find_plan(&id_or_name).await?;
            service.delete_plan(plan.id).await?;

            let out = PlanActionOutput {
                success: true,
                plan_id: plan.id.to_string(),
                message: format!("Plan '{}' deleted", plan.name),
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}
