//! Command-line interface.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::daemon::DaemonArgs;
use commands::materialize::MaterializeArgs;
use commands::plan::PlanArgs;
use commands::preview::PreviewArgs;

#[derive(Parser, Debug)]
#[command(name = "upkeep")]
#[command(about = "Upkeep - preventive maintenance planner", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .upkeep/config.yaml)
    #[arg(short, long, global = true, env = "UPKEEP_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Preview the next dates of a frequency rule
    Preview(PreviewArgs),
    /// Maintenance plan management
    Plan(PlanArgs),
    /// Create work orders for due occurrences
    Materialize(MaterializeArgs),
    /// Run the materialization scheduler for automatic plans
    Daemon(DaemonArgs),
}

/// Print an error in the selected output mode and exit with status 1.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({ "error": format!("{err:#}") });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err:#}", console::style("Error:").red().bold());
    }
    std::process::exit(1);
}
