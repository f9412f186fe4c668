//! `upkeep preview`: show the next dates of a frequency rule without saving it.

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;

use super::{generator_for, parse_count, today, FrequencyArgs};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::config::Config;
use crate::services::recurrence_previewer::{Preview, RecurrencePreviewer};

#[derive(Args, Debug)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub frequency: FrequencyArgs,

    /// First date considered (YYYY-MM-DD, default today)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Number of dates to show (1-100)
    #[arg(long, value_parser = parse_count)]
    pub count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct PreviewOutput {
    pub frequency: String,
    pub start: NaiveDate,
    #[serde(flatten)]
    pub preview: Preview,
    pub notice_message: Option<String>,
}

impl CommandOutput for PreviewOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "{} starting {}:",
            console::style(&self.frequency).bold(),
            self.start
        )];
        for (i, date) in self.preview.formatted.iter().enumerate() {
            lines.push(format!("  {:>2}. {}", i + 1, date));
        }
        if self.preview.has_more {
            lines.push("  ...".to_string());
        }
        if let Some(ref message) = self.notice_message {
            lines.push(format!("{}", console::style(message).yellow()));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: PreviewArgs, config: &Config, json_mode: bool) -> Result<()> {
    let spec = args.frequency.to_spec()?;
    let start = args.start.unwrap_or_else(today);
    let previewer = RecurrencePreviewer::new(
        generator_for(config),
        args.count.unwrap_or(config.recurrence.preview_count),
        config.recurrence.date_format.clone(),
    );

    let preview = previewer.preview(&spec, start);
    let out = PreviewOutput {
        frequency: spec.description(),
        start,
        notice_message: preview.notice.map(|n| n.message()),
        preview,
    };
    output(&out, json_mode);
    Ok(())
}
