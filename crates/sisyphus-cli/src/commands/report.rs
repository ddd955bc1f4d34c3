use std::path::PathBuf;

use clap::Subcommand;
use sisyphus_core::{Bucket, Period};

use super::{print_json, CliResult, Context};

#[derive(Subcommand)]
pub enum ReportAction {
    /// Focus totals and streak for a period
    Summary {
        /// day, week, month or year
        #[arg(long, default_value = "week")]
        period: Period,
    },
    /// Focus minutes per project, bucketed over time
    Rollup {
        /// week, month or year
        #[arg(long, default_value = "week")]
        by: Bucket,
        /// Only count sessions inside this period
        #[arg(long)]
        within: Option<Period>,
    },
    /// Recorded sessions, newest first
    History {
        #[arg(long, default_value = "1")]
        page: usize,
        #[arg(long, default_value = "10")]
        per_page: usize,
    },
    /// Export every session as CSV
    Export {
        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

pub fn run(ctx: &Context, action: ReportAction) -> CliResult {
    let tracker = ctx.tracker()?;

    match action {
        ReportAction::Summary { period } => print_json(&tracker.report(period)),
        ReportAction::Rollup { by, within } => print_json(&tracker.rollup(by, within)),
        ReportAction::History { page, per_page } => print_json(&tracker.history(page, per_page)),
        ReportAction::Export { output } => {
            let csv = tracker.export_csv();
            match output {
                Some(path) => {
                    std::fs::write(&path, csv)?;
                    eprintln!("exported {} sessions to {}", tracker.sessions().len(), path.display());
                }
                None => print!("{csv}"),
            }
            Ok(())
        }
    }
}
