use clap::Subcommand;
use sisyphus_core::Phase;

use super::{print_json, CliResult, Context};

#[derive(Subcommand)]
pub enum SessionAction {
    /// List recorded sessions, oldest first
    List {
        /// Only sessions of this phase
        #[arg(long)]
        phase: Option<Phase>,
        /// Only the most recent N sessions
        #[arg(long)]
        limit: Option<usize>,
    },
}

pub fn run(ctx: &Context, action: SessionAction) -> CliResult {
    let tracker = ctx.tracker()?;

    match action {
        SessionAction::List { phase, limit } => {
            let sessions: Vec<_> = tracker
                .sessions()
                .iter()
                .filter(|s| phase.map_or(true, |p| s.phase == p))
                .collect();
            let skip = limit.map_or(0, |n| sessions.len().saturating_sub(n));
            print_json(&sessions[skip..])
        }
    }
}
