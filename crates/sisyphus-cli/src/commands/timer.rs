use clap::Subcommand;
use sisyphus_core::Phase;

use super::{flush_notices, print_json, CliResult, Context};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume the countdown
    Start,
    /// Pause a running countdown
    Pause,
    /// Rewind the current phase without recording it
    Reset,
    /// Finish the current phase now and record it
    Skip,
    /// Jump to a phase: work, short_break or long_break
    Mode {
        phase: Phase,
    },
    /// Print current timer state as JSON
    Status,
}

/// Prints the events the command produced, then a fresh snapshot.
pub fn run(ctx: &Context, action: TimerAction) -> CliResult {
    let mut tracker = ctx.tracker()?;

    let mut events = match action {
        TimerAction::Start => tracker.start(),
        TimerAction::Pause => tracker.pause(),
        TimerAction::Reset => tracker.reset(),
        TimerAction::Skip => tracker.skip(),
        TimerAction::Mode { phase } => tracker.switch_mode(phase),
        TimerAction::Status => tracker.tick(),
    };
    events.push(tracker.snapshot());

    flush_notices(&mut tracker);
    print_json(&events)
}
