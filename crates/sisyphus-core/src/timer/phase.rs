//! Phase sequencing.
//!
//! Work is followed by a short break, except every `long_break_interval`-th
//! completed work interval, which is followed by a long break. Any break is
//! followed by work. Natural expiry and manual skip both go through
//! [`advance`], so the two paths cannot disagree.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::settings::TimerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[serde(alias = "pomodoro")]
    Work,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Work, Phase::ShortBreak, Phase::LongBreak];

    pub fn is_break(self) -> bool {
        !matches!(self, Phase::Work)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Work => "work",
            Phase::ShortBreak => "short_break",
            Phase::LongBreak => "long_break",
        }
    }

    /// Human-readable label, e.g. for a window title.
    pub fn label(self) -> &'static str {
        match self {
            Phase::Work => "Focus Time",
            Phase::ShortBreak => "Short Break",
            Phase::LongBreak => "Long Break",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "work" | "pomodoro" | "focus" => Ok(Phase::Work),
            "short_break" | "short" => Ok(Phase::ShortBreak),
            "long_break" | "long" => Ok(Phase::LongBreak),
            other => Err(format!("unknown phase: {other}")),
        }
    }
}

/// Result of finishing a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: Phase,
    pub duration_min: u32,
    /// Work-completion counter after the finished phase is accounted for.
    pub completed_work_count: u32,
}

/// Phase that follows a completed work interval.
///
/// `completed_work_count` is the count *before* this completion.
pub fn next_phase(completed_work_count: u32, config: &TimerConfig) -> (Phase, u32) {
    let new_count = completed_work_count.saturating_add(1);
    let interval = config.long_break_interval.max(1);
    if new_count % interval == 0 {
        (Phase::LongBreak, config.long_break_duration)
    } else {
        (Phase::ShortBreak, config.short_break_duration)
    }
}

/// Compute the transition out of `finished`.
pub fn advance(finished: Phase, completed_work_count: u32, config: &TimerConfig) -> Transition {
    match finished {
        Phase::Work => {
            let (next, duration_min) = next_phase(completed_work_count, config);
            Transition {
                next,
                duration_min,
                completed_work_count: completed_work_count.saturating_add(1),
            }
        }
        Phase::ShortBreak | Phase::LongBreak => Transition {
            next: Phase::Work,
            duration_min: config.work_duration,
            completed_work_count,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classic() -> TimerConfig {
        TimerConfig {
            work_duration: 25,
            short_break_duration: 5,
            long_break_duration: 15,
            long_break_interval: 4,
            auto_start_breaks: false,
            auto_start_work: false,
        }
    }

    #[test]
    fn fourth_work_interval_earns_long_break() {
        assert_eq!(next_phase(3, &classic()), (Phase::LongBreak, 15));
    }

    #[test]
    fn other_work_intervals_earn_short_break() {
        assert_eq!(next_phase(2, &classic()), (Phase::ShortBreak, 5));
        assert_eq!(next_phase(0, &classic()), (Phase::ShortBreak, 5));
        assert_eq!(next_phase(4, &classic()), (Phase::ShortBreak, 5));
    }

    #[test]
    fn breaks_always_return_to_work() {
        let cfg = classic();
        for finished in [Phase::ShortBreak, Phase::LongBreak] {
            let t = advance(finished, 7, &cfg);
            assert_eq!(t.next, Phase::Work);
            assert_eq!(t.duration_min, 25);
            assert_eq!(t.completed_work_count, 7);
        }
    }

    #[test]
    fn work_completion_increments_counter() {
        let t = advance(Phase::Work, 3, &classic());
        assert_eq!(t.completed_work_count, 4);
        assert_eq!(t.next, Phase::LongBreak);
    }

    #[test]
    fn parses_legacy_and_short_names() {
        assert_eq!("pomodoro".parse::<Phase>().unwrap(), Phase::Work);
        assert_eq!("short-break".parse::<Phase>().unwrap(), Phase::ShortBreak);
        assert_eq!("long".parse::<Phase>().unwrap(), Phase::LongBreak);
        assert!("lunch".parse::<Phase>().is_err());
    }

    #[test]
    fn serde_accepts_legacy_pomodoro_name() {
        let p: Phase = serde_json::from_str("\"pomodoro\"").unwrap();
        assert_eq!(p, Phase::Work);
        assert_eq!(serde_json::to_string(&Phase::ShortBreak).unwrap(), "\"short_break\"");
    }
}
