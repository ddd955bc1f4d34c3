mod engine;
pub mod phase;

pub use engine::{format_mm_ss, Completion, TimerEngine, TimerState, TimerStatus};
pub use phase::{advance, next_phase, Phase, Transition};
