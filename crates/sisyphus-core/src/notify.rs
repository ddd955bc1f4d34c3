//! Phase-completion alerts.
//!
//! The core never plays audio itself. Hosts plug in a [`Notifier`]; the
//! default [`LogNotifier`] only writes a log line.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::settings::{AlarmSound, SoundConfig};
use crate::timer::Phase;

/// What to announce when a phase ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub finished: Phase,
    pub next_phase: Phase,
    pub sound: AlarmSound,
    /// 0..=100
    pub volume: u32,
    pub skipped: bool,
}

impl Alert {
    pub fn new(finished: Phase, next_phase: Phase, skipped: bool, sound: &SoundConfig) -> Self {
        Self {
            finished,
            next_phase,
            sound: sound.alarm_sound,
            volume: sound.alarm_volume,
            skipped,
        }
    }

    /// Short human-readable message, e.g. "Focus Time complete. Next: Short Break".
    pub fn message(&self) -> String {
        format!(
            "{} complete. Next: {}",
            self.finished.label(),
            self.next_phase.label()
        )
    }
}

/// Receives an [`Alert`] for every completed phase.
///
/// Errors are reported to the caller, which logs them and carries on;
/// an alert failure never affects the timer.
pub trait Notifier: Send + Sync {
    fn notify(&self, alert: &Alert) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Writes alerts to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, alert: &Alert) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!(
            finished = %alert.finished,
            next = %alert.next_phase,
            sound = ?alert.sound,
            volume = alert.volume,
            "{}",
            alert.message()
        );
        Ok(())
    }
}
