//! Per-user timer settings.
//!
//! Stores:
//! - Phase durations and the long-break interval
//! - Auto-start behaviour for breaks and work intervals
//! - Appearance (theme, phase colours)
//! - Alarm and background sound preferences
//!
//! Settings are persisted through the [`Store`](crate::storage::Store) for
//! the signed-in user. Only the `timer` section affects timer semantics.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, CoreError, ValidationError};
use crate::timer::Phase;

/// Timer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Work interval length in minutes.
    #[serde(default = "default_work_duration")]
    pub work_duration: u32,
    #[serde(default = "default_short_break")]
    pub short_break_duration: u32,
    #[serde(default = "default_long_break")]
    pub long_break_duration: u32,
    /// Completed work intervals between long breaks.
    #[serde(default = "default_long_break_interval")]
    pub long_break_interval: u32,
    #[serde(default)]
    pub auto_start_breaks: bool,
    #[serde(default)]
    pub auto_start_work: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Appearance configuration. Cosmetic only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppearanceConfig {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_work_color")]
    pub work_color: String,
    #[serde(default = "default_short_break_color")]
    pub short_break_color: String,
    #[serde(default = "default_long_break_color")]
    pub long_break_color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlarmSound {
    #[default]
    Bell,
    Chime,
    Digital,
    Gentle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundSound {
    #[default]
    None,
    Rain,
    Cafe,
    Fireplace,
    Forest,
}

/// Sound configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundConfig {
    #[serde(default)]
    pub alarm_sound: AlarmSound,
    #[serde(default)]
    pub background_sound: BackgroundSound,
    /// 0..=100
    #[serde(default = "default_alarm_volume")]
    pub alarm_volume: u32,
    /// 0..=100
    #[serde(default = "default_background_volume")]
    pub background_volume: u32,
}

/// All per-user settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub appearance: AppearanceConfig,
    #[serde(default)]
    pub sound: SoundConfig,
}

// Default functions
fn default_work_duration() -> u32 {
    25
}
fn default_short_break() -> u32 {
    5
}
fn default_long_break() -> u32 {
    15
}
fn default_long_break_interval() -> u32 {
    4
}
fn default_work_color() -> String {
    "#f97316".into()
}
fn default_short_break_color() -> String {
    "#06b6d4".into()
}
fn default_long_break_color() -> String {
    "#8b5cf6".into()
}
fn default_alarm_volume() -> u32 {
    50
}
fn default_background_volume() -> u32 {
    30
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work_duration: default_work_duration(),
            short_break_duration: default_short_break(),
            long_break_duration: default_long_break(),
            long_break_interval: default_long_break_interval(),
            auto_start_breaks: false,
            auto_start_work: false,
        }
    }
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            work_color: default_work_color(),
            short_break_color: default_short_break_color(),
            long_break_color: default_long_break_color(),
        }
    }
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            alarm_sound: AlarmSound::Bell,
            background_sound: BackgroundSound::None,
            alarm_volume: default_alarm_volume(),
            background_volume: default_background_volume(),
        }
    }
}

fn check_range(field: &'static str, value: u32, min: u32, max: u32) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            min,
            max,
            value,
        });
    }
    Ok(())
}

fn check_color(field: &'static str, value: &str) -> Result<(), ValidationError> {
    let hex = value.strip_prefix('#').unwrap_or("");
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue {
            field,
            message: format!("expected #rrggbb colour, got '{value}'"),
        })
    }
}

impl TimerConfig {
    /// Configured duration of `phase` in minutes.
    pub fn duration_min(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Work => self.work_duration,
            Phase::ShortBreak => self.short_break_duration,
            Phase::LongBreak => self.long_break_duration,
        }
    }

    /// Configured duration of `phase` in seconds.
    pub fn duration_secs(&self, phase: Phase) -> u64 {
        u64::from(self.duration_min(phase)).saturating_mul(60)
    }

    /// Whether finishing into `next` should start the countdown immediately.
    pub fn auto_starts(&self, next: Phase) -> bool {
        if next.is_break() {
            self.auto_start_breaks
        } else {
            self.auto_start_work
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range("timer.work_duration", self.work_duration, 1, 60)?;
        check_range("timer.short_break_duration", self.short_break_duration, 1, 30)?;
        check_range("timer.long_break_duration", self.long_break_duration, 1, 60)?;
        check_range("timer.long_break_interval", self.long_break_interval, 2, 10)?;
        Ok(())
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.timer.validate()?;
        check_color("appearance.work_color", &self.appearance.work_color)?;
        check_color("appearance.short_break_color", &self.appearance.short_break_color)?;
        check_color("appearance.long_break_color", &self.appearance.long_break_color)?;
        check_range("sound.alarm_volume", self.sound.alarm_volume, 0, 100)?;
        check_range("sound.background_volume", self.sound.background_volume, 0, 100)?;
        Ok(())
    }

    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u32>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as a whole number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(unknown());
                    }
                    _ => serde_json::Value::String(value.to_string()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Get a setting as a string by dot-separated key, e.g. `timer.work_duration`.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Return a copy with one dot-path key changed.
    ///
    /// The result is validated; `self` is never modified, so a rejected
    /// value leaves the previous valid settings in place.
    pub fn with_value(&self, key: &str, value: &str) -> Result<Settings, CoreError> {
        let mut json = serde_json::to_value(self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Settings = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        Ok(updated)
    }
}
