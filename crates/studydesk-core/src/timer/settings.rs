use serde::{Deserialize, Serialize};

use super::mode::TimerMode;
use crate::error::ValidationError;

/// Inclusive bounds the settings form enforces for a numeric field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: u32,
    pub max: u32,
}

impl Bounds {
    const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn clamp(self, value: u32) -> u32 {
        value.clamp(self.min, self.max)
    }

    fn check(self, field: &'static str, value: u32) -> Result<(), ValidationError> {
        if value < self.min || value > self.max {
            return Err(ValidationError::OutOfRange {
                field,
                value,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

pub const FOCUS_BOUNDS: Bounds = Bounds::new(1, 60);
pub const SHORT_BREAK_BOUNDS: Bounds = Bounds::new(1, 30);
pub const LONG_BREAK_BOUNDS: Bounds = Bounds::new(1, 60);
pub const LONG_BREAK_INTERVAL_BOUNDS: Bounds = Bounds::new(1, 10);

fn default_focus_minutes() -> u32 {
    25
}
fn default_short_break_minutes() -> u32 {
    5
}
fn default_long_break_minutes() -> u32 {
    15
}
fn default_long_break_interval() -> u32 {
    4
}
fn default_true() -> bool {
    true
}

/// Timer settings.
///
/// Treated as an immutable snapshot: the engine replaces it wholesale on save
/// and never edits individual duration fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    #[serde(default = "default_focus_minutes")]
    pub focus_minutes: u32,
    #[serde(default = "default_short_break_minutes")]
    pub short_break_minutes: u32,
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u32,
    /// Completed focus sessions before a long break replaces the short one.
    #[serde(default = "default_long_break_interval")]
    pub long_break_interval: u32,
    #[serde(default = "default_true")]
    pub auto_start_breaks: bool,
    #[serde(default = "default_true")]
    pub auto_start_pomodoros: bool,
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            focus_minutes: default_focus_minutes(),
            short_break_minutes: default_short_break_minutes(),
            long_break_minutes: default_long_break_minutes(),
            long_break_interval: default_long_break_interval(),
            auto_start_breaks: true,
            auto_start_pomodoros: true,
            sound_enabled: true,
        }
    }
}

impl TimerSettings {
    /// Configured length of `mode` in minutes.
    pub fn minutes_for(&self, mode: TimerMode) -> u32 {
        match mode {
            TimerMode::Focus => self.focus_minutes,
            TimerMode::ShortBreak => self.short_break_minutes,
            TimerMode::LongBreak => self.long_break_minutes,
        }
    }

    /// Configured length of `mode` in seconds.
    pub fn duration_secs(&self, mode: TimerMode) -> u64 {
        u64::from(self.minutes_for(mode)).saturating_mul(60)
    }

    /// Check every numeric field against the settings form bounds.
    ///
    /// The engine never calls this; collaborators run it before
    /// [`TimerEngine::save_settings`](super::TimerEngine::save_settings).
    pub fn validate(&self) -> Result<(), ValidationError> {
        FOCUS_BOUNDS.check("focus_minutes", self.focus_minutes)?;
        SHORT_BREAK_BOUNDS.check("short_break_minutes", self.short_break_minutes)?;
        LONG_BREAK_BOUNDS.check("long_break_minutes", self.long_break_minutes)?;
        LONG_BREAK_INTERVAL_BOUNDS.check("long_break_interval", self.long_break_interval)?;
        Ok(())
    }

    /// Build a complete settings value from a partially filled form.
    ///
    /// Missing, unparsable or zero numbers keep the value from `self` (the
    /// last known good settings); out-of-range numbers are clamped.
    pub fn apply_draft(&self, draft: &SettingsDraft) -> TimerSettings {
        let number = |raw: &Option<String>, current: u32, bounds: Bounds| -> u32 {
            match raw.as_deref().map(str::trim).map(str::parse::<u32>) {
                Some(Ok(0)) | Some(Err(_)) | None => current,
                Some(Ok(n)) => bounds.clamp(n),
            }
        };

        TimerSettings {
            focus_minutes: number(&draft.focus_minutes, self.focus_minutes, FOCUS_BOUNDS),
            short_break_minutes: number(
                &draft.short_break_minutes,
                self.short_break_minutes,
                SHORT_BREAK_BOUNDS,
            ),
            long_break_minutes: number(
                &draft.long_break_minutes,
                self.long_break_minutes,
                LONG_BREAK_BOUNDS,
            ),
            long_break_interval: number(
                &draft.long_break_interval,
                self.long_break_interval,
                LONG_BREAK_INTERVAL_BOUNDS,
            ),
            auto_start_breaks: draft.auto_start_breaks.unwrap_or(self.auto_start_breaks),
            auto_start_pomodoros: draft
                .auto_start_pomodoros
                .unwrap_or(self.auto_start_pomodoros),
            sound_enabled: draft.sound_enabled.unwrap_or(self.sound_enabled),
        }
    }
}

/// Raw settings form input. Numeric fields hold the text the user typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsDraft {
    pub focus_minutes: Option<String>,
    pub short_break_minutes: Option<String>,
    pub long_break_minutes: Option<String>,
    pub long_break_interval: Option<String>,
    pub auto_start_breaks: Option<bool>,
    pub auto_start_pomodoros: Option<bool>,
    pub sound_enabled: Option<bool>,
}
