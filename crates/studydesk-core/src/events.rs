use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{TimerMode, TimerSettings};

/// Every engine operation reports what happened as an Event.
/// The view layer renders snapshots; the CLI prints events as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        mode: TimerMode,
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        mode: TimerMode,
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        mode: TimerMode,
        total_seconds: u64,
        at: DateTime<Utc>,
    },
    /// The countdown reached zero and the engine moved to the next mode.
    SessionCompleted {
        from: TimerMode,
        to: TimerMode,
        completed_focus_count: u32,
        auto_started: bool,
        at: DateTime<Utc>,
    },
    /// Manual advance; never plays the cue and never auto-starts.
    TimerSkipped {
        from: TimerMode,
        to: TimerMode,
        completed_focus_count: u32,
        at: DateTime<Utc>,
    },
    ModeSelected {
        mode: TimerMode,
        total_seconds: u64,
        at: DateTime<Utc>,
    },
    SettingsSaved {
        settings: TimerSettings,
        total_seconds: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot(Snapshot),
}

/// Read-only view of the engine handed to the render layer after every
/// operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub mode: TimerMode,
    pub remaining_seconds: u64,
    pub total_seconds: u64,
    pub is_active: bool,
    pub completed_focus_count: u32,
    pub settings: TimerSettings,
    /// 0.0 .. 100.0, remaining share of the current mode.
    pub progress_pct: f64,
    pub at: DateTime<Utc>,
}

impl Snapshot {
    /// `MM:SS` rendering of the remaining time.
    pub fn clock(&self) -> String {
        crate::timer::format_clock(self.remaining_seconds)
    }
}
