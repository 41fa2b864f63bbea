//! Pomodoro timer engine.
//!
//! The engine is a pure state machine over one [`Session`] value. It does not
//! own a clock or a thread - the caller invokes [`TimerEngine::tick`] once per
//! elapsed second while the session is active (see [`crate::runtime`]).
//!
//! ## Cycle
//!
//! ```text
//! Focus -> ShortBreak -> Focus -> ... -> Focus -> LongBreak -> Focus
//!          (every `long_break_interval`-th completed focus gets LongBreak)
//! ```
//!
//! ## Usage
//!
//! ```
//! use studydesk_core::timer::{TimerEngine, TimerMode, TimerSettings};
//!
//! let mut engine = TimerEngine::new(TimerSettings::default());
//! engine.toggle();
//! for _ in 0..1500 {
//!     engine.tick();
//! }
//! assert_eq!(engine.mode(), TimerMode::ShortBreak);
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::mode::TimerMode;
use super::settings::TimerSettings;
use crate::events::{Event, Snapshot};

/// Live countdown state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub mode: TimerMode,
    pub remaining_seconds: u64,
    /// Length the current mode started with. Captured on mode entry, so a
    /// settings change never rescales a countdown already running.
    pub total_seconds: u64,
    pub is_active: bool,
    pub completed_focus_count: u32,
}

impl Session {
    fn fresh(settings: &TimerSettings) -> Self {
        let total = settings.duration_secs(TimerMode::Focus);
        Self {
            mode: TimerMode::Focus,
            remaining_seconds: total,
            total_seconds: total,
            is_active: false,
            completed_focus_count: 0,
        }
    }
}

/// Side effect requested by a transition. The engine never performs these
/// itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    PlayNotification,
}

/// Result of a tick: what happened plus the effects the caller should run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transition {
    pub event: Option<Event>,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn none() -> Self {
        Self::default()
    }

    pub fn is_zero_crossing(&self) -> bool {
        matches!(self.event, Some(Event::SessionCompleted { .. }))
    }
}

/// Core timer engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerEngine {
    settings: TimerSettings,
    session: Session,
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new(TimerSettings::default())
    }
}

impl TimerEngine {
    /// Create an engine in Focus mode, paused, with a full countdown.
    ///
    /// `settings` is assumed to be validated; see [`TimerSettings::validate`].
    pub fn new(settings: TimerSettings) -> Self {
        Self {
            session: Session::fresh(&settings),
            settings,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn mode(&self) -> TimerMode {
        self.session.mode
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.session.remaining_seconds
    }

    pub fn total_seconds(&self) -> u64 {
        self.session.total_seconds
    }

    pub fn is_active(&self) -> bool {
        self.session.is_active
    }

    pub fn completed_focus_count(&self) -> u32 {
        self.session.completed_focus_count
    }

    /// 0.0 .. 1.0, the remaining share of the current mode.
    pub fn progress_fraction(&self) -> f64 {
        let total = self.session.total_seconds;
        if total == 0 {
            return 0.0;
        }
        self.session.remaining_seconds as f64 / total as f64
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            mode: self.session.mode,
            remaining_seconds: self.session.remaining_seconds,
            total_seconds: self.session.total_seconds,
            is_active: self.session.is_active,
            completed_focus_count: self.session.completed_focus_count,
            settings: self.settings,
            progress_pct: super::format::progress_percent(self.progress_fraction()),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start or pause the countdown. Always legal.
    pub fn toggle(&mut self) -> Event {
        self.session.is_active = !self.session.is_active;
        debug!(mode = %self.session.mode, active = self.session.is_active, "timer toggled");
        let mode = self.session.mode;
        let remaining_seconds = self.session.remaining_seconds;
        if self.session.is_active {
            Event::TimerStarted {
                mode,
                remaining_seconds,
                at: Utc::now(),
            }
        } else {
            Event::TimerPaused {
                mode,
                remaining_seconds,
                at: Utc::now(),
            }
        }
    }

    /// Advance one second. Ignored while paused.
    ///
    /// A decrement that reaches zero is followed, within the same call, by
    /// the zero-crossing into the next mode.
    pub fn tick(&mut self) -> Transition {
        if !self.session.is_active {
            return Transition::none();
        }
        if self.session.remaining_seconds > 0 {
            self.session.remaining_seconds -= 1;
            if self.session.remaining_seconds > 0 {
                return Transition::none();
            }
        }
        self.cross_zero()
    }

    /// Restart the current mode's countdown, paused.
    pub fn reset(&mut self) -> Event {
        self.enter_mode(self.session.mode);
        debug!(mode = %self.session.mode, "timer reset");
        Event::TimerReset {
            mode: self.session.mode,
            total_seconds: self.session.total_seconds,
            at: Utc::now(),
        }
    }

    /// Jump to the next mode as if the countdown had finished, but silently
    /// and without auto-starting.
    pub fn skip(&mut self) -> Event {
        let (from, to) = self.advance_cycle();
        debug!(%from, %to, completed = self.session.completed_focus_count, "timer skipped");
        Event::TimerSkipped {
            from,
            to,
            completed_focus_count: self.session.completed_focus_count,
            at: Utc::now(),
        }
    }

    /// User-initiated switch to `mode`. Never auto-starts.
    pub fn select_mode(&mut self, mode: TimerMode) -> Event {
        self.enter_mode(mode);
        debug!(%mode, "mode selected");
        Event::ModeSelected {
            mode,
            total_seconds: self.session.total_seconds,
            at: Utc::now(),
        }
    }

    /// Replace the settings and restart the current mode's countdown with its
    /// new full length. Active flag and completed count are kept.
    pub fn save_settings(&mut self, settings: TimerSettings) -> Event {
        self.settings = settings;
        let total = self.settings.duration_secs(self.session.mode);
        self.session.total_seconds = total;
        self.session.remaining_seconds = total;
        debug!(mode = %self.session.mode, total, "settings saved");
        Event::SettingsSaved {
            settings,
            total_seconds: total,
            at: Utc::now(),
        }
    }

    /// Mute or unmute. This is a settings replacement with only the sound
    /// flag changed, so the current countdown restarts like any save.
    pub fn set_sound_enabled(&mut self, enabled: bool) -> Event {
        self.save_settings(TimerSettings {
            sound_enabled: enabled,
            ..self.settings
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn cross_zero(&mut self) -> Transition {
        let mut effects = Vec::new();
        if self.settings.sound_enabled {
            effects.push(Effect::PlayNotification);
        }

        let (from, to) = self.advance_cycle();
        self.session.is_active = match from {
            TimerMode::Focus => self.settings.auto_start_breaks,
            TimerMode::ShortBreak | TimerMode::LongBreak => self.settings.auto_start_pomodoros,
        };

        info!(
            %from,
            %to,
            completed = self.session.completed_focus_count,
            auto_started = self.session.is_active,
            "session completed"
        );

        Transition {
            event: Some(Event::SessionCompleted {
                from,
                to,
                completed_focus_count: self.session.completed_focus_count,
                auto_started: self.session.is_active,
                at: Utc::now(),
            }),
            effects,
        }
    }

    /// Count a finished focus session and enter the following mode, paused.
    fn advance_cycle(&mut self) -> (TimerMode, TimerMode) {
        let from = self.session.mode;
        let to = match from {
            TimerMode::Focus => {
                self.session.completed_focus_count =
                    self.session.completed_focus_count.saturating_add(1);
                let interval = self.settings.long_break_interval.max(1);
                if self.session.completed_focus_count % interval == 0 {
                    TimerMode::LongBreak
                } else {
                    TimerMode::ShortBreak
                }
            }
            TimerMode::ShortBreak | TimerMode::LongBreak => TimerMode::Focus,
        };
        self.enter_mode(to);
        (from, to)
    }

    fn enter_mode(&mut self, mode: TimerMode) {
        let total = self.settings.duration_secs(mode);
        self.session.mode = mode;
        self.session.total_seconds = total;
        self.session.remaining_seconds = total;
        self.session.is_active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_crossing(engine: &mut TimerEngine) -> Transition {
        loop {
            let t = engine.tick();
            if t.is_zero_crossing() {
                return t;
            }
        }
    }

    #[test]
    fn starts_in_focus_paused() {
        let engine = TimerEngine::default();
        assert_eq!(engine.mode(), TimerMode::Focus);
        assert_eq!(engine.remaining_seconds(), 1500);
        assert_eq!(engine.total_seconds(), 1500);
        assert!(!engine.is_active());
        assert_eq!(engine.completed_focus_count(), 0);
        assert_eq!(engine.progress_fraction(), 1.0);
    }

    #[test]
    fn toggle_flips_active() {
        let mut engine = TimerEngine::default();
        assert!(matches!(engine.toggle(), Event::TimerStarted { .. }));
        assert!(engine.is_active());
        assert!(matches!(engine.toggle(), Event::TimerPaused { .. }));
        assert!(!engine.is_active());
    }

    #[test]
    fn tick_while_paused_is_ignored() {
        let mut engine = TimerEngine::default();
        assert_eq!(engine.tick(), Transition::default());
        assert_eq!(engine.remaining_seconds(), 1500);
    }

    #[test]
    fn tick_decrements_by_one() {
        let mut engine = TimerEngine::default();
        engine.toggle();
        let t = engine.tick();
        assert!(t.event.is_none());
        assert!(t.effects.is_empty());
        assert_eq!(engine.remaining_seconds(), 1499);
        assert_eq!(engine.total_seconds(), 1500);
    }

    #[test]
    fn focus_completion_auto_starts_short_break() {
        let mut engine = TimerEngine::default();
        engine.toggle();
        for _ in 0..1500 {
            engine.tick();
        }
        assert_eq!(engine.mode(), TimerMode::ShortBreak);
        assert_eq!(engine.remaining_seconds(), 300);
        assert_eq!(engine.total_seconds(), 300);
        assert!(engine.is_active());
        assert_eq!(engine.completed_focus_count(), 1);
    }

    #[test]
    fn crossing_requests_sound_only_when_enabled() {
        let mut settings = TimerSettings {
            focus_minutes: 1,
            ..TimerSettings::default()
        };
        let mut engine = TimerEngine::new(settings);
        engine.toggle();
        assert_eq!(run_to_crossing(&mut engine).effects, vec![Effect::PlayNotification]);

        settings.sound_enabled = false;
        let mut engine = TimerEngine::new(settings);
        engine.toggle();
        assert!(run_to_crossing(&mut engine).effects.is_empty());
    }

    #[test]
    fn break_completion_respects_auto_start_pomodoros() {
        let settings = TimerSettings {
            auto_start_pomodoros: false,
            ..TimerSettings::default()
        };
        let mut engine = TimerEngine::new(settings);
        engine.select_mode(TimerMode::ShortBreak);
        engine.toggle();
        let t = run_to_crossing(&mut engine);
        assert_eq!(engine.mode(), TimerMode::Focus);
        assert!(!engine.is_active());
        assert_eq!(engine.completed_focus_count(), 0);
        match t.event {
            Some(Event::SessionCompleted { from, to, auto_started, .. }) => {
                assert_eq!(from, TimerMode::ShortBreak);
                assert_eq!(to, TimerMode::Focus);
                assert!(!auto_started);
            }
            other => panic!("expected SessionCompleted, got {other:?}"),
        }
    }

    #[test]
    fn interval_of_one_makes_every_break_long() {
        let settings = TimerSettings {
            long_break_interval: 1,
            ..TimerSettings::default()
        };
        let mut engine = TimerEngine::new(settings);
        engine.skip();
        assert_eq!(engine.mode(), TimerMode::LongBreak);
        assert_eq!(engine.remaining_seconds(), 900);
    }

    #[test]
    fn skip_never_auto_starts_or_plays_sound() {
        let mut engine = TimerEngine::default();
        engine.toggle();
        let event = engine.skip();
        assert!(!engine.is_active());
        assert_eq!(engine.mode(), TimerMode::ShortBreak);
        assert_eq!(engine.completed_focus_count(), 1);
        assert!(matches!(event, Event::TimerSkipped { completed_focus_count: 1, .. }));

        engine.toggle();
        engine.skip();
        assert_eq!(engine.mode(), TimerMode::Focus);
        assert!(!engine.is_active());
        assert_eq!(engine.completed_focus_count(), 1);
    }

    #[test]
    fn reset_keeps_mode_and_count() {
        let mut engine = TimerEngine::default();
        engine.skip();
        engine.toggle();
        for _ in 0..42 {
            engine.tick();
        }
        engine.reset();
        assert_eq!(engine.mode(), TimerMode::ShortBreak);
        assert_eq!(engine.remaining_seconds(), 300);
        assert!(!engine.is_active());
        assert_eq!(engine.completed_focus_count(), 1);
    }

    #[test]
    fn select_mode_mid_focus() {
        let mut engine = TimerEngine::default();
        engine.toggle();
        for _ in 0..1490 {
            engine.tick();
        }
        assert_eq!(engine.remaining_seconds(), 10);

        engine.select_mode(TimerMode::ShortBreak);
        assert_eq!(engine.mode(), TimerMode::ShortBreak);
        assert_eq!(engine.remaining_seconds(), 300);
        assert_eq!(engine.total_seconds(), 300);
        assert!(!engine.is_active());
        assert_eq!(engine.completed_focus_count(), 0);
    }

    #[test]
    fn save_settings_restarts_current_mode_only() {
        let mut engine = TimerEngine::default();
        engine.toggle();
        for _ in 0..100 {
            engine.tick();
        }
        let new = TimerSettings {
            focus_minutes: 50,
            short_break_minutes: 10,
            ..TimerSettings::default()
        };
        engine.save_settings(new);
        assert_eq!(engine.mode(), TimerMode::Focus);
        assert_eq!(engine.remaining_seconds(), 3000);
        assert_eq!(engine.total_seconds(), 3000);
        assert!(engine.is_active());
        assert_eq!(engine.settings(), &new);
    }

    #[test]
    fn sound_toggle_is_a_settings_save() {
        let mut engine = TimerEngine::default();
        engine.toggle();
        for _ in 0..100 {
            engine.tick();
        }
        assert_eq!(engine.remaining_seconds(), 1400);

        let event = engine.set_sound_enabled(false);
        assert!(matches!(
            event,
            Event::SettingsSaved { settings, total_seconds: 1500, .. } if !settings.sound_enabled
        ));
        assert!(!engine.settings().sound_enabled);
        assert_eq!(engine.remaining_seconds(), 1500);
        assert!(engine.is_active());
        assert_eq!(engine.settings().focus_minutes, 25);
    }

    #[test]
    fn progress_fraction_guards_zero_total() {
        let settings = TimerSettings {
            focus_minutes: 0,
            ..TimerSettings::default()
        };
        let mut engine = TimerEngine::new(settings);
        assert_eq!(engine.progress_fraction(), 0.0);

        // A zero-length mode crosses on its first tick.
        engine.toggle();
        assert!(engine.tick().is_zero_crossing());
        assert_eq!(engine.mode(), TimerMode::ShortBreak);
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut engine = TimerEngine::default();
        engine.toggle();
        for _ in 0..750 {
            engine.tick();
        }
        let snap = engine.snapshot();
        assert_eq!(snap.mode, TimerMode::Focus);
        assert_eq!(snap.remaining_seconds, 750);
        assert!(snap.is_active);
        assert_eq!(snap.progress_pct, 50.0);
        assert_eq!(snap.clock(), "12:30");
    }
}
