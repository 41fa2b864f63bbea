mod engine;
pub mod format;
mod mode;
mod settings;

pub use engine::{Effect, Session, TimerEngine, Transition};
pub use format::{completed_label, format_clock, progress_bar, progress_percent};
pub use mode::TimerMode;
pub use settings::{
    Bounds, SettingsDraft, TimerSettings, FOCUS_BOUNDS, LONG_BREAK_BOUNDS,
    LONG_BREAK_INTERVAL_BOUNDS, SHORT_BREAK_BOUNDS,
};
