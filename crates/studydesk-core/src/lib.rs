//! # studydesk Core Library
//!
//! The Pomodoro session engine behind the studydesk dashboard. Front ends
//! (the `studydesk` CLI, or any other view layer) only call into the engine
//! and render its snapshots.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a pure state machine over one session value; the
//!   caller invokes `tick()` once per elapsed second while active
//! - **Runtime**: a tokio task that owns the engine, drives the 1 Hz ticker
//!   and performs the notification side effect
//! - **Storage**: TOML-based settings file
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`TimerRuntime`]: Single-owner async driver
//! - [`Config`]: Application configuration management
//! - [`Notifier`]: Trait for the end-of-session cue

pub mod error;
pub mod events;
pub mod notify;
pub mod runtime;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, NotifyError, ValidationError};
pub use events::{Event, Snapshot};
pub use notify::Notifier;
pub use runtime::{Command, RuntimeHandle, TimerRuntime};
pub use storage::Config;
pub use timer::{Effect, Session, SettingsDraft, TimerEngine, TimerMode, TimerSettings, Transition};
