use std::io::Write;

use clap::{Args, Subcommand};
use serde::Serialize;
use studydesk_core::timer::{completed_label, format_clock, progress_bar};
use studydesk_core::{
    Command, Config, Effect, Event, SettingsDraft, Snapshot, TimerEngine, TimerMode,
    TimerRuntime, TimerSettings,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

const BAR_WIDTH: usize = 20;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run the timer interactively, reading single-letter commands from stdin
    Run {
        #[command(flatten)]
        settings: SettingsArgs,
        /// Print JSON snapshots instead of status lines
        #[arg(long)]
        json: bool,
    },
    /// Apply ticks and skips to a fresh engine without waiting, then print the result
    Simulate {
        /// Number of one-second ticks to apply
        #[arg(long, default_value = "0")]
        ticks: u64,
        /// Number of skips to apply after the ticks
        #[arg(long, default_value = "0")]
        skip: u32,
        /// Mode to select before starting
        #[arg(long)]
        mode: Option<TimerMode>,
        /// Leave the timer paused instead of starting it
        #[arg(long)]
        paused: bool,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Print the initial timer state for the configured settings as JSON
    Status {
        #[command(flatten)]
        settings: SettingsArgs,
    },
}

/// Per-invocation overrides on top of the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Focus length in minutes (1-60)
    #[arg(long)]
    focus: Option<u32>,
    /// Short break length in minutes (1-30)
    #[arg(long)]
    short_break: Option<u32>,
    /// Long break length in minutes (1-60)
    #[arg(long)]
    long_break: Option<u32>,
    /// Focus sessions before a long break (1-10)
    #[arg(long)]
    interval: Option<u32>,
    /// Do not start breaks automatically
    #[arg(long)]
    no_auto_breaks: bool,
    /// Do not start focus sessions automatically after a break
    #[arg(long)]
    no_auto_pomodoros: bool,
    /// Disable the notification cue
    #[arg(long)]
    mute: bool,
}

impl SettingsArgs {
    fn draft(&self) -> SettingsDraft {
        SettingsDraft {
            focus_minutes: self.focus.map(|n| n.to_string()),
            short_break_minutes: self.short_break.map(|n| n.to_string()),
            long_break_minutes: self.long_break.map(|n| n.to_string()),
            long_break_interval: self.interval.map(|n| n.to_string()),
            auto_start_breaks: self.no_auto_breaks.then_some(false),
            auto_start_pomodoros: self.no_auto_pomodoros.then_some(false),
            sound_enabled: self.mute.then_some(false),
        }
    }

    /// Overrides are clamped to the form bounds; zero keeps the base value.
    fn resolve(&self, base: TimerSettings) -> TimerSettings {
        base.apply_draft(&self.draft())
    }
}

/// One line of interactive input.
#[derive(Debug, Clone, PartialEq)]
enum Input {
    Command(Command),
    ToggleSound,
    Help,
    Quit,
}

fn parse_input(line: &str) -> Option<Input> {
    let input = match line.trim() {
        "" | "p" | "space" => Input::Command(Command::Toggle),
        "r" => Input::Command(Command::Reset),
        "s" => Input::Command(Command::Skip),
        "f" => Input::Command(Command::SelectMode(TimerMode::Focus)),
        "b" => Input::Command(Command::SelectMode(TimerMode::ShortBreak)),
        "l" => Input::Command(Command::SelectMode(TimerMode::LongBreak)),
        "m" => Input::ToggleSound,
        "h" | "?" => Input::Help,
        "q" | "quit" => Input::Quit,
        _ => return None,
    };
    Some(input)
}

const HELP: &str = "commands: p=start/pause r=reset s=skip f/b/l=focus/short/long m=mute q=quit";

fn status_line(snap: &Snapshot) -> String {
    let state = if snap.is_active { "running" } else { "paused" };
    let sound = if snap.settings.sound_enabled { "" } else { " (muted)" };
    format!(
        "{:<11} {} {} {:>3.0}%  {}  {}{}",
        snap.mode.label(),
        format_clock(snap.remaining_seconds),
        progress_bar(snap.progress_pct / 100.0, BAR_WIDTH),
        snap.progress_pct,
        state,
        completed_label(snap.completed_focus_count),
        sound,
    )
}

fn render(snap: &Snapshot, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut out = std::io::stdout().lock();
    if json {
        writeln!(out, "{}", serde_json::to_string(&Event::StateSnapshot(snap.clone()))?)?;
    } else {
        writeln!(out, "{}", status_line(snap))?;
    }
    out.flush()?;
    Ok(())
}

async fn run_interactive(
    settings: TimerSettings,
    config: &Config,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (handle, task) = TimerRuntime::spawn(TimerEngine::new(settings), config.notifier());
    let mut snapshots = handle.watch();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if !json {
        eprintln!("{HELP}");
    }
    let initial = snapshots.borrow_and_update().clone();
    render(&initial, json)?;

    loop {
        tokio::select! {
            biased;
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snap = snapshots.borrow_and_update().clone();
                render(&snap, json)?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_input(&line) {
                    Some(Input::Command(command)) => {
                        handle.send(command).await?;
                    }
                    Some(Input::ToggleSound) => {
                        let enabled = handle.snapshot().settings.sound_enabled;
                        handle.set_sound_enabled(!enabled).await?;
                    }
                    Some(Input::Help) => {
                        eprintln!("{HELP}");
                        continue;
                    }
                    Some(Input::Quit) => break,
                    None => {
                        eprintln!("unknown command: {}  ({HELP})", line.trim());
                        continue;
                    }
                }
                // The runtime publishes before replying, so this is the
                // post-command state; marking it seen avoids a duplicate line.
                let snap = snapshots.borrow_and_update().clone();
                render(&snap, json)?;
            }
        }
    }

    handle.shutdown().await?;
    let engine = task.await?;
    if !json {
        println!("{}", completed_label(engine.completed_focus_count()));
    }
    Ok(())
}

#[derive(Serialize)]
struct SimulationReport {
    events: Vec<Event>,
    notifications: usize,
    snapshot: Snapshot,
}

fn simulate(
    settings: TimerSettings,
    mode: Option<TimerMode>,
    start: bool,
    ticks: u64,
    skips: u32,
) -> SimulationReport {
    let mut engine = TimerEngine::new(settings);
    let mut events = Vec::new();
    let mut notifications = 0;

    if let Some(mode) = mode {
        events.push(engine.select_mode(mode));
    }
    if start {
        events.push(engine.toggle());
    }
    for _ in 0..ticks {
        let transition = engine.tick();
        notifications += transition
            .effects
            .iter()
            .filter(|e| matches!(e, Effect::PlayNotification))
            .count();
        events.extend(transition.event);
    }
    for _ in 0..skips {
        events.push(engine.skip());
    }

    SimulationReport {
        events,
        notifications,
        snapshot: engine.snapshot(),
    }
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let base = config.timer_settings();

    match action {
        TimerAction::Run { settings, json } => {
            let settings = settings.resolve(base);
            debug!(?settings, "starting interactive timer");
            let rt = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .enable_all()
                .build()?;
            rt.block_on(run_interactive(settings, &config, json))?;
        }
        TimerAction::Simulate {
            ticks,
            skip,
            mode,
            paused,
            settings,
        } => {
            let report = simulate(settings.resolve(base), mode, !paused, ticks, skip);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        TimerAction::Status { settings } => {
            let engine = TimerEngine::new(settings.resolve(base));
            let snapshot = Event::StateSnapshot(engine.snapshot());
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_input_maps_keys() {
        assert_eq!(parse_input("p"), Some(Input::Command(Command::Toggle)));
        assert_eq!(parse_input(""), Some(Input::Command(Command::Toggle)));
        assert_eq!(parse_input(" s "), Some(Input::Command(Command::Skip)));
        assert_eq!(
            parse_input("l"),
            Some(Input::Command(Command::SelectMode(TimerMode::LongBreak)))
        );
        assert_eq!(parse_input("m"), Some(Input::ToggleSound));
        assert_eq!(parse_input("q"), Some(Input::Quit));
        assert_eq!(parse_input("zz"), None);
    }

    #[test]
    fn settings_args_clamp_and_fall_back() {
        let args = SettingsArgs {
            focus: Some(90),
            short_break: Some(0),
            no_auto_breaks: true,
            mute: true,
            ..SettingsArgs::default()
        };
        let resolved = args.resolve(TimerSettings::default());
        assert_eq!(resolved.focus_minutes, 60);
        assert_eq!(resolved.short_break_minutes, 5);
        assert!(!resolved.auto_start_breaks);
        assert!(resolved.auto_start_pomodoros);
        assert!(!resolved.sound_enabled);
    }

    #[test]
    fn simulate_reference_scenario() {
        let report = simulate(TimerSettings::default(), None, true, 1500, 0);
        assert_eq!(report.snapshot.mode, TimerMode::ShortBreak);
        assert_eq!(report.snapshot.remaining_seconds, 300);
        assert!(report.snapshot.is_active);
        assert_eq!(report.snapshot.completed_focus_count, 1);
        assert_eq!(report.notifications, 1);
        assert_eq!(report.events.len(), 2);
    }

    #[test]
    fn status_line_shows_clock_and_state() {
        let snap = TimerEngine::default().snapshot();
        let line = status_line(&snap);
        assert!(line.starts_with("Focus"));
        assert!(line.contains("25:00"));
        assert!(line.contains("paused"));
        assert!(line.contains("Completed: 0 pomodoros"));
    }
}
