//! Async driver for [`TimerEngine`].
//!
//! One task owns the engine and is its only mutator. Front ends send
//! commands through a [`RuntimeHandle`] and watch [`Snapshot`]s.
//!
//! While the session is active a ticker task feeds one tick per period into
//! the owner. The ticker is aborted whenever the session goes inactive, and
//! every ticker is stamped with a generation: a tick that was already queued
//! when its ticker was cancelled carries a stale generation and is dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace};

use crate::error::{CoreError, Result};
use crate::events::{Event, Snapshot};
use crate::notify::{play_best_effort, Notifier};
use crate::timer::{Effect, TimerEngine, TimerMode, TimerSettings};

const COMMAND_BUFFER: usize = 32;
const TICK_BUFFER: usize = 4;
const EVENT_BUFFER: usize = 64;

/// Operations a front end can request.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Toggle,
    Reset,
    Skip,
    SelectMode(TimerMode),
    /// Settings must already be validated by the caller.
    SaveSettings(TimerSettings),
    SetSoundEnabled(bool),
}

enum Request {
    Apply {
        command: Command,
        reply: oneshot::Sender<Event>,
    },
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tick {
    generation: u64,
}

struct Ticker {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Cloneable handle to a running [`TimerRuntime`].
#[derive(Clone)]
pub struct RuntimeHandle {
    requests: mpsc::Sender<Request>,
    snapshots: watch::Receiver<Snapshot>,
    events: broadcast::Sender<Event>,
}

impl RuntimeHandle {
    pub async fn send(&self, command: Command) -> Result<Event> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request::Apply { command, reply })
            .await
            .map_err(|_| CoreError::Runtime("timer runtime has stopped".into()))?;
        response
            .await
            .map_err(|_| CoreError::Runtime("timer runtime dropped the request".into()))
    }

    pub async fn toggle(&self) -> Result<Event> {
        self.send(Command::Toggle).await
    }

    pub async fn reset(&self) -> Result<Event> {
        self.send(Command::Reset).await
    }

    pub async fn skip(&self) -> Result<Event> {
        self.send(Command::Skip).await
    }

    pub async fn select_mode(&self, mode: TimerMode) -> Result<Event> {
        self.send(Command::SelectMode(mode)).await
    }

    pub async fn save_settings(&self, settings: TimerSettings) -> Result<Event> {
        self.send(Command::SaveSettings(settings)).await
    }

    pub async fn set_sound_enabled(&self, enabled: bool) -> Result<Event> {
        self.send(Command::SetSoundEnabled(enabled)).await
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// Stream of every event the engine reports, including zero-crossings.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Ask the runtime to stop. Returns once the request is queued.
    pub async fn shutdown(&self) -> Result<()> {
        self.requests
            .send(Request::Shutdown)
            .await
            .map_err(|_| CoreError::Runtime("timer runtime has stopped".into()))
    }
}

/// Owner task state.
pub struct TimerRuntime {
    engine: TimerEngine,
    notifier: Arc<dyn Notifier>,
    tick_period: Duration,
    requests: mpsc::Receiver<Request>,
    ticks_tx: mpsc::Sender<Tick>,
    ticks_rx: mpsc::Receiver<Tick>,
    ticker: Option<Ticker>,
    generation: u64,
    snapshots: watch::Sender<Snapshot>,
    events: broadcast::Sender<Event>,
}

impl TimerRuntime {
    /// Build a runtime with a one-second tick.
    pub fn new(engine: TimerEngine, notifier: Arc<dyn Notifier>) -> (Self, RuntimeHandle) {
        Self::with_tick_period(engine, notifier, Duration::from_secs(1))
    }

    pub fn with_tick_period(
        engine: TimerEngine,
        notifier: Arc<dyn Notifier>,
        tick_period: Duration,
    ) -> (Self, RuntimeHandle) {
        let (requests_tx, requests) = mpsc::channel(COMMAND_BUFFER);
        let (ticks_tx, ticks_rx) = mpsc::channel(TICK_BUFFER);
        let (snapshots, snapshots_rx) = watch::channel(engine.snapshot());
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        let handle = RuntimeHandle {
            requests: requests_tx,
            snapshots: snapshots_rx,
            events: events.clone(),
        };
        let runtime = Self {
            engine,
            notifier,
            tick_period,
            requests,
            ticks_tx,
            ticks_rx,
            ticker: None,
            generation: 0,
            snapshots,
            events,
        };
        (runtime, handle)
    }

    /// Spawn the owner task on the current tokio runtime.
    ///
    /// The join handle yields the final engine after shutdown or once every
    /// [`RuntimeHandle`] is dropped.
    pub fn spawn(
        engine: TimerEngine,
        notifier: Arc<dyn Notifier>,
    ) -> (RuntimeHandle, JoinHandle<TimerEngine>) {
        let (runtime, handle) = Self::new(engine, notifier);
        (handle, tokio::spawn(runtime.run()))
    }

    pub async fn run(mut self) -> TimerEngine {
        // The engine may arrive already active.
        self.sync_ticker();
        loop {
            tokio::select! {
                request = self.requests.recv() => match request {
                    Some(Request::Apply { command, reply }) => {
                        let event = self.apply(command);
                        let _ = reply.send(event);
                    }
                    Some(Request::Shutdown) | None => break,
                },
                Some(tick) = self.ticks_rx.recv() => self.on_tick(tick),
            }
        }
        self.stop_ticker();
        debug!("timer runtime stopped");
        self.engine
    }

    fn apply(&mut self, command: Command) -> Event {
        trace!(?command, "applying command");
        let event = match command {
            Command::Toggle => self.engine.toggle(),
            Command::Reset => self.engine.reset(),
            Command::Skip => self.engine.skip(),
            Command::SelectMode(mode) => self.engine.select_mode(mode),
            Command::SaveSettings(settings) => self.engine.save_settings(settings),
            Command::SetSoundEnabled(enabled) => self.engine.set_sound_enabled(enabled),
        };
        self.sync_ticker();
        self.publish(Some(&event));
        event
    }

    fn on_tick(&mut self, tick: Tick) {
        let live = self.ticker.as_ref().map(|t| t.generation);
        if live != Some(tick.generation) {
            debug!(stale = tick.generation, ?live, "dropping stale tick");
            return;
        }
        if !self.engine.is_active() {
            return;
        }

        let transition = self.engine.tick();
        for effect in &transition.effects {
            match effect {
                Effect::PlayNotification => {
                    // Notifiers may block (bell flush, file open); keep them off the owner task.
                    let notifier = Arc::clone(&self.notifier);
                    tokio::task::spawn_blocking(move || play_best_effort(notifier.as_ref()));
                }
            }
        }
        self.sync_ticker();
        self.publish(transition.event.as_ref());
    }

    /// Keep exactly one ticker alive while active and none while paused.
    fn sync_ticker(&mut self) {
        match (self.engine.is_active(), self.ticker.is_some()) {
            (true, false) => self.start_ticker(),
            (false, true) => self.stop_ticker(),
            _ => {}
        }
    }

    fn start_ticker(&mut self) {
        self.generation += 1;
        let generation = self.generation;
        let period = self.tick_period;
        let tx = self.ticks_tx.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(Tick { generation }).await.is_err() {
                    break;
                }
            }
        });
        debug!(generation, "ticker started");
        self.ticker = Some(Ticker { generation, handle });
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.handle.abort();
            self.generation += 1;
            debug!(generation = ticker.generation, "ticker stopped");
        }
    }

    fn publish(&self, event: Option<&Event>) {
        if let Some(event) = event {
            // No subscribers is fine.
            let _ = self.events.send(event.clone());
        }
        self.snapshots.send_replace(self.engine.snapshot());
    }
}
