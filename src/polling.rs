//! Periodic fetch-and-merge for the active monitoring location.
//!
//! [`PollingController::spawn`] starts a single task that owns the cache and
//! processes commands, timer ticks and fetch completions one at a time. Each
//! fetch runs as a child task tagged with the generation it was issued under;
//! every location change or stop bumps the generation, so a result that
//! resolves after a newer selection is discarded rather than merged.
//!
//! State is published as immutable [`Snapshot`]s over a `watch` channel, so
//! every dashboard view reads the same cache and shares one polling cycle.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cache::{LocationCache, DEFAULT_CAPACITY};
use crate::models::Reading;
use crate::source::{DataSource, SourceError};

// ---

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_FETCH_LIMIT: u32 = 50;

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub interval: Duration,
    pub fetch_limit: u32,
    pub cache_capacity: usize,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            fetch_limit: DEFAULT_FETCH_LIMIT,
            cache_capacity: DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling { location: String },
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub state: PollState,
    pub cache: LocationCache,
    /// Completion time of the last fetch that was merged.
    pub last_merged_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn active_location(&self) -> Option<&str> {
        match &self.state {
            PollState::Idle => None,
            PollState::Polling { location } => Some(location.as_str()),
        }
    }

    /// Cached readings for the active location, newest-first.
    pub fn active_readings(&self) -> &[Reading] {
        self.active_location()
            .map_or(&[][..], |location| self.cache.get(location))
    }
}

/// Location names are compared trimmed and case-insensitively.
pub fn same_location(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[derive(Debug, Error)]
#[error("polling controller has shut down")]
pub struct ControllerClosed;

#[derive(Debug)]
enum Command {
    SetLocation(String),
    Stop,
    Shutdown,
}

/// Handle to the polling task. Dropping it cancels the timer and every
/// in-flight fetch.
pub struct PollingController {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<Snapshot>,
    task: Option<JoinHandle<()>>,
}

impl PollingController {
    // ---
    /// Spawn the polling task on the current tokio runtime, initially idle.
    pub fn spawn<S: DataSource>(source: Arc<S>, settings: PollSettings) -> Self {
        // ---
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (poller, snapshots) = Poller::new(source, settings);
        let task = tokio::spawn(poller.run(command_rx));

        Self {
            commands,
            snapshots,
            task: Some(task),
        }
    }

    /// Begin polling `location`. Same as [`set_location`](Self::set_location).
    pub fn start(&self, location: impl Into<String>) -> Result<(), ControllerClosed> {
        self.set_location(location)
    }

    /// Switch to `location`: cancel the running timer, fetch immediately and
    /// re-arm. A no-op when already polling the same location.
    pub fn set_location(&self, location: impl Into<String>) -> Result<(), ControllerClosed> {
        self.send(Command::SetLocation(location.into()))
    }

    /// Cancel polling. Cached data is kept.
    pub fn stop(&self) -> Result<(), ControllerClosed> {
        self.send(Command::Stop)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// Stop the task and wait for it to finish.
    pub async fn shutdown(mut self) {
        // ---
        let _ = self.commands.send(Command::Shutdown);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Polling task ended abnormally: {}", e);
            }
        }
    }

    fn send(&self, command: Command) -> Result<(), ControllerClosed> {
        self.commands.send(command).map_err(|_| ControllerClosed)
    }
}

impl Drop for PollingController {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ---

struct FetchOutcome {
    generation: u64,
    location: String,
    result: Result<Vec<Reading>, SourceError>,
}

struct Poller<S> {
    source: Arc<S>,
    settings: PollSettings,
    state: PollState,
    generation: u64,
    cache: LocationCache,
    last_merged_at: Option<DateTime<Utc>>,
    ticker: Option<Interval>,
    inflight: JoinSet<FetchOutcome>,
    snapshots: watch::Sender<Snapshot>,
}

impl<S: DataSource> Poller<S> {
    // ---
    fn new(source: Arc<S>, settings: PollSettings) -> (Self, watch::Receiver<Snapshot>) {
        // ---
        let capacity = settings.cache_capacity.max(settings.fetch_limit as usize);
        if capacity != settings.cache_capacity {
            warn!(
                "Cache capacity {} is below the fetch limit, using {}",
                settings.cache_capacity, capacity
            );
        }
        let cache = LocationCache::with_capacity(capacity);
        let (snapshots, rx) = watch::channel(Snapshot {
            state: PollState::Idle,
            cache: cache.clone(),
            last_merged_at: None,
        });

        let poller = Self {
            source,
            settings,
            state: PollState::Idle,
            generation: 0,
            cache,
            last_merged_at: None,
            ticker: None,
            inflight: JoinSet::new(),
            snapshots,
        };
        (poller, rx)
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        // ---
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::SetLocation(location)) => self.set_location(location),
                    Some(Command::Stop) => self.stop(),
                    Some(Command::Shutdown) | None => break,
                },
                _ = next_tick(&mut self.ticker) => self.issue_fetch(),
                Some(joined) = self.inflight.join_next(), if !self.inflight.is_empty() => match joined {
                    Ok(outcome) => self.complete(outcome),
                    Err(e) if e.is_cancelled() => {}
                    Err(e) => warn!("Fetch task failed: {}", e),
                },
            }
        }

        self.stop();
        debug!("Polling task finished");
    }

    fn set_location(&mut self, requested: String) {
        // ---
        let requested = requested.trim().to_string();
        if requested.is_empty() {
            warn!("Ignoring empty location selection");
            return;
        }

        if let PollState::Polling { location } = &self.state {
            if same_location(location, &requested) {
                debug!("Already polling '{}'", location);
                return;
            }
        }

        self.cancel();
        self.generation += 1;
        info!("Polling '{}' every {:?}", requested, self.settings.interval);

        self.state = PollState::Polling {
            location: requested,
        };
        self.publish();
        self.issue_fetch();

        let period = self.settings.interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);
    }

    fn stop(&mut self) {
        // ---
        if self.state == PollState::Idle {
            return;
        }
        self.cancel();
        self.generation += 1;
        self.state = PollState::Idle;
        info!("Polling stopped");
        self.publish();
    }

    fn cancel(&mut self) {
        self.ticker = None;
        self.inflight.abort_all();
    }

    fn issue_fetch(&mut self) {
        // ---
        let PollState::Polling { location } = &self.state else {
            return;
        };

        let source = Arc::clone(&self.source);
        let location = location.clone();
        let generation = self.generation;
        let limit = self.settings.fetch_limit;

        debug!("Fetching {} readings for '{}'", limit, location);
        self.inflight.spawn(async move {
            let result = source.fetch_readings(&location, limit).await;
            FetchOutcome {
                generation,
                location,
                result,
            }
        });
    }

    fn complete(&mut self, outcome: FetchOutcome) {
        // ---
        let active = match &self.state {
            PollState::Polling { location } if outcome.generation == self.generation => {
                location.clone()
            }
            _ => {
                debug!("Discarding stale fetch for '{}'", outcome.location);
                return;
            }
        };

        let batch = match outcome.result {
            Ok(batch) => batch,
            Err(e) => {
                warn!("Fetch for '{}' failed, keeping cached data: {}", active, e);
                return;
            }
        };

        // The store may resolve the name to a differently spelled canonical one.
        let canonical = batch
            .first()
            .and_then(|r| r.location.clone())
            .filter(|name| !same_location(name, &active));
        let key = canonical.as_deref().unwrap_or(&active);

        self.cache = self.cache.merge(key, &batch);
        self.last_merged_at = Some(Utc::now());
        debug!(
            "Merged {} fetched readings, {} cached for '{}'",
            batch.len(),
            self.cache.get(key).len(),
            key
        );
        self.publish();

        if let Some(name) = canonical {
            info!("Store reports '{}' for '{}', switching", name, active);
            self.set_location(name);
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(Snapshot {
            state: self.state.clone(),
            cache: self.cache.clone(),
            last_merged_at: self.last_merged_at,
        });
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
