use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn};

use crate::diff::snapshot_events;
use crate::snapshot::{Snapshot, SnapshotKind};
use crate::transport::Transport;
use crate::types::Event;
use crate::{Error, Result};

pub(crate) type EventCallback = Box<dyn Fn(&Event) + Send + Sync>;
pub(crate) type SnapshotCallback = Box<dyn Fn(&Snapshot) + Send + Sync>;

#[derive(Default)]
pub(crate) struct Listeners {
    pub events: Vec<EventCallback>,
    pub snapshots: Vec<SnapshotCallback>,
}

impl Listeners {
    fn emit(&self, events: &[Event], snapshot: Option<&Snapshot>) {
        for event in events {
            for cb in &self.events {
                cb(event);
            }
        }
        if let Some(snapshot) = snapshot {
            for cb in &self.snapshots {
                cb(snapshot);
            }
        }
    }
}

/// What readers of a coordinator see. Replaced as a whole after every
/// refresh, so the snapshot and its flags are always consistent.
#[derive(Debug, Clone, Default)]
pub struct CoordinatorState {
    snapshot: Option<Arc<Snapshot>>,
    last_update_success: bool,
    last_error: Option<Error>,
    refreshes: u64,
}

impl CoordinatorState {
    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        self.snapshot.as_ref()
    }

    pub fn last_update_success(&self) -> bool {
        self.last_update_success
    }

    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// Number of completed refreshes, successful or not.
    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }

    fn outcome(&self) -> Result<Arc<Snapshot>> {
        match (&self.last_error, &self.snapshot) {
            (Some(e), _) => Err(e.clone()),
            (None, Some(snapshot)) => Ok(Arc::clone(snapshot)),
            (None, None) => Err(Error::NotConnected),
        }
    }
}

/// Keeps one snapshot class fresh. Concurrent refreshes share a single
/// request; failures are recorded, never thrown at the poll loop.
///
/// Every task the coordinator spawns is tracked and stops on [`shutdown`].
///
/// [`shutdown`]: Coordinator::shutdown
pub struct Coordinator {
    kind: SnapshotKind,
    interval: Duration,
    transport: Arc<Transport>,
    state: watch::Sender<CoordinatorState>,
    in_flight: Mutex<()>,
    /// Fetches started so far; bumped under `in_flight`.
    started: AtomicU64,
    listeners: OnceLock<Arc<Listeners>>,
    cancel: CancellationToken,
    tasks: TaskTracker,
}

impl Coordinator {
    pub fn new(kind: SnapshotKind, interval: Duration, transport: Arc<Transport>) -> Self {
        let (state, _) = watch::channel(CoordinatorState::default());
        Self {
            kind,
            interval,
            transport,
            state,
            in_flight: Mutex::new(()),
            started: AtomicU64::new(0),
            listeners: OnceLock::new(),
            cancel: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    pub fn kind(&self) -> SnapshotKind {
        self.kind
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.state.borrow().snapshot.clone()
    }

    pub fn last_update_success(&self) -> bool {
        self.state.borrow().last_update_success
    }

    pub fn last_error(&self) -> Option<Error> {
        self.state.borrow().last_error.clone()
    }

    pub fn state(&self) -> CoordinatorState {
        self.state.borrow().clone()
    }

    /// Notified after every completed refresh.
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorState> {
        self.state.subscribe()
    }

    /// Fetch and replace the snapshot. A call made while another refresh is
    /// in flight waits for it and returns its outcome instead of fetching.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>> {
        let seen = self.state.borrow().refreshes;
        let _guard = self.in_flight.lock().await;
        {
            let state = self.state.borrow();
            if state.refreshes != seen {
                trace!(kind = %self.kind, "joined in-flight refresh");
                return state.outcome();
            }
        }

        self.fetch_locked().await
    }

    /// Start a refresh in the background and return immediately.
    ///
    /// Only a fetch that starts after this call can satisfy it, so state
    /// changed just before the call is always picked up.
    pub fn request_refresh(self: &Arc<Self>) -> JoinHandle<()> {
        let requested = self.started.load(Ordering::SeqCst);
        let this = Arc::clone(self);
        self.tasks.spawn(async move {
            tokio::select! {
                biased;
                _ = this.cancel.cancelled() => {}
                _ = this.refresh_since(requested) => {}
            }
        })
    }

    /// Cancel polling and pending refreshes without waiting for them.
    pub fn stop(&self) {
        self.cancel.cancel();
        self.tasks.close();
    }

    /// Cancel every task this coordinator spawned and wait for them to end.
    /// No listener fires once this returns.
    pub async fn shutdown(&self) {
        self.stop();
        self.tasks.wait().await;
        trace!(kind = %self.kind, "coordinator shut down");
    }

    async fn refresh_since(&self, requested: u64) -> Result<Arc<Snapshot>> {
        let _guard = self.in_flight.lock().await;
        if self.started.load(Ordering::SeqCst) != requested {
            trace!(kind = %self.kind, "fresh fetch already completed");
            return self.state.borrow().outcome();
        }
        self.fetch_locked().await
    }

    /// Caller must hold `in_flight`.
    async fn fetch_locked(&self) -> Result<Arc<Snapshot>> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let result = self.fetch_snapshot().await;
        self.settle(result)
    }

    pub(crate) fn attach(&self, listeners: Arc<Listeners>) {
        if self.listeners.set(listeners).is_err() {
            debug!(kind = %self.kind, "listeners already attached");
            return;
        }
        if let Some(snapshot) = self.snapshot() {
            self.emit(&snapshot_events(None, &snapshot), Some(&*snapshot));
        }
    }

    pub(crate) fn spawn_polling(self: &Arc<Self>) {
        self.tasks
            .spawn(poll_task(Arc::clone(self), self.cancel.clone()));
    }

    async fn fetch_snapshot(&self) -> Result<Snapshot> {
        let body = self.transport.fetch(self.kind.endpoint()).await?;
        Snapshot::from_json(self.kind, &body)
    }

    fn settle(&self, result: Result<Snapshot>) -> Result<Arc<Snapshot>> {
        let kind = self.kind;
        match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                let mut previous = None;
                let mut recovered = false;
                self.state.send_modify(|state| {
                    previous = state.snapshot.replace(Arc::clone(&snapshot));
                    recovered = state.refreshes > 0 && !state.last_update_success;
                    state.last_update_success = true;
                    state.last_error = None;
                    state.refreshes += 1;
                });

                let mut events = snapshot_events(previous.as_deref(), &snapshot);
                if recovered {
                    info!(%kind, "refresh recovered");
                    events.push(Event::RefreshRecovered { kind });
                }
                debug!(%kind, keys = snapshot.len(), changes = events.len(), "snapshot updated");
                self.emit(&events, Some(&*snapshot));
                Ok(snapshot)
            }
            Err(error) => {
                let mut was_healthy = false;
                self.state.send_modify(|state| {
                    was_healthy = state.refreshes == 0 || state.last_update_success;
                    state.last_update_success = false;
                    state.last_error = Some(error.clone());
                    state.refreshes += 1;
                });

                if was_healthy {
                    warn!(%kind, error = %error, "refresh failed, keeping previous snapshot");
                    self.emit(
                        &[Event::RefreshFailed {
                            kind,
                            error: error.clone(),
                        }],
                        None,
                    );
                } else {
                    debug!(%kind, error = %error, "refresh still failing");
                }
                Err(error)
            }
        }
    }

    fn emit(&self, events: &[Event], snapshot: Option<&Snapshot>) {
        if let Some(listeners) = self.listeners.get() {
            listeners.emit(events, snapshot);
        }
    }
}

async fn poll_task(coordinator: Arc<Coordinator>, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(coordinator.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // the first tick is immediate; open() already refreshed

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = coordinator.refresh() => {}
                }
            }
        }
    }
    trace!(kind = %coordinator.kind, "poll task stopped");
}
