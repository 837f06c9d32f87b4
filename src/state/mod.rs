pub mod blinds;
pub mod change;
pub mod clock;
pub mod phase;
pub mod reconcile;
mod sse;
pub mod stats;
pub mod tournament;
pub mod undo;

use std::sync::Arc;

use tokio::{
    sync::{Mutex, MutexGuard, RwLock, watch},
    task::{AbortHandle, JoinHandle},
};
use uuid::Uuid;

use crate::{config::AppConfig, dao::tournament_store::TournamentStore, error::ServiceError};

pub use self::sse::SseHub;
use self::{
    clock::ClockDriver,
    sse::SseState,
    tournament::{Roster, TournamentState},
    undo::UndoBuffer,
};

pub type SharedState = Arc<AppState>;

/// Everything one process knows about the running event.
pub struct Session {
    pub tournament: TournamentState,
    pub roster: Roster,
    pub clock: ClockDriver,
    pub undo: UndoBuffer,
}

impl Session {
    fn new(config: &AppConfig) -> Self {
        let tournament = TournamentState::fresh(Uuid::nil(), config.schedule().initial_duration());
        let clock = ClockDriver::new(&tournament, config.sync_interval());
        Self {
            tournament,
            roster: Roster::new(),
            clock,
            undo: UndoBuffer::new(),
        }
    }

    /// Adopt a freshly loaded row and roster, forgetting all local tracking.
    pub fn load(&mut self, tournament: TournamentState, roster: Roster) {
        self.clock.retrack(&tournament);
        self.tournament = tournament;
        self.roster = roster;
        self.undo.clear();
    }
}

/// Per-process controller: configuration, store handle, session state and background handles.
pub struct AppState {
    config: AppConfig,
    store: RwLock<Option<Arc<dyn TournamentStore>>>,
    sse: SseState,
    session: Mutex<Session>,
    undo_timer: Mutex<Option<AbortHandle>>,
    feed_task: Mutex<Option<JoinHandle<()>>>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let session = Session::new(&config);
        Arc::new(Self {
            config,
            store: RwLock::new(None),
            sse: SseState::new(64, 64),
            session: Mutex::new(session),
            undo_timer: Mutex::new(None),
            feed_task: Mutex::new(None),
            degraded: degraded_tx,
        })
    }

    /// Runtime configuration of this process.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn TournamentStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Store handle or [`ServiceError::Degraded`] when running without one.
    pub async fn require_store(&self) -> Result<Arc<dyn TournamentStore>, ServiceError> {
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn install_store(&self, store: Arc<dyn TournamentStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Lock the session. Never hold the guard across a store call.
    pub async fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().await
    }

    /// Clone the tournament row and roster for rendering.
    pub async fn snapshot(&self) -> (TournamentState, Roster) {
        let session = self.session.lock().await;
        (session.tournament.clone(), session.roster.clone())
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        self.sse.public()
    }

    /// Broadcast hub used for the display and operator SSE stream.
    pub fn display_sse(&self) -> &SseHub {
        self.sse.display()
    }

    /// Replace the undo expiry timer, aborting the previous one.
    pub async fn replace_undo_timer(&self, handle: Option<AbortHandle>) {
        let mut guard = self.undo_timer.lock().await;
        if let Some(previous) = guard.take() {
            previous.abort();
        }
        *guard = handle;
    }

    /// Replace the change feed task, aborting the previous one.
    pub async fn replace_feed_task(&self, handle: Option<JoinHandle<()>>) {
        let mut guard = self.feed_task.lock().await;
        if let Some(previous) = guard.take() {
            previous.abort();
        }
        *guard = handle;
    }
}
