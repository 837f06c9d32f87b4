use serde::Serialize;
use tracing::{info, warn};

use crate::{
    dto::{
        common::UndoSummary,
        sse::{ClockTickEvent, ErrorEvent, LiveEvent, ServerEvent, SystemStatus, UndoChangedEvent},
    },
    services::{display_service, public_service},
    state::{Session, SharedState, undo::UndoEntry},
};

pub(crate) const EVENT_HANDSHAKE: &str = "handshake";
pub(crate) const EVENT_LIVE: &str = "live";
pub(crate) const EVENT_STATE: &str = "state";
const EVENT_CLOCK_TICK: &str = "clock.tick";
const EVENT_UNDO: &str = "undo.changed";
const EVENT_ERROR: &str = "error";
const EVENT_SYSTEM_STATUS: &str = "system_status";

/// Push the public projection and the full display snapshot of `session`.
pub fn broadcast_session(state: &SharedState, session: &Session) {
    let live = LiveEvent(public_service::project(&session.tournament, &session.roster));
    send_public_event(state, EVENT_LIVE, &live);

    let snapshot = display_service::render(state.config(), state.is_degraded(), session);
    send_display_event(state, EVENT_STATE, &snapshot);
}

/// Lock the session and push its snapshot.
pub async fn broadcast_snapshot(state: &SharedState) {
    let session = state.session().await;
    broadcast_session(state, &session);
}

/// Push the countdown value after a local tick.
pub fn broadcast_tick(state: &SharedState, session: &Session) {
    let tournament = &session.tournament;
    let payload = ClockTickEvent {
        current_level: tournament.current_level,
        time_remaining: tournament.time_remaining,
        is_paused: tournament.is_paused,
    };
    send_display_event(state, EVENT_CLOCK_TICK, &payload);

    let live = LiveEvent(public_service::project(tournament, &session.roster));
    send_public_event(state, EVENT_LIVE, &live);
}

/// Announce the pending undo entry, or its disappearance.
pub fn broadcast_undo(state: &SharedState, entry: Option<&UndoEntry>) {
    let payload = UndoChangedEvent {
        undo: entry.map(UndoSummary::from),
    };
    send_display_event(state, EVENT_UNDO, &payload);
}

/// Report a failed store write to operator and display streams.
pub fn broadcast_error(state: &SharedState, message: impl Into<String>) {
    let payload = ErrorEvent {
        message: message.into(),
    };
    send_display_event(state, EVENT_ERROR, &payload);
}

/// Announce entering or leaving degraded mode on both streams.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    let payload = SystemStatus { degraded };
    send_public_event(state, EVENT_SYSTEM_STATUS, &payload);
    send_display_event(state, EVENT_SYSTEM_STATUS, &payload);
}

/// Relay degraded flag changes to SSE clients until the state is dropped.
pub async fn forward_degraded(state: SharedState) {
    let mut watcher = state.degraded_watcher();
    while watcher.changed().await.is_ok() {
        let degraded = *watcher.borrow_and_update();
        info!(degraded, "degraded mode changed");
        broadcast_system_status(&state, degraded);
    }
}

fn send_public_event<T>(state: &SharedState, event: &str, payload: &T)
where
    T: Serialize,
{
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}

fn send_display_event<T>(state: &SharedState, event: &str, payload: &T)
where
    T: Serialize,
{
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.display_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize display SSE payload"),
    }
}
