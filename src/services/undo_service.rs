//! Expiry timers and firing for the single-slot undo buffer.

use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

use crate::{
    dto::operator::ActionResponse,
    error::ServiceError,
    services::{command_service, sse_events},
    state::{
        Session, SharedState,
        undo::{UndoAction, UndoTicket},
    },
};

/// Store `action` in the session's undo slot and start its expiry timer,
/// discarding the pending entry and cancelling its timer.
///
/// Runs with the session locked so timers are installed in push order.
pub async fn record(state: &SharedState, session: &mut Session, action: UndoAction) {
    let expires_at = Instant::now() + state.config().undo_window();
    let ticket = session.undo.push(action, expires_at);
    sse_events::broadcast_undo(state, session.undo.pending());
    arm(state, ticket, expires_at).await;
}

async fn arm(state: &SharedState, ticket: UndoTicket, expires_at: Instant) {
    let timer_state = state.clone();
    let handle = tokio::spawn(async move {
        sleep_until(expires_at).await;
        let mut session = timer_state.session().await;
        if session.undo.expire(ticket) {
            debug!(ticket, "undo window elapsed");
            sse_events::broadcast_undo(&timer_state, None);
        }
    });
    state.replace_undo_timer(Some(handle.abort_handle())).await;
}

/// Drop the pending entry and its timer.
pub async fn clear(state: &SharedState) {
    {
        let mut session = state.session().await;
        if session.undo.pending().is_some() {
            session.undo.clear();
            sse_events::broadcast_undo(state, None);
        }
    }
    state.replace_undo_timer(None).await;
}

/// Revert the pending action, if any.
pub async fn fire(state: &SharedState) -> Result<ActionResponse, ServiceError> {
    state.require_store().await?;

    let entry = {
        let mut session = state.session().await;
        let had_entry = session.undo.pending().is_some();
        let entry = session.undo.fire(Instant::now());
        if had_entry {
            sse_events::broadcast_undo(state, None);
        }
        entry
    };
    state.replace_undo_timer(None).await;

    let Some(entry) = entry else {
        return Ok(ActionResponse::new("nothing to undo"));
    };

    info!(
        kind = entry.action.kind(),
        player = entry.action.player_name(),
        "undoing operator action"
    );
    match entry.action {
        UndoAction::Eliminate { entry_id, .. } => {
            command_service::revert_elimination(state, entry_id).await
        }
        UndoAction::Rebuy { entry_id, .. } => command_service::revert_rebuy(state, entry_id).await,
        UndoAction::Remove { entry } => command_service::restore_entry(state, entry).await,
    }
}
