//! Initial load and the per-process change feed loop.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        storage::StorageResult,
        tournament_store::{ChangeFeed, TournamentStore},
    },
    error::ServiceError,
    services::{sse_events, undo_service},
    state::{
        SharedState,
        change::ChangeEvent,
        reconcile::{self, ChangeKind},
        tournament::{PlayerEntry, Roster, TournamentState},
    },
};

/// Load (or create) the session from `store`, install the store and follow its change feed.
///
/// Called on first connection and after every reconnect, so a full fetch heals
/// whatever was missed while disconnected.
pub async fn attach(state: &SharedState, store: Arc<dyn TournamentStore>) -> Result<(), ServiceError> {
    let tournament = load_or_create(state, store.as_ref()).await?;
    let feed = store.subscribe(tournament.id).await?;
    let roster: Roster = store
        .list_players(tournament.id)
        .await?
        .into_iter()
        .map(PlayerEntry::from)
        .collect();

    info!(
        state_id = %tournament.id,
        level = tournament.current_level,
        players = roster.len(),
        "session loaded"
    );
    {
        let mut session = state.session().await;
        session.load(tournament, roster);
    }
    undo_service::clear(state).await;
    state.install_store(store).await;

    let handle = tokio::spawn(follow(state.clone(), feed));
    state.replace_feed_task(Some(handle)).await;
    sse_events::broadcast_snapshot(state).await;
    Ok(())
}

/// Stop following the feed and drop the store.
pub async fn detach(state: &SharedState) {
    state.replace_feed_task(None).await;
    state.clear_store().await;
}

async fn load_or_create(
    state: &SharedState,
    store: &dyn TournamentStore,
) -> StorageResult<TournamentState> {
    if let Some(row) = store.read_current().await? {
        return Ok(row.into());
    }

    let fresh = TournamentState::fresh(Uuid::new_v4(), state.config().schedule().initial_duration());
    info!(state_id = %fresh.id, "no session found; creating one");
    store.create_state(fresh.clone().into()).await?;
    Ok(fresh)
}

async fn follow(state: SharedState, mut feed: ChangeFeed) {
    while let Some(change) = feed.next().await {
        apply(&state, change.into()).await;
    }
    warn!("change feed ended");
}

/// Route one notification through the reconciler.
pub async fn apply(state: &SharedState, event: ChangeEvent) {
    match event {
        ChangeEvent::Roster(entries) => {
            let mut session = state.session().await;
            session.roster.replace_all(entries);
            debug!(players = session.roster.len(), "roster replaced");
            sse_events::broadcast_session(state, &session);
        }
        ChangeEvent::State(change) => {
            let authority = state.config().clock_authority();
            let (outcome, state_id) = {
                let mut session = state.session().await;
                let session = &mut *session;
                let outcome = reconcile::reconcile(
                    &mut session.tournament,
                    &mut session.clock,
                    &change,
                    state.config().schedule(),
                    authority,
                );
                sse_events::broadcast_session(state, session);
                (outcome, session.tournament.id)
            };

            match outcome.kind {
                ChangeKind::Merge => debug!("state change merged"),
                ChangeKind::Reset => {
                    info!("remote reset observed");
                    undo_service::clear(state).await;
                }
                kind => info!(?kind, "remote clock change applied"),
            }

            let Some(push) = outcome.push else {
                return;
            };
            let Some(store) = state.store().await else {
                return;
            };
            if let Err(err) = store.write_partial(state_id, push).await {
                warn!(error = %err, "pause snapshot write failed");
            }
        }
    }
}
