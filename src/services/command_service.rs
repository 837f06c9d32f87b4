//! Operator commands: optimistic local update first, then the partial writes.
//!
//! A failed write is reported to the caller and to display streams; the local
//! change is kept and the next notification heals any divergence.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{PlayerEntryEntity, PlayerPatch, PlayerStatusEntity, StatePatch},
        storage::StorageError,
        tournament_store::TournamentStore,
    },
    dto::operator::{ActionResponse, PlayerCreatedResponse, TournamentInfoRequest},
    error::ServiceError,
    services::{sse_events, undo_service},
    state::{
        Session, SharedState,
        blinds::{BlindLevel, BlindSchedule},
        phase::{self, PhaseTrigger, PhaseUpdate},
        tournament::{PlayerEntry, PlayerStatus},
        undo::UndoAction,
    },
};

/// One store call issued by a command, in order.
enum Write {
    State(StatePatch),
    Player(Uuid, PlayerPatch),
    Insert(PlayerEntryEntity),
    Delete(Uuid),
    DeleteRoster,
}

/// Start or resume the clock.
pub async fn play(state: &SharedState) -> Result<ActionResponse, ServiceError> {
    set_paused(state, false, "play").await?;
    Ok(ActionResponse::new("clock running"))
}

/// Stop the clock.
pub async fn pause(state: &SharedState) -> Result<ActionResponse, ServiceError> {
    set_paused(state, true, "pause").await?;
    Ok(ActionResponse::new("clock paused"))
}

async fn set_paused(
    state: &SharedState,
    paused: bool,
    operation: &'static str,
) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    let authority = state.config().clock_authority();

    let patch = {
        let mut session = state.session().await;
        session.tournament.is_paused = paused;
        if authority {
            session.clock.note_paused(paused);
        }
        sse_events::broadcast_session(state, &session);

        StatePatch {
            is_paused: Some(paused),
            time_remaining: authority.then_some(session.tournament.time_remaining),
            ..StatePatch::default()
        }
    };

    info!(paused, "clock toggled by operator");
    commit(state, &store, operation, vec![Write::State(patch)]).await
}

/// Jump to the next schedule entry at its full duration and run the clock.
pub async fn next_level(state: &SharedState) -> Result<ActionResponse, ServiceError> {
    jump(state, "next_level", BlindSchedule::next).await
}

/// Jump to the previous schedule entry at its full duration and run the clock.
pub async fn prev_level(state: &SharedState) -> Result<ActionResponse, ServiceError> {
    jump(state, "prev_level", BlindSchedule::previous).await
}

async fn jump(
    state: &SharedState,
    operation: &'static str,
    pick: for<'a> fn(&'a BlindSchedule, usize) -> Option<&'a BlindLevel>,
) -> Result<ActionResponse, ServiceError> {
    let store = state.require_store().await?;
    let authority = state.config().clock_authority();

    let patch = {
        let mut session = state.session().await;
        let Some(target) = pick(state.config().schedule(), session.tournament.current_level)
        else {
            return Ok(ActionResponse::new("no adjacent level"));
        };

        let tournament = &mut session.tournament;
        tournament.current_level = target.index;
        tournament.time_remaining = target.duration_sec;
        tournament.is_paused = false;
        session.clock.note_level(target.index);
        if authority {
            session.clock.note_paused(false);
        }
        sse_events::broadcast_session(state, &session);

        info!(level = target.index, label = %target.label(), "level changed by operator");
        StatePatch {
            current_level: Some(target.index),
            time_remaining: Some(target.duration_sec),
            is_paused: Some(false),
            ..StatePatch::default()
        }
    };

    commit(state, &store, operation, vec![Write::State(patch)]).await?;
    Ok(ActionResponse::new("level changed"))
}

/// Register a player; the entry id is minted locally.
pub async fn add_player(
    state: &SharedState,
    player_id: String,
    name: String,
) -> Result<PlayerCreatedResponse, ServiceError> {
    let store = state.require_store().await?;
    let name = name.trim().to_string();

    let (id, row) = {
        let mut session = state.session().await;
        let entry = PlayerEntry::registered(player_id, name);
        let row = entry.to_entity(session.tournament.id);
        let id = entry.id;
        info!(entry_id = %id, name = %entry.name, "player registered");
        session.roster.insert(entry);
        sse_events::broadcast_session(state, &session);
        (id, row)
    };

    commit(state, &store, "add_player", vec![Write::Insert(row)]).await?;
    Ok(PlayerCreatedResponse { id })
}

/// Delete an entry; reversible for the undo window.
pub async fn remove_player(state: &SharedState, id: Uuid) -> Result<ActionResponse, ServiceError> {
    let store = state.require_store().await?;
    let authority = state.config().clock_authority();

    let writes = {
        let mut session = state.session().await;
        let underway = PhaseTrigger::Remove.applies_to(&session.roster);
        let Some(entry) = session.roster.remove(&id) else {
            return Ok(unknown_entry(id));
        };

        let mut writes = vec![Write::Delete(id)];
        if underway {
            recompute_phase(&mut session, authority, &mut writes);
        }
        info!(entry_id = %id, name = %entry.name, "player removed");
        undo_service::record(state, &mut session, UndoAction::Remove { entry }).await;
        sse_events::broadcast_session(state, &session);
        writes
    };

    commit(state, &store, "remove_player", writes).await?;
    Ok(ActionResponse::new("player removed"))
}

/// Put a removed entry back with every original field.
pub async fn restore_entry(
    state: &SharedState,
    entry: PlayerEntry,
) -> Result<ActionResponse, ServiceError> {
    let store = state.require_store().await?;
    let authority = state.config().clock_authority();

    let writes = {
        let mut session = state.session().await;
        if session.roster.get(&entry.id).is_some() {
            return Ok(ActionResponse::new("entry already present"));
        }

        let mut writes = vec![Write::Insert(entry.to_entity(session.tournament.id))];
        info!(entry_id = %entry.id, name = %entry.name, "player restored");
        session.roster.insert(entry);
        if PhaseTrigger::Restore.applies_to(&session.roster) {
            recompute_phase(&mut session, authority, &mut writes);
        }
        sse_events::broadcast_session(state, &session);
        writes
    };

    commit(state, &store, "restore_entry", writes).await?;
    Ok(ActionResponse::new("player restored"))
}

/// Knock a player out at `position`, or at the next free position when absent.
pub async fn eliminate_player(
    state: &SharedState,
    id: Uuid,
    position: Option<u32>,
) -> Result<ActionResponse, ServiceError> {
    let store = state.require_store().await?;
    let authority = state.config().clock_authority();

    let (writes, position) = {
        let mut session = state.session().await;
        let Some(entry) = session.roster.get(&id) else {
            return Ok(unknown_entry(id));
        };
        if !entry.is_active() {
            return Ok(ActionResponse::new("player already eliminated"));
        }
        let name = entry.name.clone();

        let position = match position {
            Some(position) => {
                check_position(&session, id, position)?;
                position
            }
            None => session.roster.next_elimination_position(),
        };

        if let Some(entry) = session.roster.get_mut(&id) {
            entry.status = PlayerStatus::Eliminated;
            entry.position = Some(position);
        }
        let mut writes = vec![Write::Player(
            id,
            PlayerPatch {
                status: Some(PlayerStatusEntity::Eliminated),
                position: Some(Some(position)),
                has_rebuy: None,
            },
        )];
        recompute_phase(&mut session, authority, &mut writes);

        info!(entry_id = %id, name = %name, position, "player eliminated");
        undo_service::record(
            state,
            &mut session,
            UndoAction::Eliminate { entry_id: id, name },
        )
        .await;
        sse_events::broadcast_session(state, &session);
        (writes, position)
    };

    commit(state, &store, "eliminate_player", writes).await?;
    Ok(ActionResponse::new(format!("player eliminated in position {position}")))
}

fn check_position(session: &Session, id: Uuid, position: u32) -> Result<(), ServiceError> {
    let registered = u32::try_from(session.roster.len()).unwrap_or(u32::MAX);
    if position == 0 || position > registered {
        return Err(ServiceError::InvalidInput(format!(
            "position {position} is outside 1..={registered}"
        )));
    }
    let taken = session
        .roster
        .iter()
        .any(|entry| entry.id != id && entry.position == Some(position));
    if taken {
        return Err(ServiceError::InvalidInput(format!(
            "position {position} is already assigned"
        )));
    }
    Ok(())
}

/// Put an eliminated player back in play.
pub async fn revert_elimination(
    state: &SharedState,
    id: Uuid,
) -> Result<ActionResponse, ServiceError> {
    let store = state.require_store().await?;
    let authority = state.config().clock_authority();

    let writes = {
        let mut session = state.session().await;
        let Some(entry) = session.roster.get_mut(&id) else {
            return Ok(unknown_entry(id));
        };
        if entry.is_active() {
            return Ok(ActionResponse::new("player is not eliminated"));
        }
        entry.status = PlayerStatus::Active;
        entry.position = None;
        info!(entry_id = %id, name = %entry.name, "elimination reverted");

        let mut writes = vec![Write::Player(
            id,
            PlayerPatch {
                status: Some(PlayerStatusEntity::Active),
                position: Some(None),
                has_rebuy: None,
            },
        )];
        recompute_phase(&mut session, authority, &mut writes);
        sse_events::broadcast_session(state, &session);
        writes
    };

    commit(state, &store, "revert_elimination", writes).await?;
    Ok(ActionResponse::new("elimination reverted"))
}

/// Mark a rebuy; reversible for the undo window.
pub async fn add_rebuy(state: &SharedState, id: Uuid) -> Result<ActionResponse, ServiceError> {
    let store = state.require_store().await?;

    {
        let mut session = state.session().await;
        let Some(entry) = session.roster.get_mut(&id) else {
            return Ok(unknown_entry(id));
        };
        if entry.has_rebuy {
            return Ok(ActionResponse::new("rebuy already recorded"));
        }
        entry.has_rebuy = true;
        let name = entry.name.clone();
        info!(entry_id = %id, name = %name, "rebuy recorded");

        undo_service::record(state, &mut session, UndoAction::Rebuy { entry_id: id, name }).await;
        sse_events::broadcast_session(state, &session);
    }

    commit(state, &store, "add_rebuy", vec![rebuy_write(id, true)]).await?;
    Ok(ActionResponse::new("rebuy recorded"))
}

/// Remove a rebuy mark.
pub async fn revert_rebuy(state: &SharedState, id: Uuid) -> Result<ActionResponse, ServiceError> {
    let store = state.require_store().await?;

    {
        let mut session = state.session().await;
        let Some(entry) = session.roster.get_mut(&id) else {
            return Ok(unknown_entry(id));
        };
        if !entry.has_rebuy {
            return Ok(ActionResponse::new("no rebuy to revert"));
        }
        entry.has_rebuy = false;
        info!(entry_id = %id, name = %entry.name, "rebuy reverted");
        sse_events::broadcast_session(state, &session);
    }

    commit(state, &store, "revert_rebuy", vec![rebuy_write(id, false)]).await?;
    Ok(ActionResponse::new("rebuy reverted"))
}

fn rebuy_write(id: Uuid, has_rebuy: bool) -> Write {
    Write::Player(
        id,
        PlayerPatch {
            has_rebuy: Some(has_rebuy),
            ..PlayerPatch::default()
        },
    )
}

/// Delete the roster and restore the default row, keeping the buy-in.
pub async fn reset_tournament(state: &SharedState) -> Result<ActionResponse, ServiceError> {
    let store = state.require_store().await?;
    let initial = state.config().schedule().initial_duration();

    let patch = {
        let mut session = state.session().await;
        session.tournament.reset(initial);
        session.roster.clear();
        let Session {
            tournament, clock, ..
        } = &mut *session;
        clock.retrack(tournament);
        session.undo.clear();
        sse_events::broadcast_undo(state, None);
        sse_events::broadcast_session(state, &session);
        session.tournament.reset_patch()
    };
    state.replace_undo_timer(None).await;
    info!(generation = ?patch.reset_generation, "tournament reset");

    commit(
        state,
        &store,
        "reset_tournament",
        vec![Write::DeleteRoster, Write::State(patch)],
    )
    .await?;
    Ok(ActionResponse::new("tournament reset"))
}

/// Update the event metadata shown on screens; an empty request is a no-op.
pub async fn set_tournament_info(
    state: &SharedState,
    info: TournamentInfoRequest,
) -> Result<ActionResponse, ServiceError> {
    if info.is_empty() {
        return Ok(ActionResponse::new("nothing to update"));
    }
    let store = state.require_store().await?;

    {
        let mut session = state.session().await;
        let tournament = &mut session.tournament;
        if let Some(event_id) = &info.event_id {
            tournament.event_id = event_id.clone();
        }
        if let Some(name) = &info.tournament_name {
            tournament.tournament_name = name.clone();
        }
        if let Some(name) = &info.season_name {
            tournament.season_name = name.clone();
        }
        if let Some(number) = info.event_number {
            tournament.event_number = number;
        }
        if let Some(total) = info.total_events {
            tournament.total_events = total;
        }
        sse_events::broadcast_session(state, &session);
    }

    let patch = StatePatch {
        event_id: info.event_id,
        tournament_name: info.tournament_name,
        season_name: info.season_name,
        event_number: info.event_number,
        total_events: info.total_events,
        ..StatePatch::default()
    };
    commit(state, &store, "set_tournament_info", vec![Write::State(patch)]).await?;
    Ok(ActionResponse::new("tournament info updated"))
}

/// Change the buy-in used for the prize pool.
pub async fn set_buy_in(state: &SharedState, amount: u64) -> Result<ActionResponse, ServiceError> {
    let store = state.require_store().await?;

    {
        let mut session = state.session().await;
        session.tournament.buy_in_amount = amount;
        sse_events::broadcast_session(state, &session);
    }
    info!(amount, "buy-in changed");

    let patch = StatePatch {
        buy_in_amount: Some(amount),
        ..StatePatch::default()
    };
    commit(state, &store, "set_buy_in", vec![Write::State(patch)]).await?;
    Ok(ActionResponse::new("buy-in updated"))
}

/// Re-evaluate the phase and queue the single write carrying it.
///
/// Entering champion captures the winner, forces position 1 and pauses the
/// clock. Leaving champion clears the winner columns and the forced position.
fn recompute_phase(session: &mut Session, authority: bool, writes: &mut Vec<Write>) {
    let outcome = phase::evaluate(&session.roster);
    let Some(update) = PhaseUpdate::between(&session.tournament, outcome) else {
        return;
    };
    update.apply(&mut session.tournament);
    let mut patch = update.patch();

    if let Some(champion) = &update.champion {
        if let Some(entry) = session.roster.get_mut(&champion.entry_id) {
            entry.position = Some(1);
        }
        writes.push(Write::Player(
            champion.entry_id,
            PlayerPatch {
                position: Some(Some(1)),
                ..PlayerPatch::default()
            },
        ));
        if authority {
            session.clock.note_paused(true);
            patch.time_remaining = Some(session.tournament.time_remaining);
        }
        info!(champion = %champion.name, "champion crowned");
    } else if update.left_champion {
        let crowned: Vec<Uuid> = session
            .roster
            .iter()
            .filter(|entry| entry.is_active() && entry.position.is_some())
            .map(|entry| entry.id)
            .collect();
        for id in crowned {
            if let Some(entry) = session.roster.get_mut(&id) {
                entry.position = None;
            }
            writes.push(Write::Player(
                id,
                PlayerPatch {
                    position: Some(None),
                    ..PlayerPatch::default()
                },
            ));
        }
    }

    info!(phase = ?update.phase, "phase changed");
    writes.push(Write::State(patch));
}

fn unknown_entry(id: Uuid) -> ActionResponse {
    info!(entry_id = %id, "ignoring command for unknown entry");
    ActionResponse::new("unknown entry")
}

/// Issue `writes` in order, stopping at the first failure.
async fn commit(
    state: &SharedState,
    store: &Arc<dyn TournamentStore>,
    operation: &'static str,
    writes: Vec<Write>,
) -> Result<(), ServiceError> {
    let state_id = state.session().await.tournament.id;

    for write in writes {
        let result = match write {
            Write::State(patch) if patch.is_empty() => Ok(()),
            Write::State(patch) => store.write_partial(state_id, patch).await,
            Write::Player(id, patch) => store.update_player(id, patch).await,
            Write::Insert(row) => store.insert_player(row).await,
            Write::Delete(id) => store.delete_player(id).await,
            Write::DeleteRoster => store.delete_players(state_id).await,
        };
        if let Err(err) = result {
            return Err(report(state, operation, err));
        }
    }
    Ok(())
}

fn report(state: &SharedState, operation: &'static str, err: StorageError) -> ServiceError {
    warn!(operation, error = %err, "store write failed; keeping local change");
    sse_events::broadcast_error(state, format!("{operation} failed: {err}"));
    ServiceError::from(err)
}
