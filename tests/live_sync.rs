//! Several processes sharing one in-memory store, driven end to end.

use std::{sync::Arc, time::Duration};

use live_tournament::{
    config::{AppConfig, ProcessRole},
    dao::tournament_store::{StoreChange, TournamentStore, memory::MemoryTournamentStore},
    dto::operator::TournamentInfoRequest,
    error::ServiceError,
    services::{clock_service, command_service, sync_service, undo_service},
    state::{
        AppState, SharedState,
        change::ChangeEvent,
        clock::TickOutcome,
        tournament::{GamePhase, PlayerStatus},
    },
};
use uuid::Uuid;

async fn process(store: &MemoryTournamentStore, role: ProcessRole) -> SharedState {
    let state = AppState::new(AppConfig::for_role(role));
    sync_service::attach(&state, Arc::new(store.clone()))
        .await
        .expect("attach to memory store");
    state
}

/// Let feed tasks drain; paused time only moves once every task is idle.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

async fn register(operator: &SharedState, count: usize) -> Vec<Uuid> {
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let created = command_service::add_player(operator, format!("p-{i}"), format!("Player {i}"))
            .await
            .unwrap();
        ids.push(created.id);
    }
    settle().await;
    ids
}

async fn active_ids(state: &SharedState) -> Vec<Uuid> {
    let session = state.session().await;
    session
        .roster
        .iter()
        .filter(|entry| entry.is_active())
        .map(|entry| entry.id)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn second_process_loads_the_existing_session() {
    let store = MemoryTournamentStore::new();
    let operator = process(&store, ProcessRole::Operator).await;
    let display = process(&store, ProcessRole::Display).await;

    let (a, _) = operator.snapshot().await;
    let (b, _) = display.snapshot().await;
    assert_eq!(a.id, b.id);
    assert!(b.is_paused);
    assert_eq!(b.time_remaining, 720);
    assert_eq!(b.buy_in_amount, 10_000);
}

#[tokio::test(start_paused = true)]
async fn eliminations_walk_the_phases_down_to_a_champion() {
    let store = MemoryTournamentStore::new();
    let operator = process(&store, ProcessRole::Operator).await;
    let display = process(&store, ProcessRole::Display).await;
    register(&operator, 9).await;
    command_service::play(&operator).await.unwrap();
    settle().await;

    let mut phases = Vec::new();
    while active_ids(&operator).await.len() > 1 {
        let victim = active_ids(&operator).await[0];
        command_service::eliminate_player(&operator, victim, None)
            .await
            .unwrap();
        settle().await;
        phases.push(display.snapshot().await.0.game_phase);
    }

    assert_eq!(phases.first(), Some(&GamePhase::FinalTable));
    assert_eq!(phases[phases.len() - 2], GamePhase::HeadsUp);
    assert_eq!(phases.last(), Some(&GamePhase::Champion));

    let (tournament, roster) = display.snapshot().await;
    let champion = roster.iter().find(|entry| entry.is_active()).unwrap();
    assert!(tournament.is_paused);
    assert_eq!(tournament.champion_id.as_deref(), Some(champion.player_id.as_str()));
    assert_eq!(tournament.champion_name.as_deref(), Some(champion.name.as_str()));
    assert_eq!(champion.position, Some(1));

    let mut positions: Vec<u32> = roster.iter().filter_map(|entry| entry.position).collect();
    positions.sort_unstable();
    assert_eq!(positions, (1..=9).collect::<Vec<_>>());

    let row = store.read_current().await.unwrap().unwrap();
    assert!(row.is_paused);
    assert_eq!(row.champion_name.as_deref(), Some(champion.name.as_str()));
}

#[tokio::test(start_paused = true)]
async fn most_recent_elimination_takes_the_lowest_free_position() {
    let store = MemoryTournamentStore::new();
    let operator = process(&store, ProcessRole::Operator).await;
    let ids = register(&operator, 5).await;

    command_service::eliminate_player(&operator, ids[4], None)
        .await
        .unwrap();
    settle().await;
    command_service::eliminate_player(&operator, ids[0], None)
        .await
        .unwrap();
    settle().await;

    let (_, roster) = operator.snapshot().await;
    assert_eq!(roster.get(&ids[4]).unwrap().position, Some(5));
    assert_eq!(roster.get(&ids[0]).unwrap().position, Some(4));

    let taken = command_service::eliminate_player(&operator, ids[1], Some(5)).await;
    assert!(matches!(taken, Err(ServiceError::InvalidInput(_))));
}

#[tokio::test(start_paused = true)]
async fn clock_authority_advances_into_the_break() {
    let store = MemoryTournamentStore::new();
    let operator = process(&store, ProcessRole::Operator).await;
    let display = process(&store, ProcessRole::Display).await;

    {
        let mut session = display.session().await;
        session.tournament.current_level = 10;
        session.tournament.time_remaining = 1;
        session.tournament.is_paused = false;
        session.clock.note_level(10);
        session.clock.note_paused(false);
    }

    let outcome = clock_service::tick(&display).await;
    assert!(matches!(outcome, TickOutcome::Advanced { .. }));
    settle().await;

    for state in [&display, &operator] {
        let (tournament, _) = state.snapshot().await;
        assert_eq!(tournament.current_level, 11);
        assert_eq!(tournament.time_remaining, 1800);
        assert!(!tournament.is_paused);
    }
}

#[tokio::test(start_paused = true)]
async fn followers_adopt_the_authority_value_on_resume() {
    let store = MemoryTournamentStore::new();
    let operator = process(&store, ProcessRole::Operator).await;
    let display = process(&store, ProcessRole::Display).await;
    let viewer = process(&store, ProcessRole::Viewer).await;

    command_service::play(&operator).await.unwrap();
    settle().await;
    for (state, remaining) in [(&display, 245), (&operator, 244), (&viewer, 243)] {
        state.session().await.tournament.time_remaining = remaining;
    }

    command_service::pause(&operator).await.unwrap();
    settle().await;
    assert_eq!(display.snapshot().await.0.time_remaining, 245);
    assert_eq!(operator.snapshot().await.0.time_remaining, 244);
    assert_eq!(store.read_current().await.unwrap().unwrap().time_remaining, 245);

    command_service::play(&operator).await.unwrap();
    settle().await;
    for state in [&display, &operator, &viewer] {
        let (tournament, _) = state.snapshot().await;
        assert!(!tournament.is_paused);
        assert_eq!(tournament.time_remaining, 245);
    }
}

#[tokio::test(start_paused = true)]
async fn pause_on_the_first_level_before_any_sync_keeps_local_state() {
    let store = MemoryTournamentStore::new();
    let operator = process(&store, ProcessRole::Operator).await;
    let display = process(&store, ProcessRole::Display).await;
    let ids = register(&operator, 12).await;

    command_service::play(&operator).await.unwrap();
    settle().await;
    command_service::eliminate_player(&operator, ids[0], None)
        .await
        .unwrap();
    settle().await;
    display.session().await.tournament.time_remaining = 600;

    command_service::pause(&operator).await.unwrap();
    settle().await;

    assert!(operator.session().await.undo.pending().is_some());
    let (tournament, roster) = display.snapshot().await;
    assert!(tournament.is_paused);
    assert_eq!(tournament.time_remaining, 600);
    assert_eq!(roster.len(), 12);
    assert_eq!(store.read_current().await.unwrap().unwrap().time_remaining, 600);

    command_service::play(&operator).await.unwrap();
    settle().await;
    assert_eq!(operator.snapshot().await.0.time_remaining, 600);
}

#[tokio::test(start_paused = true)]
async fn periodic_sync_is_persisted_only_by_the_authority() {
    let store = MemoryTournamentStore::new();
    let operator = process(&store, ProcessRole::Operator).await;
    let display = process(&store, ProcessRole::Display).await;
    command_service::play(&operator).await.unwrap();
    settle().await;

    for _ in 0..3 {
        tokio::time::advance(Duration::from_secs(1)).await;
        clock_service::tick(&operator).await;
    }
    assert_eq!(store.read_current().await.unwrap().unwrap().time_remaining, 720);

    clock_service::tick(&display).await;
    assert_eq!(store.read_current().await.unwrap().unwrap().time_remaining, 719);
}

#[tokio::test(start_paused = true)]
async fn reset_in_champion_phase_reaches_every_process() {
    let store = MemoryTournamentStore::new();
    let operator = process(&store, ProcessRole::Operator).await;
    let display = process(&store, ProcessRole::Display).await;
    let viewer = process(&store, ProcessRole::Viewer).await;

    register(&operator, 12).await;
    command_service::set_tournament_info(
        &operator,
        TournamentInfoRequest {
            event_id: Some(Some("evt-7".into())),
            event_number: Some(Some(7)),
            ..TournamentInfoRequest::default()
        },
    )
    .await
    .unwrap();
    command_service::set_buy_in(&operator, 20_000).await.unwrap();
    command_service::play(&operator).await.unwrap();
    while active_ids(&operator).await.len() > 1 {
        let victim = active_ids(&operator).await[0];
        command_service::eliminate_player(&operator, victim, None)
            .await
            .unwrap();
        settle().await;
    }
    assert_eq!(viewer.snapshot().await.0.game_phase, GamePhase::Champion);

    command_service::reset_tournament(&operator).await.unwrap();
    settle().await;

    for state in [&operator, &display, &viewer] {
        let session = state.session().await;
        assert!(session.roster.is_empty());
        assert!(session.tournament.looks_reset());
        assert_eq!(session.tournament.reset_generation, 1);
        assert!(session.tournament.is_paused);
        assert_eq!(session.tournament.time_remaining, 720);
        assert_eq!(session.tournament.event_number, None);
        assert_eq!(session.tournament.buy_in_amount, 20_000);
        assert!(session.undo.pending().is_none());
    }
    let row = store.read_current().await.unwrap().unwrap();
    assert!(store.list_players(row.id).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn duplicate_notifications_are_idempotent() {
    let store = MemoryTournamentStore::new();
    let operator = process(&store, ProcessRole::Operator).await;
    let viewer = process(&store, ProcessRole::Viewer).await;
    command_service::next_level(&operator).await.unwrap();
    command_service::pause(&operator).await.unwrap();
    settle().await;

    let row = store.read_current().await.unwrap().unwrap();
    let serde_json::Value::Object(raw) = serde_json::to_value(&row).unwrap() else {
        panic!("row must serialize to an object");
    };
    let event = ChangeEvent::from(StoreChange::State(raw));

    sync_service::apply(&viewer, event.clone()).await;
    let once = viewer.snapshot().await.0;
    sync_service::apply(&viewer, event).await;
    let twice = viewer.snapshot().await.0;
    assert_eq!(once, twice);
    assert_eq!(once.current_level, 1);
}

#[tokio::test(start_paused = true)]
async fn undo_restores_a_removed_entry_exactly() {
    let store = MemoryTournamentStore::new();
    let operator = process(&store, ProcessRole::Operator).await;
    let ids = register(&operator, 3).await;
    command_service::add_rebuy(&operator, ids[1]).await.unwrap();
    let before = operator.snapshot().await.1.get(&ids[1]).cloned().unwrap();

    command_service::remove_player(&operator, ids[1]).await.unwrap();
    settle().await;
    assert!(operator.snapshot().await.1.get(&ids[1]).is_none());

    undo_service::fire(&operator).await.unwrap();
    settle().await;
    let (tournament, roster) = operator.snapshot().await;
    assert_eq!(roster.get(&ids[1]), Some(&before));
    let names: Vec<_> = roster.iter().map(|entry| entry.name.clone()).collect();
    assert_eq!(names, ["Player 0", "Player 1", "Player 2"]);

    let stored = store.list_players(tournament.id).await.unwrap();
    assert!(stored.iter().any(|row| row.id == ids[1] && row.has_rebuy));
}

#[tokio::test(start_paused = true)]
async fn undoing_the_final_elimination_leaves_champion_phase() {
    let store = MemoryTournamentStore::new();
    let operator = process(&store, ProcessRole::Operator).await;
    let display = process(&store, ProcessRole::Display).await;
    let ids = register(&operator, 2).await;

    command_service::eliminate_player(&operator, ids[0], None)
        .await
        .unwrap();
    settle().await;
    assert_eq!(display.snapshot().await.0.game_phase, GamePhase::Champion);

    undo_service::fire(&operator).await.unwrap();
    settle().await;

    for state in [&operator, &display] {
        let (tournament, roster) = state.snapshot().await;
        assert_eq!(tournament.game_phase, GamePhase::HeadsUp);
        assert_eq!(tournament.champion_id, None);
        assert_eq!(tournament.champion_name, None);
        assert!(roster.iter().all(|entry| entry.status == PlayerStatus::Active));
        assert!(roster.iter().all(|entry| entry.position.is_none()));
    }
}

#[tokio::test(start_paused = true)]
async fn undo_window_expires_silently() {
    let store = MemoryTournamentStore::new();
    let operator = process(&store, ProcessRole::Operator).await;
    let ids = register(&operator, 4).await;

    command_service::eliminate_player(&operator, ids[2], None)
        .await
        .unwrap();
    assert!(operator.session().await.undo.pending().is_some());

    tokio::time::sleep(Duration::from_secs(9)).await;
    assert!(operator.session().await.undo.pending().is_none());

    let response = undo_service::fire(&operator).await.unwrap();
    assert_eq!(response.message, "nothing to undo");
    let (_, roster) = operator.snapshot().await;
    assert_eq!(roster.get(&ids[2]).unwrap().status, PlayerStatus::Eliminated);
}

#[tokio::test(start_paused = true)]
async fn newer_action_supersedes_the_pending_undo() {
    let store = MemoryTournamentStore::new();
    let operator = process(&store, ProcessRole::Operator).await;
    let ids = register(&operator, 4).await;

    command_service::eliminate_player(&operator, ids[0], None)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    command_service::add_rebuy(&operator, ids[1]).await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    // The elimination window has elapsed; the rebuy replaced it and is still open.
    assert!(operator.session().await.undo.pending().is_some());
    undo_service::fire(&operator).await.unwrap();

    let (_, roster) = operator.snapshot().await;
    assert!(!roster.get(&ids[1]).unwrap().has_rebuy);
    assert_eq!(roster.get(&ids[0]).unwrap().status, PlayerStatus::Eliminated);
}

#[tokio::test(start_paused = true)]
async fn concurrent_reversible_commands_still_expire() {
    let store = MemoryTournamentStore::new();
    let operator = process(&store, ProcessRole::Operator).await;
    let ids = register(&operator, 4).await;

    let (first, second) = tokio::join!(
        command_service::add_rebuy(&operator, ids[0]),
        command_service::add_rebuy(&operator, ids[1]),
    );
    first.unwrap();
    second.unwrap();
    tokio::time::sleep(Duration::from_secs(9)).await;

    assert!(operator.session().await.undo.pending().is_none());
    let response = undo_service::fire(&operator).await.unwrap();
    assert_eq!(response.message, "nothing to undo");
    let (_, roster) = operator.snapshot().await;
    assert!(roster.get(&ids[0]).unwrap().has_rebuy);
    assert!(roster.get(&ids[1]).unwrap().has_rebuy);
}

#[tokio::test(start_paused = true)]
async fn commands_fail_without_a_store_but_keep_local_changes_on_write_errors() {
    let detached = AppState::new(AppConfig::for_role(ProcessRole::Operator));
    assert!(matches!(
        command_service::play(&detached).await,
        Err(ServiceError::Degraded)
    ));

    let store = MemoryTournamentStore::new();
    let operator = process(&store, ProcessRole::Operator).await;
    store.set_available(false);

    let result = command_service::play(&operator).await;
    assert!(matches!(result, Err(ServiceError::Unavailable(_))));
    assert!(!operator.snapshot().await.0.is_paused);
}

#[tokio::test(start_paused = true)]
async fn unknown_entries_are_ignored() {
    let store = MemoryTournamentStore::new();
    let operator = process(&store, ProcessRole::Operator).await;
    let ghost = Uuid::new_v4();

    for response in [
        command_service::eliminate_player(&operator, ghost, None).await,
        command_service::add_rebuy(&operator, ghost).await,
        command_service::remove_player(&operator, ghost).await,
        command_service::revert_elimination(&operator, ghost).await,
    ] {
        assert_eq!(response.unwrap().message, "unknown entry");
    }
    assert!(operator.session().await.undo.pending().is_none());
}
