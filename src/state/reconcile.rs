//! Classification and application of remote state changes.

use tracing::warn;

use crate::{
    dao::models::StatePatch,
    state::{
        blinds::BlindSchedule,
        change::StateChange,
        clock::ClockDriver,
        tournament::TournamentState,
    },
};

/// How an incoming row relates to what this process tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Row carries the defaults written by a reset.
    Reset,
    /// Another level was selected.
    LevelChanged(usize),
    /// The clock was stopped elsewhere.
    Paused,
    /// The clock was restarted elsewhere.
    Resumed,
    /// Only non-clock columns may differ.
    Merge,
}

/// Result of reconciling one state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Branch taken.
    pub kind: ChangeKind,
    /// Pause snapshot the clock authority must push.
    pub push: Option<StatePatch>,
}

/// Classify `view`, the incoming row already coalesced with local values.
///
/// Branches are evaluated in order: reset, level change, pause toggle, merge.
/// A reset is recognised by a reset generation newer than `local_generation`;
/// a row that merely holds default values is never one.
pub fn classify(clock: &ClockDriver, view: &TournamentState, local_generation: u64) -> ChangeKind {
    if view.reset_generation > local_generation {
        return ChangeKind::Reset;
    }
    if view.current_level != clock.tracked_level() {
        return ChangeKind::LevelChanged(view.current_level);
    }
    match (clock.tracked_paused(), view.is_paused) {
        (false, true) => ChangeKind::Paused,
        (true, false) => ChangeKind::Resumed,
        _ => ChangeKind::Merge,
    }
}

/// Apply `change` to the local state and clock tracking.
///
/// `authority` marks the venue's clock authority, which answers a remote
/// pause by pushing its own countdown value.
pub fn reconcile(
    state: &mut TournamentState,
    clock: &mut ClockDriver,
    change: &StateChange,
    schedule: &BlindSchedule,
    authority: bool,
) -> Reconciliation {
    let mut view = change.coalesce(state);
    if schedule.level(view.current_level).is_none() {
        warn!(
            level = view.current_level,
            levels = schedule.len(),
            "level outside the schedule; keeping local value"
        );
        view.current_level = state.current_level;
    }
    let kind = classify(clock, &view, state.reset_generation);
    let mut push = None;

    match kind {
        ChangeKind::Reset => {
            *state = view;
            clock.retrack(state);
            return Reconciliation { kind, push };
        }
        ChangeKind::LevelChanged(level) => {
            state.current_level = level;
            state.time_remaining = schedule.duration_of(level);
            state.is_paused = false;
            clock.note_level(level);
            clock.note_paused(false);
        }
        ChangeKind::Paused => {
            state.is_paused = true;
            clock.note_paused(true);
            if authority {
                push = Some(StatePatch {
                    time_remaining: Some(state.time_remaining),
                    ..StatePatch::default()
                });
            }
        }
        ChangeKind::Resumed => {
            state.time_remaining = view.time_remaining;
            state.is_paused = false;
            clock.note_paused(false);
        }
        ChangeKind::Merge => {}
    }

    merge_metadata(state, &view);
    Reconciliation { kind, push }
}

/// Copy every non-clock column from `view`.
fn merge_metadata(state: &mut TournamentState, view: &TournamentState) {
    state.buy_in_amount = view.buy_in_amount;
    state.game_phase = view.game_phase;
    state.champion_id = view.champion_id.clone();
    state.champion_name = view.champion_name.clone();
    state.event_id = view.event_id.clone();
    state.tournament_name = view.tournament_name.clone();
    state.season_name = view.season_name.clone();
    state.event_number = view.event_number;
    state.total_events = view.total_events;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{change::Field, clock::DEFAULT_SYNC_INTERVAL, tournament::GamePhase};
    use uuid::Uuid;

    fn running(level: usize, remaining: u32) -> (TournamentState, ClockDriver) {
        let mut state = TournamentState::fresh(Uuid::new_v4(), 720);
        state.current_level = level;
        state.time_remaining = remaining;
        state.is_paused = false;
        state.event_id = Some("evt".into());
        let clock = ClockDriver::new(&state, DEFAULT_SYNC_INTERVAL);
        (state, clock)
    }

    fn full_row(state: &TournamentState) -> StateChange {
        StateChange {
            current_level: Field::Value(state.current_level),
            time_remaining: Field::Value(state.time_remaining),
            is_paused: Field::Value(state.is_paused),
            game_phase: Field::Value(state.game_phase),
            champion_id: state.champion_id.clone().map_or(Field::Null, Field::Value),
            champion_name: state.champion_name.clone().map_or(Field::Null, Field::Value),
            buy_in_amount: Field::Value(state.buy_in_amount),
            event_id: state.event_id.clone().map_or(Field::Null, Field::Value),
            tournament_name: state.tournament_name.clone().map_or(Field::Null, Field::Value),
            season_name: state.season_name.clone().map_or(Field::Null, Field::Value),
            event_number: state.event_number.map_or(Field::Null, Field::Value),
            total_events: state.total_events.map_or(Field::Null, Field::Value),
            reset_generation: Field::Value(state.reset_generation),
        }
    }

    #[test]
    fn level_change_adopts_full_duration_and_unpauses() {
        let schedule = BlindSchedule::default();
        let (mut state, mut clock) = running(4, 100);
        state.is_paused = true;
        clock.note_paused(true);

        let mut remote = state.clone();
        remote.current_level = 5;
        remote.time_remaining = 3;
        let outcome = reconcile(&mut state, &mut clock, &full_row(&remote), &schedule, false);

        assert_eq!(outcome.kind, ChangeKind::LevelChanged(5));
        assert_eq!(state.time_remaining, 720);
        assert!(!state.is_paused);
        assert_eq!(clock.tracked_level(), 5);
    }

    #[test]
    fn pause_keeps_local_value_and_authority_pushes_it() {
        let schedule = BlindSchedule::default();
        let (mut state, mut clock) = running(4, 245);

        let mut remote = state.clone();
        remote.is_paused = true;
        remote.time_remaining = 251;
        let outcome = reconcile(&mut state, &mut clock, &full_row(&remote), &schedule, true);

        assert_eq!(outcome.kind, ChangeKind::Paused);
        assert_eq!(state.time_remaining, 245);
        assert!(state.is_paused);
        assert_eq!(outcome.push.and_then(|patch| patch.time_remaining), Some(245));
    }

    #[test]
    fn follower_adopts_store_value_on_resume() {
        let schedule = BlindSchedule::default();
        let (mut state, mut clock) = running(4, 244);

        let mut paused = state.clone();
        paused.is_paused = true;
        paused.time_remaining = 251;
        let outcome = reconcile(&mut state, &mut clock, &full_row(&paused), &schedule, false);
        assert!(outcome.push.is_none());

        let mut resumed = state.clone();
        resumed.is_paused = false;
        resumed.time_remaining = 245;
        let outcome = reconcile(&mut state, &mut clock, &full_row(&resumed), &schedule, false);

        assert_eq!(outcome.kind, ChangeKind::Resumed);
        assert_eq!(state.time_remaining, 245);
        assert!(!state.is_paused);
    }

    #[test]
    fn merge_never_touches_the_running_clock() {
        let schedule = BlindSchedule::default();
        let (mut state, mut clock) = running(4, 300);

        let mut remote = state.clone();
        remote.time_remaining = 310;
        remote.buy_in_amount = 15_000;
        remote.game_phase = GamePhase::FinalTable;
        let change = full_row(&remote);

        let first = reconcile(&mut state, &mut clock, &change, &schedule, true);
        let after_first = state.clone();
        let second = reconcile(&mut state, &mut clock, &change, &schedule, true);

        assert_eq!(first.kind, ChangeKind::Merge);
        assert_eq!(second.kind, ChangeKind::Merge);
        assert_eq!(state, after_first);
        assert_eq!(state.time_remaining, 300);
        assert_eq!(state.buy_in_amount, 15_000);
    }

    #[test]
    fn champion_capture_merges_alongside_pause() {
        let schedule = BlindSchedule::default();
        let (mut state, mut clock) = running(4, 300);

        let mut remote = state.clone();
        remote.is_paused = true;
        remote.game_phase = GamePhase::Champion;
        remote.champion_id = Some("p7".into());
        remote.champion_name = Some("Lucia".into());
        let outcome = reconcile(&mut state, &mut clock, &full_row(&remote), &schedule, false);

        assert_eq!(outcome.kind, ChangeKind::Paused);
        assert_eq!(state.game_phase, GamePhase::Champion);
        assert_eq!(state.champion_name.as_deref(), Some("Lucia"));
    }

    #[test]
    fn reset_row_is_adopted_wholesale() {
        let schedule = BlindSchedule::default();
        let (mut state, mut clock) = running(14, 30);
        state.game_phase = GamePhase::Champion;
        state.champion_id = Some("p1".into());

        let mut remote = state.clone();
        remote.reset(720);
        let outcome = reconcile(&mut state, &mut clock, &full_row(&remote), &schedule, true);

        assert_eq!(outcome.kind, ChangeKind::Reset);
        assert_eq!(state.current_level, 0);
        assert_eq!(state.time_remaining, 720);
        assert!(state.champion_id.is_none());
        assert!(state.event_id.is_none());
        assert_eq!(clock.tracked_level(), 0);
        assert!(clock.tracked_paused());
        assert_eq!(state.reset_generation, 1);

        let again = reconcile(&mut state, &mut clock, &full_row(&remote), &schedule, true);
        assert_eq!(again.kind, ChangeKind::Merge);
    }

    #[test]
    fn pause_on_untouched_first_level_is_not_a_reset() {
        let schedule = BlindSchedule::default();
        let mut state = TournamentState::fresh(Uuid::new_v4(), 720);
        state.is_paused = false;
        state.time_remaining = 245;
        let mut clock = ClockDriver::new(&state, DEFAULT_SYNC_INTERVAL);

        let mut remote = TournamentState::fresh(state.id, 720);
        remote.is_paused = true;
        let outcome = reconcile(&mut state, &mut clock, &full_row(&remote), &schedule, true);

        assert_eq!(outcome.kind, ChangeKind::Paused);
        assert_eq!(state.time_remaining, 245);
        assert_eq!(outcome.push.and_then(|patch| patch.time_remaining), Some(245));
    }

    #[test]
    fn level_outside_the_schedule_keeps_the_local_level() {
        let schedule = BlindSchedule::default();
        let (mut state, mut clock) = running(4, 300);

        let mut remote = state.clone();
        remote.current_level = usize::MAX;
        let outcome = reconcile(&mut state, &mut clock, &full_row(&remote), &schedule, false);

        assert_eq!(outcome.kind, ChangeKind::Merge);
        assert_eq!(state.current_level, 4);
        assert_eq!(state.time_remaining, 300);
    }

    #[test]
    fn running_first_level_sync_is_not_a_reset() {
        let schedule = BlindSchedule::default();
        let mut state = TournamentState::fresh(Uuid::new_v4(), 720);
        state.is_paused = false;
        state.time_remaining = 700;
        let mut clock = ClockDriver::new(&state, DEFAULT_SYNC_INTERVAL);

        let mut remote = state.clone();
        remote.time_remaining = 705;
        let outcome = reconcile(&mut state, &mut clock, &full_row(&remote), &schedule, false);

        assert_eq!(outcome.kind, ChangeKind::Merge);
        assert_eq!(state.time_remaining, 700);
    }
}
