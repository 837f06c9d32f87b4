//! Read-only projection served to the public viewer.

use crate::{
    dto::public::PublicLiveResponse,
    state::{
        SharedState,
        tournament::{GamePhase, Roster, TournamentState},
    },
};

/// Project the session for the public; nothing but `is_live` leaks while paused or crowned.
pub fn project(tournament: &TournamentState, roster: &Roster) -> PublicLiveResponse {
    if tournament.is_paused || tournament.game_phase == GamePhase::Champion {
        return PublicLiveResponse::offline();
    }

    PublicLiveResponse {
        is_live: true,
        active_players: Some(roster.active_count()),
        total_players: Some(roster.len()),
        current_level: Some(tournament.current_level),
        time_remaining: Some(tournament.time_remaining),
        is_paused: Some(tournament.is_paused),
        game_phase: Some(tournament.game_phase),
        event_number: tournament.event_number,
        season_name: tournament.season_name.clone(),
    }
}

/// Current public projection of this process's session.
pub async fn live(state: &SharedState) -> PublicLiveResponse {
    let session = state.session().await;
    project(&session.tournament, &session.roster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tournament::PlayerEntry;
    use uuid::Uuid;

    fn running() -> TournamentState {
        let mut state = TournamentState::fresh(Uuid::new_v4(), 720);
        state.is_paused = false;
        state.current_level = 3;
        state.time_remaining = 400;
        state.event_number = Some(5);
        state
    }

    #[test]
    fn paused_session_is_offline() {
        let state = TournamentState::fresh(Uuid::new_v4(), 720);
        let json = serde_json::to_value(project(&state, &Roster::new())).unwrap();
        assert_eq!(json, serde_json::json!({ "is_live": false }));
    }

    #[test]
    fn crowned_session_is_offline_even_if_running() {
        let mut state = running();
        state.game_phase = GamePhase::Champion;
        assert!(!project(&state, &Roster::new()).is_live);
    }

    #[test]
    fn running_session_exposes_counts() {
        let roster: Roster = ["Ana", "Bea"]
            .into_iter()
            .map(|name| PlayerEntry::registered(name.to_lowercase(), name))
            .collect();
        let live = project(&running(), &roster);

        assert!(live.is_live);
        assert_eq!(live.active_players, Some(2));
        assert_eq!(live.total_players, Some(2));
        assert_eq!(live.time_remaining, Some(400));
        assert_eq!(live.event_number, Some(5));
        assert_eq!(live.season_name, None);
    }
}
