//! Full snapshot rendered by the countdown display and the operator console.

use crate::{
    config::AppConfig,
    dto::{
        common::{
            BlindLevelSummary, PayoutSummary, PlayerSummary, StatsSummary, TournamentSummary,
            UndoSummary,
        },
        display::DisplayStateResponse,
    },
    state::{
        Session, SharedState,
        stats::{LiveStats, payouts},
    },
};

/// Render `session` against the configured schedule.
pub fn render(config: &AppConfig, degraded: bool, session: &Session) -> DisplayStateResponse {
    let schedule = config.schedule();
    let tournament = &session.tournament;
    let level = tournament.current_level;
    let stats = LiveStats::compute(&session.roster, tournament.buy_in_amount);

    DisplayStateResponse {
        tournament: TournamentSummary::from(tournament),
        current_level: schedule.level(level).map(BlindLevelSummary::from),
        next_level: schedule.next(level).map(BlindLevelSummary::from),
        next_playable_level: schedule.next_playable(level).map(BlindLevelSummary::from),
        total_levels: schedule.playable_count(),
        players: session.roster.iter().map(PlayerSummary::from).collect(),
        prizes: payouts(stats.prize_pool)
            .into_iter()
            .map(PayoutSummary::from)
            .collect(),
        stats: StatsSummary::from(stats),
        undo: session.undo.pending().map(UndoSummary::from),
        degraded,
    }
}

/// Snapshot of this process's session.
pub async fn display_state(state: &SharedState) -> DisplayStateResponse {
    let session = state.session().await;
    render(state.config(), state.is_degraded(), &session)
}
