//! Phase derivation from the roster.
//!
//! The phase is recomputed from scratch on every trigger, so reverting an
//! elimination can move it backwards.

use uuid::Uuid;

use crate::{
    dao::models::StatePatch,
    state::tournament::{GamePhase, Roster, TournamentState},
};

/// Phase for a given number of active players.
pub fn phase_for(active: usize) -> GamePhase {
    match active {
        0 | 1 => GamePhase::Champion,
        2 => GamePhase::HeadsUp,
        3..=9 => GamePhase::FinalTable,
        _ => GamePhase::Normal,
    }
}

/// Roster mutation that may require a phase recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseTrigger {
    /// A player was knocked out.
    Eliminate,
    /// A knock-out was undone.
    RevertElimination,
    /// An entry was deleted from the roster.
    Remove,
    /// A deleted entry was put back.
    Restore,
}

impl PhaseTrigger {
    /// Whether this trigger recomputes the phase for the given roster.
    ///
    /// Removals and restores only count once someone has been eliminated, so
    /// registering players never crowns a champion.
    pub fn applies_to(self, roster: &Roster) -> bool {
        match self {
            PhaseTrigger::Eliminate | PhaseTrigger::RevertElimination => true,
            PhaseTrigger::Remove | PhaseTrigger::Restore => roster.eliminated_count() > 0,
        }
    }
}

/// Winner named when the champion phase is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Champion {
    /// Roster entry of the winner.
    pub entry_id: Uuid,
    /// Registry id of the winner.
    pub player_id: String,
    /// Display name of the winner.
    pub name: String,
}

/// Result of evaluating a roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseOutcome {
    /// Derived phase.
    pub phase: GamePhase,
    /// Sole active entry when the phase is champion.
    pub champion: Option<Champion>,
}

/// Recompute the phase of `roster` from scratch.
pub fn evaluate(roster: &Roster) -> PhaseOutcome {
    let phase = phase_for(roster.active_count());
    let champion = match phase {
        GamePhase::Champion => roster.sole_active().map(|entry| Champion {
            entry_id: entry.id,
            player_id: entry.player_id.clone(),
            name: entry.name.clone(),
        }),
        _ => None,
    };

    PhaseOutcome { phase, champion }
}

/// Phase change to apply to the local state and persist as a single write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseUpdate {
    /// New phase.
    pub phase: GamePhase,
    /// Winner captured on entry into the champion phase.
    pub champion: Option<Champion>,
    /// Whether the previous phase was champion.
    pub left_champion: bool,
}

impl PhaseUpdate {
    /// Compare the evaluated roster with the current state, returning `None` when nothing changes.
    pub fn between(state: &TournamentState, outcome: PhaseOutcome) -> Option<Self> {
        if outcome.phase == state.game_phase {
            let same_champion = match &outcome.champion {
                Some(champion) => state.champion_id.as_deref() == Some(champion.player_id.as_str()),
                None => true,
            };
            if same_champion {
                return None;
            }
        }

        Some(Self {
            phase: outcome.phase,
            champion: outcome.champion,
            left_champion: state.game_phase == GamePhase::Champion
                && outcome.phase != GamePhase::Champion,
        })
    }

    /// Apply the update to the local state.
    pub fn apply(&self, state: &mut TournamentState) {
        state.game_phase = self.phase;
        if let Some(champion) = &self.champion {
            state.champion_id = Some(champion.player_id.clone());
            state.champion_name = Some(champion.name.clone());
            state.is_paused = true;
        } else if self.left_champion {
            state.clear_champion();
        }
    }

    /// Partial write carrying phase, champion columns and the forced pause.
    pub fn patch(&self) -> StatePatch {
        let mut patch = StatePatch {
            game_phase: Some(self.phase.into()),
            ..StatePatch::default()
        };
        if let Some(champion) = &self.champion {
            patch.champion_id = Some(Some(champion.player_id.clone()));
            patch.champion_name = Some(Some(champion.name.clone()));
            patch.is_paused = Some(true);
        } else if self.left_champion {
            patch.champion_id = Some(None);
            patch.champion_name = Some(None);
        }
        patch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tournament::{PlayerEntry, PlayerStatus};

    fn roster(active: usize, eliminated: usize) -> Roster {
        (0..active + eliminated)
            .map(|i| {
                let mut entry = PlayerEntry::registered(format!("p{i}"), format!("Player {i}"));
                if i >= active {
                    entry.status = PlayerStatus::Eliminated;
                }
                entry
            })
            .collect()
    }

    #[test]
    fn thresholds() {
        assert_eq!(phase_for(0), GamePhase::Champion);
        assert_eq!(phase_for(1), GamePhase::Champion);
        assert_eq!(phase_for(2), GamePhase::HeadsUp);
        assert_eq!(phase_for(3), GamePhase::FinalTable);
        assert_eq!(phase_for(9), GamePhase::FinalTable);
        assert_eq!(phase_for(10), GamePhase::Normal);
    }

    #[test]
    fn champion_is_sole_active_entry() {
        let outcome = evaluate(&roster(1, 5));
        assert_eq!(outcome.phase, GamePhase::Champion);
        assert_eq!(outcome.champion.unwrap().player_id, "p0");

        let empty = evaluate(&Roster::new());
        assert_eq!(empty.phase, GamePhase::Champion);
        assert!(empty.champion.is_none());
    }

    #[test]
    fn removal_only_recomputes_once_underway() {
        assert!(!PhaseTrigger::Remove.applies_to(&roster(1, 0)));
        assert!(!PhaseTrigger::Restore.applies_to(&roster(4, 0)));
        assert!(PhaseTrigger::Remove.applies_to(&roster(3, 1)));
        assert!(PhaseTrigger::Eliminate.applies_to(&roster(3, 0)));
    }

    #[test]
    fn entering_champion_pauses_and_names_winner() {
        let mut state = TournamentState::fresh(Uuid::new_v4(), 720);
        state.is_paused = false;
        state.game_phase = GamePhase::HeadsUp;

        let update = PhaseUpdate::between(&state, evaluate(&roster(1, 2))).unwrap();
        let patch = update.patch();
        update.apply(&mut state);

        assert_eq!(state.game_phase, GamePhase::Champion);
        assert!(state.is_paused);
        assert_eq!(state.champion_name.as_deref(), Some("Player 0"));
        assert_eq!(patch.is_paused, Some(true));
        assert_eq!(patch.champion_id, Some(Some("p0".to_string())));
    }

    #[test]
    fn leaving_champion_clears_winner() {
        let mut state = TournamentState::fresh(Uuid::new_v4(), 720);
        state.game_phase = GamePhase::Champion;
        state.champion_id = Some("p0".into());
        state.champion_name = Some("Player 0".into());

        let update = PhaseUpdate::between(&state, evaluate(&roster(2, 1))).unwrap();
        let patch = update.patch();
        update.apply(&mut state);

        assert_eq!(state.game_phase, GamePhase::HeadsUp);
        assert!(state.champion_id.is_none());
        assert_eq!(patch.champion_name, Some(None));
        assert!(patch.is_paused.is_none());
    }

    #[test]
    fn unchanged_phase_yields_nothing() {
        let mut state = TournamentState::fresh(Uuid::new_v4(), 720);
        state.game_phase = GamePhase::FinalTable;
        assert!(PhaseUpdate::between(&state, evaluate(&roster(5, 3))).is_none());
    }
}
