use std::time::SystemTime;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dao::models::{
    GamePhaseEntity, PlayerEntryEntity, PlayerStatusEntity, StatePatch, TournamentStateEntity,
};

/// Buy-in applied to freshly created sessions.
pub const DEFAULT_BUY_IN: u64 = 10_000;

/// Competitive phase derived from the number of active players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// More than nine players remain.
    #[default]
    Normal,
    /// Nine players or fewer remain.
    FinalTable,
    /// Two players remain.
    HeadsUp,
    /// One player remains.
    Champion,
}

/// Whether an entry is still playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    /// Still in the tournament.
    #[default]
    Active,
    /// Knocked out.
    Eliminated,
}

/// In-memory view of the session row held by each process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TournamentState {
    /// Primary key of the session row.
    pub id: Uuid,
    /// Index into the blind schedule.
    pub current_level: usize,
    /// Seconds left in the current level.
    pub time_remaining: u32,
    /// Whether the clock is stopped.
    pub is_paused: bool,
    /// Phase derived from the roster.
    pub game_phase: GamePhase,
    /// Registry id of the champion.
    pub champion_id: Option<String>,
    /// Display name of the champion.
    pub champion_name: Option<String>,
    /// Buy-in used for the prize pool.
    pub buy_in_amount: u64,
    /// External event identifier.
    pub event_id: Option<String>,
    /// Display name of the tournament.
    pub tournament_name: Option<String>,
    /// Display name of the season.
    pub season_name: Option<String>,
    /// Event number within the season.
    pub event_number: Option<u32>,
    /// Number of events in the season.
    pub total_events: Option<u32>,
    /// Number of resets the session has gone through.
    pub reset_generation: u64,
    /// Last time the row was written.
    pub updated_at: SystemTime,
}

impl TournamentState {
    /// Default row: first level, full duration, paused, no metadata.
    pub fn fresh(id: Uuid, initial_duration: u32) -> Self {
        Self {
            id,
            current_level: 0,
            time_remaining: initial_duration,
            is_paused: true,
            game_phase: GamePhase::Normal,
            champion_id: None,
            champion_name: None,
            buy_in_amount: DEFAULT_BUY_IN,
            event_id: None,
            tournament_name: None,
            season_name: None,
            event_number: None,
            total_events: None,
            reset_generation: 0,
            updated_at: SystemTime::now(),
        }
    }

    /// Restore the default row in place, keeping the id and the buy-in and
    /// moving to the next reset generation.
    pub fn reset(&mut self, initial_duration: u32) {
        let buy_in = self.buy_in_amount;
        let generation = self.reset_generation.saturating_add(1);
        *self = Self::fresh(self.id, initial_duration);
        self.buy_in_amount = buy_in;
        self.reset_generation = generation;
    }

    /// Partial write restoring the default row, leaving the buy-in untouched.
    ///
    /// Build it after [`TournamentState::reset`] so the row carries the new
    /// generation.
    pub fn reset_patch(&self) -> StatePatch {
        let initial_duration = self.time_remaining;
        StatePatch {
            current_level: Some(0),
            time_remaining: Some(initial_duration),
            is_paused: Some(true),
            game_phase: Some(GamePhaseEntity::Normal),
            champion_id: Some(None),
            champion_name: Some(None),
            buy_in_amount: None,
            event_id: Some(None),
            tournament_name: Some(None),
            season_name: Some(None),
            event_number: Some(None),
            total_events: Some(None),
            reset_generation: Some(self.reset_generation),
        }
    }

    /// True when the row matches the shape written by a reset.
    pub fn looks_reset(&self) -> bool {
        self.current_level == 0
            && self.champion_id.is_none()
            && self.event_id.is_none()
            && self.game_phase == GamePhase::Normal
    }

    /// Clear the champion columns.
    pub fn clear_champion(&mut self) {
        self.champion_id = None;
        self.champion_name = None;
    }
}

/// One roster row as known locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerEntry {
    /// Primary key of the entry.
    pub id: Uuid,
    /// Reference into the external player registry.
    pub player_id: String,
    /// Name shown on screens.
    pub name: String,
    /// Active or eliminated.
    pub status: PlayerStatus,
    /// Finishing position, assigned at elimination.
    pub position: Option<u32>,
    /// Whether the player bought back in.
    pub has_rebuy: bool,
    /// Insertion time, kept so re-inserted rows retain their place.
    pub created_at: SystemTime,
}

impl PlayerEntry {
    /// New active entry without position or rebuy.
    pub fn registered(player_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            player_id: player_id.into(),
            name: name.into(),
            status: PlayerStatus::Active,
            position: None,
            has_rebuy: false,
            created_at: SystemTime::now(),
        }
    }

    /// Whether the entry is still playing.
    pub fn is_active(&self) -> bool {
        self.status == PlayerStatus::Active
    }
}

/// Ordered roster of a session keyed by entry id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    entries: IndexMap<Uuid, PlayerEntry>,
}

impl Roster {
    /// Empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry with the given id.
    pub fn get(&self, id: &Uuid) -> Option<&PlayerEntry> {
        self.entries.get(id)
    }

    /// Mutable entry with the given id.
    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut PlayerEntry> {
        self.entries.get_mut(id)
    }

    /// Insert or replace an entry, keeping registration order by `created_at`.
    pub fn insert(&mut self, entry: PlayerEntry) {
        self.entries.insert(entry.id, entry);
        self.entries
            .sort_by(|_, left, _, right| left.created_at.cmp(&right.created_at));
    }

    /// Remove an entry, returning it with all its fields.
    pub fn remove(&mut self, id: &Uuid) -> Option<PlayerEntry> {
        self.entries.shift_remove(id)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replace the whole roster with a fresh snapshot.
    pub fn replace_all(&mut self, entries: impl IntoIterator<Item = PlayerEntry>) {
        self.entries.clear();
        for entry in entries {
            self.entries.insert(entry.id, entry);
        }
        self.entries
            .sort_by(|_, left, _, right| left.created_at.cmp(&right.created_at));
    }

    /// Iterate entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &PlayerEntry> {
        self.entries.values()
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entry is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries still playing.
    pub fn active_count(&self) -> usize {
        self.iter().filter(|entry| entry.is_active()).count()
    }

    /// Number of knocked out entries.
    pub fn eliminated_count(&self) -> usize {
        self.len() - self.active_count()
    }

    /// Number of entries that bought back in.
    pub fn total_rebuys(&self) -> usize {
        self.iter().filter(|entry| entry.has_rebuy).count()
    }

    /// Position handed to the next eliminated player: the current active count.
    pub fn next_elimination_position(&self) -> u32 {
        u32::try_from(self.active_count()).unwrap_or(u32::MAX)
    }

    /// The only active entry, if exactly one remains.
    pub fn sole_active(&self) -> Option<&PlayerEntry> {
        let mut active = self.iter().filter(|entry| entry.is_active());
        match (active.next(), active.next()) {
            (Some(entry), None) => Some(entry),
            _ => None,
        }
    }
}

impl FromIterator<PlayerEntry> for Roster {
    fn from_iter<T: IntoIterator<Item = PlayerEntry>>(iter: T) -> Self {
        let mut roster = Roster::new();
        roster.replace_all(iter);
        roster
    }
}

impl From<GamePhaseEntity> for GamePhase {
    fn from(value: GamePhaseEntity) -> Self {
        match value {
            GamePhaseEntity::Normal => GamePhase::Normal,
            GamePhaseEntity::FinalTable => GamePhase::FinalTable,
            GamePhaseEntity::HeadsUp => GamePhase::HeadsUp,
            GamePhaseEntity::Champion => GamePhase::Champion,
        }
    }
}

impl From<GamePhase> for GamePhaseEntity {
    fn from(value: GamePhase) -> Self {
        match value {
            GamePhase::Normal => GamePhaseEntity::Normal,
            GamePhase::FinalTable => GamePhaseEntity::FinalTable,
            GamePhase::HeadsUp => GamePhaseEntity::HeadsUp,
            GamePhase::Champion => GamePhaseEntity::Champion,
        }
    }
}

impl From<PlayerStatusEntity> for PlayerStatus {
    fn from(value: PlayerStatusEntity) -> Self {
        match value {
            PlayerStatusEntity::Active => PlayerStatus::Active,
            PlayerStatusEntity::Eliminated => PlayerStatus::Eliminated,
        }
    }
}

impl From<PlayerStatus> for PlayerStatusEntity {
    fn from(value: PlayerStatus) -> Self {
        match value {
            PlayerStatus::Active => PlayerStatusEntity::Active,
            PlayerStatus::Eliminated => PlayerStatusEntity::Eliminated,
        }
    }
}

impl From<TournamentStateEntity> for TournamentState {
    fn from(value: TournamentStateEntity) -> Self {
        Self {
            id: value.id,
            current_level: value.current_level,
            time_remaining: value.time_remaining,
            is_paused: value.is_paused,
            game_phase: value.game_phase.into(),
            champion_id: value.champion_id,
            champion_name: value.champion_name,
            buy_in_amount: value.buy_in_amount,
            event_id: value.event_id,
            tournament_name: value.tournament_name,
            season_name: value.season_name,
            event_number: value.event_number,
            total_events: value.total_events,
            reset_generation: value.reset_generation,
            updated_at: value.updated_at,
        }
    }
}

impl From<TournamentState> for TournamentStateEntity {
    fn from(value: TournamentState) -> Self {
        Self {
            id: value.id,
            current_level: value.current_level,
            time_remaining: value.time_remaining,
            is_paused: value.is_paused,
            game_phase: value.game_phase.into(),
            champion_id: value.champion_id,
            champion_name: value.champion_name,
            buy_in_amount: value.buy_in_amount,
            event_id: value.event_id,
            tournament_name: value.tournament_name,
            season_name: value.season_name,
            event_number: value.event_number,
            total_events: value.total_events,
            reset_generation: value.reset_generation,
            updated_at: value.updated_at,
        }
    }
}

impl From<PlayerEntryEntity> for PlayerEntry {
    fn from(value: PlayerEntryEntity) -> Self {
        Self {
            id: value.id,
            player_id: value.player_id,
            name: value.name,
            status: value.status.into(),
            position: value.position,
            has_rebuy: value.has_rebuy,
            created_at: value.created_at,
        }
    }
}

impl PlayerEntry {
    /// Persisted form of the entry for the given session.
    pub fn to_entity(&self, state_id: Uuid) -> PlayerEntryEntity {
        PlayerEntryEntity {
            id: self.id,
            state_id,
            player_id: self.player_id.clone(),
            name: self.name.clone(),
            status: self.status.into(),
            position: self.position,
            has_rebuy: self.has_rebuy,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn entry(name: &str, offset: u64) -> PlayerEntry {
        PlayerEntry {
            created_at: SystemTime::UNIX_EPOCH + Duration::from_secs(offset),
            ..PlayerEntry::registered(name.to_lowercase(), name)
        }
    }

    #[test]
    fn counts_follow_statuses() {
        let mut roster: Roster = (0..4).map(|i| entry(&format!("P{i}"), i)).collect();
        assert_eq!(roster.active_count(), 4);
        assert_eq!(roster.next_elimination_position(), 4);

        let id = roster.iter().next().unwrap().id;
        let first = roster.get_mut(&id).unwrap();
        first.status = PlayerStatus::Eliminated;
        first.has_rebuy = true;

        assert_eq!(roster.active_count(), 3);
        assert_eq!(roster.eliminated_count(), 1);
        assert_eq!(roster.total_rebuys(), 1);
        assert_eq!(roster.next_elimination_position(), 3);
        assert!(roster.sole_active().is_none());
    }

    #[test]
    fn reinserted_entry_keeps_registration_order() {
        let mut roster: Roster = (0..3).map(|i| entry(&format!("P{i}"), i)).collect();
        let middle = roster.iter().nth(1).unwrap().id;
        let removed = roster.remove(&middle).unwrap();
        roster.insert(removed);

        let names: Vec<_> = roster.iter().map(|entry| entry.name.as_str()).collect();
        assert_eq!(names, ["P0", "P1", "P2"]);
    }

    #[test]
    fn reset_restores_defaults_and_bumps_generation() {
        let mut state = TournamentState::fresh(Uuid::new_v4(), 720);
        assert!(state.looks_reset());
        assert!(state.is_paused);
        assert_eq!(state.buy_in_amount, DEFAULT_BUY_IN);

        state.event_id = Some("evt".into());
        state.buy_in_amount = 20_000;
        assert!(!state.looks_reset());
        state.reset(720);
        assert!(state.looks_reset());
        assert_eq!(state.buy_in_amount, 20_000);
        assert_eq!(state.reset_generation, 1);

        let patch = state.reset_patch();
        assert_eq!(patch.reset_generation, Some(1));
        assert_eq!(patch.time_remaining, Some(720));
        assert_eq!(patch.buy_in_amount, None);
    }
}
