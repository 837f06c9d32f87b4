use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Persisted competitive phase of a tournament.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GamePhaseEntity {
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

/// Persisted status of a roster entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatusEntity {
    /// Still in the tournament.
    #[default]
    Active,
    /// Knocked out.
    Eliminated,
}

/// The single live row of a venue-session, as stored by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TournamentStateEntity {
    /// Primary key of the session row.
    pub id: Uuid,
    /// Index into the blind schedule.
    pub current_level: usize,
    /// Seconds left in the current level, as last pushed.
    pub time_remaining: u32,
    /// Whether the clock is stopped.
    pub is_paused: bool,
    /// Phase derived from the roster.
    pub game_phase: GamePhaseEntity,
    /// Registry id of the champion once captured.
    pub champion_id: Option<String>,
    /// Display name of the champion once captured.
    pub champion_name: Option<String>,
    /// Buy-in amount used for the prize pool.
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
    /// Bumped by every reset; rows written before the column existed read as 0.
    #[serde(default)]
    pub reset_generation: u64,
    /// Last time the row was written.
    pub updated_at: SystemTime,
}

/// One roster row belonging to a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntryEntity {
    /// Primary key of the entry.
    pub id: Uuid,
    /// Session the entry belongs to.
    pub state_id: Uuid,
    /// Reference into the external player registry.
    pub player_id: String,
    /// Name shown on screens.
    pub name: String,
    /// Active or eliminated.
    pub status: PlayerStatusEntity,
    /// Finishing position, assigned at elimination.
    pub position: Option<u32>,
    /// Whether the player bought back in.
    pub has_rebuy: bool,
    /// Insertion time, used to keep registration order.
    pub created_at: SystemTime,
}

/// Partial update of a [`TournamentStateEntity`].
///
/// Outer `None` leaves the column untouched; for nullable columns `Some(None)` clears it.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatePatch {
    pub current_level: Option<usize>,
    pub time_remaining: Option<u32>,
    pub is_paused: Option<bool>,
    pub game_phase: Option<GamePhaseEntity>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub champion_id: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub champion_name: Option<Option<String>>,
    pub buy_in_amount: Option<u64>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub event_id: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub tournament_name: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub season_name: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub event_number: Option<Option<u32>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub total_events: Option<Option<u32>>,
    pub reset_generation: Option<u64>,
}

impl StatePatch {
    /// True when the patch would not change any column.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Overlay the patch on top of `entity`, bumping `updated_at`.
    pub fn apply_to(&self, entity: &mut TournamentStateEntity) {
        if let Some(level) = self.current_level {
            entity.current_level = level;
        }
        if let Some(time_remaining) = self.time_remaining {
            entity.time_remaining = time_remaining;
        }
        if let Some(paused) = self.is_paused {
            entity.is_paused = paused;
        }
        if let Some(phase) = self.game_phase {
            entity.game_phase = phase;
        }
        if let Some(champion_id) = &self.champion_id {
            entity.champion_id = champion_id.clone();
        }
        if let Some(champion_name) = &self.champion_name {
            entity.champion_name = champion_name.clone();
        }
        if let Some(buy_in) = self.buy_in_amount {
            entity.buy_in_amount = buy_in;
        }
        if let Some(event_id) = &self.event_id {
            entity.event_id = event_id.clone();
        }
        if let Some(name) = &self.tournament_name {
            entity.tournament_name = name.clone();
        }
        if let Some(name) = &self.season_name {
            entity.season_name = name.clone();
        }
        if let Some(number) = self.event_number {
            entity.event_number = number;
        }
        if let Some(total) = self.total_events {
            entity.total_events = total;
        }
        if let Some(generation) = self.reset_generation {
            entity.reset_generation = generation;
        }
        entity.updated_at = SystemTime::now();
    }
}

/// Partial update of a [`PlayerEntryEntity`].
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerPatch {
    pub status: Option<PlayerStatusEntity>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub position: Option<Option<u32>>,
    pub has_rebuy: Option<bool>,
}

impl PlayerPatch {
    /// Overlay the patch on top of `entity`.
    pub fn apply_to(&self, entity: &mut PlayerEntryEntity) {
        if let Some(status) = self.status {
            entity.status = status;
        }
        if let Some(position) = self.position {
            entity.position = position;
        }
        if let Some(has_rebuy) = self.has_rebuy {
            entity.has_rebuy = has_rebuy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_state() -> TournamentStateEntity {
        TournamentStateEntity {
            id: Uuid::new_v4(),
            current_level: 3,
            time_remaining: 400,
            is_paused: false,
            game_phase: GamePhaseEntity::Normal,
            champion_id: None,
            champion_name: None,
            buy_in_amount: 10_000,
            event_id: Some("evt-1".into()),
            tournament_name: None,
            season_name: None,
            event_number: None,
            total_events: None,
            reset_generation: 0,
            updated_at: SystemTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn patch_serializes_only_touched_columns() {
        let patch = StatePatch {
            time_remaining: Some(245),
            event_id: Some(None),
            ..StatePatch::default()
        };
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, json!({ "time_remaining": 245, "event_id": null }));
    }

    #[test]
    fn patch_clears_nullable_columns_only_when_asked() {
        let mut entity = sample_state();
        StatePatch {
            champion_id: Some(Some("p-9".into())),
            ..StatePatch::default()
        }
        .apply_to(&mut entity);
        assert_eq!(entity.event_id.as_deref(), Some("evt-1"));
        assert_eq!(entity.champion_id.as_deref(), Some("p-9"));

        StatePatch {
            event_id: Some(None),
            ..StatePatch::default()
        }
        .apply_to(&mut entity);
        assert!(entity.event_id.is_none());
        assert_eq!(entity.current_level, 3);
        assert!(entity.updated_at > SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(StatePatch::default().is_empty());
        assert!(
            !StatePatch {
                is_paused: Some(true),
                ..StatePatch::default()
            }
            .is_empty()
        );
    }
}
