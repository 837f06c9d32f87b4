//! Boundary decoding of change-feed payloads.
//!
//! Rows arrive as loosely typed JSON. Every column is decoded on its own so a
//! malformed or missing value falls back to the local one instead of clearing it.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{
    dao::{models::PlayerEntryEntity, tournament_store::StoreChange},
    state::tournament::{GamePhase, PlayerEntry, TournamentState},
};

/// One decoded column of an incoming row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Field<T> {
    /// Column missing or malformed.
    #[default]
    Absent,
    /// Column explicitly null.
    Null,
    /// Column carries a value.
    Value(T),
}

impl<T: Clone> Field<T> {
    /// Value for a non-nullable column: anything but a value keeps `local`.
    pub fn or_keep(&self, local: T) -> T {
        match self {
            Field::Value(value) => value.clone(),
            Field::Absent | Field::Null => local,
        }
    }

    /// Value for a nullable column: only an absent column keeps `local`.
    pub fn or_keep_nullable(&self, local: Option<T>) -> Option<T> {
        match self {
            Field::Value(value) => Some(value.clone()),
            Field::Null => None,
            Field::Absent => local,
        }
    }
}

/// Decoded state row notification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateChange {
    pub current_level: Field<usize>,
    pub time_remaining: Field<u32>,
    pub is_paused: Field<bool>,
    pub game_phase: Field<GamePhase>,
    pub champion_id: Field<String>,
    pub champion_name: Field<String>,
    pub buy_in_amount: Field<u64>,
    pub event_id: Field<String>,
    pub tournament_name: Field<String>,
    pub season_name: Field<String>,
    pub event_number: Field<u32>,
    pub total_events: Field<u32>,
    pub reset_generation: Field<u64>,
}

impl StateChange {
    /// Decode a raw row, column by column.
    pub fn decode(raw: &Map<String, Value>) -> Self {
        Self {
            current_level: decode_field(raw, "current_level"),
            time_remaining: decode_field(raw, "time_remaining"),
            is_paused: decode_field(raw, "is_paused"),
            game_phase: decode_field(raw, "game_phase"),
            champion_id: decode_field(raw, "champion_id"),
            champion_name: decode_field(raw, "champion_name"),
            buy_in_amount: decode_field(raw, "buy_in_amount"),
            event_id: decode_field(raw, "event_id"),
            tournament_name: decode_field(raw, "tournament_name"),
            season_name: decode_field(raw, "season_name"),
            event_number: decode_field(raw, "event_number"),
            total_events: decode_field(raw, "total_events"),
            reset_generation: decode_field(raw, "reset_generation"),
        }
    }

    /// Incoming row with every unusable column replaced by its local value.
    pub fn coalesce(&self, local: &TournamentState) -> TournamentState {
        TournamentState {
            id: local.id,
            current_level: self.current_level.or_keep(local.current_level),
            time_remaining: self.time_remaining.or_keep(local.time_remaining),
            is_paused: self.is_paused.or_keep(local.is_paused),
            game_phase: self.game_phase.or_keep(local.game_phase),
            champion_id: self
                .champion_id
                .or_keep_nullable(local.champion_id.clone()),
            champion_name: self
                .champion_name
                .or_keep_nullable(local.champion_name.clone()),
            buy_in_amount: self.buy_in_amount.or_keep(local.buy_in_amount),
            event_id: self.event_id.or_keep_nullable(local.event_id.clone()),
            tournament_name: self
                .tournament_name
                .or_keep_nullable(local.tournament_name.clone()),
            season_name: self
                .season_name
                .or_keep_nullable(local.season_name.clone()),
            event_number: self.event_number.or_keep_nullable(local.event_number),
            total_events: self.total_events.or_keep_nullable(local.total_events),
            reset_generation: self.reset_generation.or_keep(local.reset_generation),
            updated_at: local.updated_at,
        }
    }
}

/// One notification from the store, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// The session row changed.
    State(StateChange),
    /// Full roster snapshot after any row change.
    Roster(Vec<PlayerEntry>),
}

impl From<StoreChange> for ChangeEvent {
    fn from(change: StoreChange) -> Self {
        match change {
            StoreChange::State(raw) => ChangeEvent::State(StateChange::decode(&raw)),
            StoreChange::Roster(rows) => ChangeEvent::Roster(decode_roster(rows)),
        }
    }
}

/// Decode roster rows, skipping the ones that cannot be read.
pub fn decode_roster(rows: Vec<Value>) -> Vec<PlayerEntry> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value::<PlayerEntryEntity>(row) {
            Ok(entity) => Some(entity.into()),
            Err(err) => {
                warn!(error = %err, "skipping malformed roster row");
                None
            }
        })
        .collect()
}

fn decode_field<T: DeserializeOwned>(raw: &Map<String, Value>, key: &'static str) -> Field<T> {
    match raw.get(key) {
        None => {
            debug!(field = key, "column absent from change payload");
            Field::Absent
        }
        Some(Value::Null) => Field::Null,
        Some(value) => match T::deserialize(value) {
            Ok(decoded) => Field::Value(decoded),
            Err(err) => {
                warn!(field = key, error = %err, "malformed column in change payload; keeping local value");
                Field::Absent
            }
        },
    }
}
