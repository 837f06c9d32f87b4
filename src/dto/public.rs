use serde::Serialize;
use utoipa::ToSchema;

use crate::state::tournament::GamePhase;

/// Public projection of the running event.
///
/// Only `is_live` is present while the clock is paused or a champion is crowned.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct PublicLiveResponse {
    pub is_live: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_players: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_players: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_level: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_paused: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_phase: Option<GamePhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season_name: Option<String>,
}

impl PublicLiveResponse {
    /// Projection emitted when nothing is being played.
    pub fn offline() -> Self {
        Self {
            is_live: false,
            active_players: None,
            total_players: None,
            current_level: None,
            time_remaining: None,
            is_paused: None,
            game_phase: None,
            event_number: None,
            season_name: None,
        }
    }
}
