use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::common::{
    BlindLevelSummary, PayoutSummary, PlayerSummary, StatsSummary, TournamentSummary, UndoSummary,
};

/// Everything the countdown display and the operator console render.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct DisplayStateResponse {
    pub tournament: TournamentSummary,
    pub current_level: Option<BlindLevelSummary>,
    pub next_level: Option<BlindLevelSummary>,
    /// Next entry that is not a break.
    pub next_playable_level: Option<BlindLevelSummary>,
    /// Playable levels in the schedule, breaks excluded.
    pub total_levels: usize,
    pub players: Vec<PlayerSummary>,
    pub stats: StatsSummary,
    pub prizes: Vec<PayoutSummary>,
    /// Present while an operator action can still be reverted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub undo: Option<UndoSummary>,
    /// True when the backend runs without a store connection.
    pub degraded: bool,
}
