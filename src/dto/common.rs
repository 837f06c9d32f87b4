use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::format_system_time,
    state::{
        blinds::{BlindLevel, LevelKind},
        stats::{LiveStats, Payout},
        tournament::{GamePhase, PlayerEntry, PlayerStatus, TournamentState},
        undo::UndoEntry,
    },
};

/// Roster row as exposed over HTTP and SSE.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct PlayerSummary {
    pub id: Uuid,
    pub player_id: String,
    pub name: String,
    pub status: PlayerStatus,
    pub position: Option<u32>,
    pub has_rebuy: bool,
}

impl From<&PlayerEntry> for PlayerSummary {
    fn from(entry: &PlayerEntry) -> Self {
        Self {
            id: entry.id,
            player_id: entry.player_id.clone(),
            name: entry.name.clone(),
            status: entry.status,
            position: entry.position,
            has_rebuy: entry.has_rebuy,
        }
    }
}

/// Blind schedule entry with its display label.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct BlindLevelSummary {
    pub index: usize,
    pub kind: LevelKind,
    pub sb: Option<u32>,
    pub bb: Option<u32>,
    pub ante: Option<u32>,
    pub duration_sec: u32,
    /// `sb/bb` or `BREAK`.
    pub label: String,
}

impl From<&BlindLevel> for BlindLevelSummary {
    fn from(level: &BlindLevel) -> Self {
        Self {
            index: level.index,
            kind: level.kind,
            sb: level.sb,
            bb: level.bb,
            ante: level.ante,
            duration_sec: level.duration_sec,
            label: level.label(),
        }
    }
}

/// Full session row.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct TournamentSummary {
    pub id: Uuid,
    pub current_level: usize,
    pub time_remaining: u32,
    pub is_paused: bool,
    pub game_phase: GamePhase,
    pub champion_id: Option<String>,
    pub champion_name: Option<String>,
    pub buy_in_amount: u64,
    pub event_id: Option<String>,
    pub tournament_name: Option<String>,
    pub season_name: Option<String>,
    pub event_number: Option<u32>,
    pub total_events: Option<u32>,
    /// RFC 3339 timestamp of the last local update.
    pub updated_at: String,
}

impl From<&TournamentState> for TournamentSummary {
    fn from(state: &TournamentState) -> Self {
        Self {
            id: state.id,
            current_level: state.current_level,
            time_remaining: state.time_remaining,
            is_paused: state.is_paused,
            game_phase: state.game_phase,
            champion_id: state.champion_id.clone(),
            champion_name: state.champion_name.clone(),
            buy_in_amount: state.buy_in_amount,
            event_id: state.event_id.clone(),
            tournament_name: state.tournament_name.clone(),
            season_name: state.season_name.clone(),
            event_number: state.event_number,
            total_events: state.total_events,
            updated_at: format_system_time(state.updated_at),
        }
    }
}

/// Aggregated roster figures.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct StatsSummary {
    pub registered: usize,
    pub active: usize,
    pub eliminated: usize,
    pub rebuys: usize,
    pub total_chips: u64,
    pub average_stack: u64,
    pub prize_pool: u64,
}

impl From<LiveStats> for StatsSummary {
    fn from(stats: LiveStats) -> Self {
        Self {
            registered: stats.registered,
            active: stats.active,
            eliminated: stats.eliminated,
            rebuys: stats.rebuys,
            total_chips: stats.total_chips,
            average_stack: stats.average_stack,
            prize_pool: stats.prize_pool,
        }
    }
}

/// Prize for one finishing position.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct PayoutSummary {
    pub position: u32,
    pub percentage: u64,
    pub amount: u64,
}

impl From<Payout> for PayoutSummary {
    fn from(payout: Payout) -> Self {
        Self {
            position: payout.position,
            percentage: payout.percentage,
            amount: payout.amount,
        }
    }
}

/// Action that can still be reverted.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct UndoSummary {
    /// `eliminate`, `rebuy` or `remove`.
    pub kind: String,
    pub player_name: String,
    /// Milliseconds left before the action becomes final.
    pub expires_in_ms: u64,
}

impl From<&UndoEntry> for UndoSummary {
    fn from(entry: &UndoEntry) -> Self {
        let remaining = entry
            .expires_at
            .saturating_duration_since(tokio::time::Instant::now());
        Self {
            kind: entry.action.kind().to_string(),
            player_name: entry.action.player_name().to_string(),
            expires_in_ms: u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
        }
    }
}
