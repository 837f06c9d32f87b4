use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::{common::UndoSummary, public::PublicLiveResponse};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream (`public` or `display`).
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Public projection pushed whenever it may have changed.
pub struct LiveEvent(pub PublicLiveResponse);

#[derive(Debug, Serialize, ToSchema)]
/// Pushed once per second to display streams while the clock runs.
pub struct ClockTickEvent {
    pub current_level: usize,
    pub time_remaining: u32,
    pub is_paused: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Pushed to display streams when the undo slot changes. `undo` is absent once cleared.
pub struct UndoChangedEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub undo: Option<UndoSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Pushed to display streams when a store write failed.
pub struct ErrorEvent {
    pub message: String,
}
