use tokio::sync::broadcast;

use crate::dto::sse::ServerEvent;

/// SSE-specific sub-state carved out from [`AppState`](super::AppState).
pub struct SseState {
    public: SseHub,
    display: SseHub,
}

impl SseState {
    /// Build the SSE sub-tree with per-stream channel capacities.
    pub fn new(public_capacity: usize, display_capacity: usize) -> Self {
        Self {
            public: SseHub::new(public_capacity),
            display: SseHub::new(display_capacity),
        }
    }

    /// Hub carrying the public live projection.
    pub fn public(&self) -> &SseHub {
        &self.public
    }

    /// Hub carrying full snapshots, clock ticks, undo and error events.
    pub fn display(&self) -> &SseHub {
        &self.display
    }
}

/// Simple broadcast hub wrapper used by the SSE services.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}
