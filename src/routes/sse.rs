use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{
    services::sse_service::{self, StreamKind},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/sse/public",
    tag = "sse",
    responses((status = 200, description = "Public SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream the public projection to viewers.
pub async fn public_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let (receiver, initial) = sse_service::subscribe(&state, StreamKind::Public).await;
    info!("New public SSE connection");
    sse_service::to_sse_stream(receiver, initial, StreamKind::Public)
}

#[utoipa::path(
    get,
    path = "/sse/display",
    tag = "sse",
    responses((status = 200, description = "Display SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream snapshots, clock ticks, undo and error events to the display and operator console.
pub async fn display_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let (receiver, initial) = sse_service::subscribe(&state, StreamKind::Display).await;
    info!("New display SSE connection");
    sse_service::to_sse_stream(receiver, initial, StreamKind::Display)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sse/public", get(public_stream))
        .route("/sse/display", get(display_stream))
}
