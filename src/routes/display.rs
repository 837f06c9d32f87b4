use axum::{Json, Router, extract::State, routing::get};

use crate::{dto::display::DisplayStateResponse, services::display_service, state::SharedState};

/// Snapshot endpoints for the countdown display and the operator console.
pub fn router() -> Router<SharedState> {
    Router::new().route("/display/state", get(get_state))
}

#[utoipa::path(
    get,
    path = "/display/state",
    tag = "display",
    responses((status = 200, description = "Full session snapshot", body = DisplayStateResponse))
)]
/// Return the session, blind levels, roster, stats and prize pool.
pub async fn get_state(State(state): State<SharedState>) -> Json<DisplayStateResponse> {
    Json(display_service::display_state(&state).await)
}
