use axum::{Json, Router, extract::State, routing::get};

use crate::{dto::public::PublicLiveResponse, services::public_service, state::SharedState};

/// Public read-only endpoints.
pub fn router() -> Router<SharedState> {
    Router::new().route("/public/live", get(get_live))
}

#[utoipa::path(
    get,
    path = "/public/live",
    tag = "public",
    responses((status = 200, description = "Live projection of the running event", body = PublicLiveResponse))
)]
/// Return the public projection; only `is_live` is set while paused or crowned.
pub async fn get_live(State(state): State<SharedState>) -> Json<PublicLiveResponse> {
    Json(public_service::live(&state).await)
}
