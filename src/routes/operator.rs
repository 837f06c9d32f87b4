//! Operator console commands. Mounted only on the operator process.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        import::{RosterImportRequest, RosterImportResponse},
        operator::{
            ActionResponse, AddPlayerRequest, BuyInRequest, EliminateRequest,
            PlayerCreatedResponse, TournamentInfoRequest,
        },
    },
    error::AppError,
    services::{command_service, import_service, undo_service},
    state::SharedState,
};

/// Configure the operator routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/operator/play", post(play))
        .route("/operator/pause", post(pause))
        .route("/operator/next-level", post(next_level))
        .route("/operator/prev-level", post(prev_level))
        .route("/operator/players", post(add_player))
        .route("/operator/players/{id}/remove", post(remove_player))
        .route("/operator/players/{id}/eliminate", post(eliminate_player))
        .route("/operator/players/{id}/rebuy", post(add_rebuy))
        .route(
            "/operator/players/{id}/revert-elimination",
            post(revert_elimination),
        )
        .route("/operator/players/{id}/revert-rebuy", post(revert_rebuy))
        .route("/operator/reset", post(reset_tournament))
        .route("/operator/info", post(set_tournament_info))
        .route("/operator/buy-in", post(set_buy_in))
        .route("/operator/undo", post(undo))
        .route("/operator/import", post(import_roster))
}

#[utoipa::path(
    post,
    path = "/operator/play",
    tag = "operator",
    responses(
        (status = 200, description = "Clock running", body = ActionResponse),
        (status = 503, description = "Store unavailable")
    )
)]
/// Start or resume the clock.
pub async fn play(State(state): State<SharedState>) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(command_service::play(&state).await?))
}

#[utoipa::path(
    post,
    path = "/operator/pause",
    tag = "operator",
    responses(
        (status = 200, description = "Clock paused", body = ActionResponse),
        (status = 503, description = "Store unavailable")
    )
)]
/// Stop the clock.
pub async fn pause(State(state): State<SharedState>) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(command_service::pause(&state).await?))
}

#[utoipa::path(
    post,
    path = "/operator/next-level",
    tag = "operator",
    responses((status = 200, description = "Level changed", body = ActionResponse))
)]
/// Jump to the next blind entry at its full duration.
pub async fn next_level(
    State(state): State<SharedState>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(command_service::next_level(&state).await?))
}

#[utoipa::path(
    post,
    path = "/operator/prev-level",
    tag = "operator",
    responses((status = 200, description = "Level changed", body = ActionResponse))
)]
/// Jump to the previous blind entry at its full duration.
pub async fn prev_level(
    State(state): State<SharedState>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(command_service::prev_level(&state).await?))
}

#[utoipa::path(
    post,
    path = "/operator/players",
    tag = "operator",
    request_body = AddPlayerRequest,
    responses(
        (status = 200, description = "Player registered", body = PlayerCreatedResponse),
        (status = 400, description = "Invalid payload")
    )
)]
/// Register a player for the running event.
pub async fn add_player(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<AddPlayerRequest>>,
) -> Result<Json<PlayerCreatedResponse>, AppError> {
    let created = command_service::add_player(&state, payload.player_id, payload.name).await?;
    Ok(Json(created))
}

#[utoipa::path(
    post,
    path = "/operator/players/{id}/remove",
    tag = "operator",
    params(("id" = Uuid, Path, description = "Roster entry identifier")),
    responses((status = 200, description = "Player removed", body = ActionResponse))
)]
/// Delete an entry; reversible through `/operator/undo`.
pub async fn remove_player(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(command_service::remove_player(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/operator/players/{id}/eliminate",
    tag = "operator",
    params(("id" = Uuid, Path, description = "Roster entry identifier")),
    request_body = EliminateRequest,
    responses(
        (status = 200, description = "Player eliminated", body = ActionResponse),
        (status = 400, description = "Position out of range or taken")
    )
)]
/// Eliminate a player; without a position the next free one is used.
pub async fn eliminate_player(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<EliminateRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = command_service::eliminate_player(&state, id, payload.position).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/operator/players/{id}/rebuy",
    tag = "operator",
    params(("id" = Uuid, Path, description = "Roster entry identifier")),
    responses((status = 200, description = "Rebuy recorded", body = ActionResponse))
)]
/// Record a rebuy.
pub async fn add_rebuy(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(command_service::add_rebuy(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/operator/players/{id}/revert-elimination",
    tag = "operator",
    params(("id" = Uuid, Path, description = "Roster entry identifier")),
    responses((status = 200, description = "Elimination reverted", body = ActionResponse))
)]
/// Put an eliminated player back in play.
pub async fn revert_elimination(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(command_service::revert_elimination(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/operator/players/{id}/revert-rebuy",
    tag = "operator",
    params(("id" = Uuid, Path, description = "Roster entry identifier")),
    responses((status = 200, description = "Rebuy reverted", body = ActionResponse))
)]
/// Remove a rebuy mark.
pub async fn revert_rebuy(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(command_service::revert_rebuy(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/operator/reset",
    tag = "operator",
    responses((status = 200, description = "Tournament reset", body = ActionResponse))
)]
/// Delete the roster and restore the default session row.
pub async fn reset_tournament(
    State(state): State<SharedState>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(command_service::reset_tournament(&state).await?))
}

#[utoipa::path(
    post,
    path = "/operator/info",
    tag = "operator",
    request_body = TournamentInfoRequest,
    responses((status = 200, description = "Metadata updated", body = ActionResponse))
)]
/// Update event metadata; absent fields are kept, `null` clears.
pub async fn set_tournament_info(
    State(state): State<SharedState>,
    Json(payload): Json<TournamentInfoRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(
        command_service::set_tournament_info(&state, payload).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/operator/buy-in",
    tag = "operator",
    request_body = BuyInRequest,
    responses(
        (status = 200, description = "Buy-in updated", body = ActionResponse),
        (status = 400, description = "Invalid amount")
    )
)]
/// Change the buy-in used for the prize pool.
pub async fn set_buy_in(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<BuyInRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(command_service::set_buy_in(&state, payload.amount).await?))
}

#[utoipa::path(
    post,
    path = "/operator/undo",
    tag = "operator",
    responses((status = 200, description = "Pending action reverted, or nothing to undo", body = ActionResponse))
)]
/// Revert the last eliminate, rebuy or remove while its window is open.
pub async fn undo(State(state): State<SharedState>) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(undo_service::fire(&state).await?))
}

#[utoipa::path(
    post,
    path = "/operator/import",
    tag = "operator",
    request_body = RosterImportRequest,
    responses(
        (status = 200, description = "Roster imported", body = RosterImportResponse),
        (status = 400, description = "Invalid payload")
    )
)]
/// Register a roster already matched against the player registry.
pub async fn import_roster(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<RosterImportRequest>>,
) -> Result<Json<RosterImportResponse>, AppError> {
    Ok(Json(import_service::import_roster(&state, payload).await?))
}
