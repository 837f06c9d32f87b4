use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the live tournament backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::public::get_live,
        crate::routes::display::get_state,
        crate::routes::sse::public_stream,
        crate::routes::sse::display_stream,
        crate::routes::operator::play,
        crate::routes::operator::pause,
        crate::routes::operator::next_level,
        crate::routes::operator::prev_level,
        crate::routes::operator::add_player,
        crate::routes::operator::remove_player,
        crate::routes::operator::eliminate_player,
        crate::routes::operator::add_rebuy,
        crate::routes::operator::revert_elimination,
        crate::routes::operator::revert_rebuy,
        crate::routes::operator::reset_tournament,
        crate::routes::operator::set_tournament_info,
        crate::routes::operator::set_buy_in,
        crate::routes::operator::undo,
        crate::routes::operator::import_roster,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::public::PublicLiveResponse,
            crate::dto::display::DisplayStateResponse,
            crate::dto::operator::ActionResponse,
            crate::dto::operator::PlayerCreatedResponse,
            crate::dto::operator::AddPlayerRequest,
            crate::dto::operator::EliminateRequest,
            crate::dto::operator::TournamentInfoRequest,
            crate::dto::operator::BuyInRequest,
            crate::dto::import::RosterImportRequest,
            crate::dto::import::RosterImportResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::LiveEvent,
            crate::dto::sse::ClockTickEvent,
            crate::dto::sse::UndoChangedEvent,
            crate::dto::sse::ErrorEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "public", description = "Public read-only projection"),
        (name = "display", description = "Countdown display snapshot"),
        (name = "operator", description = "Operator console commands"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
