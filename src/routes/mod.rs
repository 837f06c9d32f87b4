use axum::Router;

use crate::{config::ProcessRole, state::SharedState};

pub mod display;
pub mod docs;
pub mod health;
pub mod operator;
pub mod public;
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
///
/// Operator commands are only mounted on the operator process.
pub fn router(state: SharedState) -> Router<()> {
    let mut api_router = health::router()
        .merge(sse::router())
        .merge(public::router())
        .merge(display::router());

    if state.config().role() == ProcessRole::Operator {
        api_router = api_router.merge(operator::router());
    }

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
