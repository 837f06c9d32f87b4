//! Live tournament binary entrypoint wiring REST, SSE, the clock loop and the store supervisor.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use live_tournament::{
    config::AppConfig,
    dao::{
        storage::StorageError,
        tournament_store::{TournamentStore, memory::MemoryTournamentStore},
    },
    routes,
    services::{clock_service, sse_events, storage_supervisor},
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = AppState::new(config);

    tokio::spawn(sse_events::forward_degraded(app_state.clone()));
    tokio::spawn(clock_service::run(app_state.clone()));
    spawn_storage_supervisor(app_state.clone());

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Pick the backend: CouchDB when `COUCH_BASE_URL` is set, the in-process store otherwise.
fn spawn_storage_supervisor(state: SharedState) {
    if env::var_os("COUCH_BASE_URL").is_some() && spawn_couch_supervisor(&state) {
        return;
    }

    info!("using the in-process tournament store");
    let store = MemoryTournamentStore::new();
    tokio::spawn(storage_supervisor::run(state, move || {
        let store = store.clone();
        async move { Ok::<_, StorageError>(Arc::new(store) as Arc<dyn TournamentStore>) }
    }));
}

#[cfg(feature = "couch-store")]
fn spawn_couch_supervisor(state: &SharedState) -> bool {
    use live_tournament::dao::tournament_store::couchdb::{CouchConfig, CouchTournamentStore};

    info!("using CouchDB tournament store");
    tokio::spawn(storage_supervisor::run(state.clone(), || async {
        let config = CouchConfig::from_env().map_err(StorageError::from)?;
        let store = CouchTournamentStore::connect(config)
            .await
            .map_err(StorageError::from)?;
        Ok::<_, StorageError>(Arc::new(store) as Arc<dyn TournamentStore>)
    }));
    true
}

#[cfg(not(feature = "couch-store"))]
fn spawn_couch_supervisor(_state: &SharedState) -> bool {
    tracing::warn!("COUCH_BASE_URL is set but the couch-store feature is disabled");
    false
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
