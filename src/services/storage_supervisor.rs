use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{storage::StorageError, tournament_store::TournamentStore},
    services::sync_service,
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Reconnect to the storage backend and keep the shared state in degraded mode when it is unavailable.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn TournamentStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        let store = match connect().await {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
                continue;
            }
        };

        if let Err(err) = sync_service::attach(&state, store.clone()).await {
            warn!(error = %err, "initial session load failed");
            sleep(delay).await;
            delay = (delay * 2).min(MAX_DELAY);
            continue;
        }
        info!("storage connection established; leaving degraded mode");
        delay = INITIAL_DELAY;

        loop {
            sleep(HEALTH_POLL_INTERVAL).await;
            if store.health_check().await.is_ok() {
                continue;
            }

            let mut attempt = 0;
            let mut reconnect_delay = INITIAL_DELAY;
            let mut reconnected = false;

            while attempt < MAX_RECONNECT_ATTEMPTS {
                match store.try_reconnect().await {
                    Ok(()) => {
                        info!("storage reconnection succeeded after health check failure");
                        reconnected = true;
                        break;
                    }
                    Err(reconnect_err) => {
                        if attempt == 0 {
                            warn!(
                                attempt, error = %reconnect_err,
                                "storage reconnect first attempt failed; entering in degraded mode"
                            );
                            state.update_degraded(true);
                        } else {
                            warn!(attempt, error = %reconnect_err, "storage reconnect attempt failed");
                        };
                        attempt += 1;
                        sleep(reconnect_delay).await;
                        reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
                    }
                }
            }

            if !reconnected {
                warn!("exhausted storage reconnect attempts; staying in degraded mode");
                sync_service::detach(&state).await;
                break;
            }

            // Full fetch: anything missed while disconnected is healed here.
            if let Err(err) = sync_service::attach(&state, store.clone()).await {
                warn!(error = %err, "session reload after reconnect failed");
                sync_service::detach(&state).await;
                break;
            }
        }

        sleep(delay).await;
        delay = (delay * 2).min(MAX_DELAY);
    }
}
