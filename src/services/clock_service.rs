//! 1 Hz countdown loop.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::{
    services::sse_events,
    state::{SharedState, clock::TickOutcome},
};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Drive the local clock forever; every process runs one.
pub async fn run(state: SharedState) {
    let mut ticker = interval(TICK_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately.
    ticker.tick().await;

    info!(
        authority = state.config().clock_authority(),
        "clock loop started"
    );
    loop {
        ticker.tick().await;
        tick(&state).await;
    }
}

/// Count one second down and, on the clock authority, persist what the tick produced.
pub async fn tick(state: &SharedState) -> TickOutcome {
    let (outcome, state_id) = {
        let mut session = state.session().await;
        let session = &mut *session;
        let outcome = session.clock.tick(
            &mut session.tournament,
            state.config().schedule(),
            Instant::now(),
        );
        match &outcome {
            TickOutcome::Idle => {}
            TickOutcome::Counted { .. } => sse_events::broadcast_tick(state, session),
            TickOutcome::Advanced { .. } | TickOutcome::Finished { .. } => {
                sse_events::broadcast_session(state, session)
            }
        }
        (outcome, session.tournament.id)
    };

    match &outcome {
        TickOutcome::Advanced { patch } => {
            info!(level = ?patch.current_level, "level time elapsed; advancing")
        }
        TickOutcome::Finished { .. } => info!("last level elapsed; clock stopped"),
        _ => {}
    }

    if !state.config().clock_authority() {
        return outcome;
    }
    let Some(patch) = outcome.clone().into_patch() else {
        return outcome;
    };
    let Some(store) = state.store().await else {
        debug!("skipping clock write in degraded mode");
        return outcome;
    };
    if let Err(err) = store.write_partial(state_id, patch).await {
        warn!(error = %err, "clock write failed");
    }
    outcome
}
