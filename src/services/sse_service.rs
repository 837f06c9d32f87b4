use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

use crate::{
    dto::sse::{Handshake, ServerEvent},
    services::{
        display_service, public_service,
        sse_events::{EVENT_HANDSHAKE, EVENT_LIVE, EVENT_STATE},
    },
    state::SharedState,
};

/// Identifies the target SSE stream for logging once the connection is torn down.
#[derive(Clone, Copy, Debug)]
pub enum StreamKind {
    Public,
    Display,
}

impl StreamKind {
    fn name(self) -> &'static str {
        match self {
            StreamKind::Public => "public",
            StreamKind::Display => "display",
        }
    }
}

/// Subscribe to `kind` and build the events a new client receives before live traffic.
pub async fn subscribe(
    state: &SharedState,
    kind: StreamKind,
) -> (broadcast::Receiver<ServerEvent>, Vec<ServerEvent>) {
    let receiver = match kind {
        StreamKind::Public => state.public_sse().subscribe(),
        StreamKind::Display => state.display_sse().subscribe(),
    };

    let handshake = Handshake {
        stream: kind.name().to_string(),
        message: format!("{} stream connected", kind.name()),
        degraded: state.is_degraded(),
    };
    let snapshot = match kind {
        StreamKind::Public => {
            ServerEvent::json(Some(EVENT_LIVE.to_string()), &public_service::live(state).await)
        }
        StreamKind::Display => ServerEvent::json(
            Some(EVENT_STATE.to_string()),
            &display_service::display_state(state).await,
        ),
    };

    let mut initial = Vec::with_capacity(2);
    for event in [
        ServerEvent::json(Some(EVENT_HANDSHAKE.to_string()), &handshake),
        snapshot,
    ] {
        match event {
            Ok(event) => initial.push(event),
            Err(err) => {
                warn!(stream = kind.name(), error = %err, "failed to serialize initial SSE event")
            }
        }
    }

    (receiver, initial)
}

/// Convert a broadcast receiver into an SSE response, replaying `initial` first and
/// forwarding events until the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    initial: Vec<ServerEvent>,
    kind: StreamKind,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        for payload in initial {
            if tx.send(Ok(to_event(payload))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            // The next snapshot supersedes whatever was skipped.
                            tracing::debug!(stream = kind.name(), skipped, "SSE subscriber lagged");
                            continue;
                        }
                    }
                }
            }
        }

        tracing::info!(stream = kind.name(), "SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}
