//! Server-Sent Events (SSE) utilities
//!
//! Bridges the async side of the [`SelectionBus`] onto an SSE response.

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::events::{BusEvent, SelectionBus, Topic};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Convert a bus event into an SSE event named after its topic
pub fn to_sse_event(event: &BusEvent) -> Option<Event> {
    let topic = event.topic();
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().event(topic.as_str()).data(json)),
        Err(e) => {
            warn!("SSE: Failed to serialize event {}: {}", topic, e);
            None
        }
    }
}

/// Create an SSE stream forwarding bus events
///
/// `topics` filters the forwarded events; an empty slice forwards everything.
/// Lagging clients skip the dropped events and keep streaming.
///
/// # Example
/// ```rust,ignore
/// pub async fn event_stream(
///     State(state): State<AppState>,
/// ) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
///     esg_common::sse::bus_event_stream(&state.bus, &[])
/// }
/// ```
pub fn bus_event_stream(
    bus: &SelectionBus,
    topics: &[Topic],
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to bus events");

    let mut rx = bus.stream();
    let topics = topics.to_vec();

    let stream = async_stream::stream! {
        // Send initial connected status
        yield Ok(Event::default().event("ConnectionStatus").data("connected"));

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if !topics.is_empty() && !topics.contains(&event.topic()) {
                        continue;
                    }
                    debug!("SSE: Forwarding bus event: {}", event.topic());
                    if let Some(sse_event) = to_sse_event(&event) {
                        yield Ok(sse_event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("SSE: Client lagged, {} events skipped", skipped);
                }
                Err(RecvError::Closed) => {
                    info!("SSE: Bus closed, ending stream");
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}
