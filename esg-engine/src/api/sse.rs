//! Server-Sent Events stream of bus events

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

use crate::AppState;

/// GET /events
///
/// Streams every bus event; the SSE `event:` field is the topic name
/// (`parameters-changed`, `fetch-progress`, `report-ready`, ...).
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    esg_common::sse::bus_event_stream(state.engine.bus(), &[])
}
