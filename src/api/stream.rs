//! SSE streaming endpoint for real-time job updates

use axum::{
    extract::State as AxumState,
    response::sse::{Event, KeepAlive, Sse},
};
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use crate::SharedState;

/// GET /api/stream/jobs - SSE stream of queued jobs
pub async fn stream_jobs(
    AxumState(state): AxumState<SharedState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.job_store.subscribe();
    let stream = BroadcastStream::new(rx);

    let event_stream = stream.filter_map(|result| match result {
        Ok(event) => {
            let data = serde_json::to_string(&event).unwrap_or_default();
            Some(Ok(Event::default().event(&event.event_type).data(data)))
        }
        Err(_) => None, // Skip lagged messages
    });

    Sse::new(event_stream).keep_alive(KeepAlive::default())
}
