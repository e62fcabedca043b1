use std::convert::Infallible;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::sse::{self, KeepAlive, Sse};
use futures::{Stream, StreamExt};

use crate::core::{Ack, Status};
use crate::events::Event;
use crate::simulation::SimulationRequest;

use super::AppState;
use super::response::ApiError;

pub(super) async fn status(State(state): State<AppState>) -> Json<Status> {
    Json(state.sup.status().await)
}

pub(super) async fn start(
    State(state): State<AppState>,
    body: Result<Json<SimulationRequest>, JsonRejection>,
) -> Result<Json<Ack>, ApiError> {
    let Json(req) = body?;
    let ack = state.sup.start(req).await?;
    Ok(Json(ack))
}

pub(super) async fn stop(State(state): State<AppState>) -> Result<Json<Ack>, ApiError> {
    let ack = state.sup.stop().await?;
    Ok(Json(ack))
}

/// Opens an event stream; it ends when the observer disconnects or the gateway shuts down.
pub(super) async fn stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<sse::Event, Infallible>>> {
    let sub = state.sup.subscribe();
    tracing::debug!(subscriber = %sub.id(), "event stream opened");

    let frames = sub.map(|ev| Ok::<_, Infallible>(frame(&ev)));
    Sse::new(frames).keep_alive(KeepAlive::new().interval(state.keep_alive))
}

/// One SSE frame: `id` is the event sequence number, `data` its JSON form.
fn frame(ev: &Event) -> sse::Event {
    sse::Event::default().id(ev.seq.to_string()).data(ev.to_json())
}
