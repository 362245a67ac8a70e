use super::AppState;
use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_stream::{wrappers::IntervalStream, StreamExt};
use tracing::info;

/// GET /msg - Never-ending status stream.
///
/// Every tick the latest snapshot (if any) is appended to the response as
/// compact JSON, with no separator between snapshots. Clients keep only the
/// newest complete one.
pub(super) async fn status_stream(State(state): State<Arc<AppState>>) -> Response {
    info!(
        emit_interval_ms = state.emit_interval.as_millis() as u64,
        "Status stream opened"
    );

    let mut ticker = interval(state.emit_interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let board = Arc::clone(&state.board);
    let chunks = IntervalStream::new(ticker).filter_map(move |_| {
        board
            .latest()
            .map(|snapshot| Ok::<_, Infallible>(snapshot.to_wire()))
    });

    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(chunks),
    )
        .into_response()
}
