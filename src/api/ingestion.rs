use super::{AppError, AppState};
use crate::event::BehaviorTreeLog;
use crate::snapshot::{now_nanos, Snapshot, TIMESTAMP_KEY};
use axum::{body::Bytes, extract::State, response::Json};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Success response for ingestion
#[derive(Serialize)]
pub(super) struct PublishResponse {
    timestamp: i64,
    entities: usize,
}

/// POST /api/log - Publish the snapshot described by a behavior-tree log
pub(super) async fn ingest_log(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PublishResponse>, AppError> {
    let log: BehaviorTreeLog = serde_json::from_slice(&body)
        .map_err(|e| AppError::ValidationError(e.to_string()))?;
    let changes = log.event_log.len();

    let snapshot = log
        .into_snapshot()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    info!(
        timestamp = snapshot.timestamp,
        changes = changes,
        entities = snapshot.statuses.len(),
        "Ingesting behavior tree log"
    );
    Ok(publish(&state, snapshot))
}

/// POST /api/snapshot - Publish a raw snapshot object.
///
/// A missing `timestamp` is stamped with the current time.
pub(super) async fn ingest_snapshot(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PublishResponse>, AppError> {
    let value: Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::ValidationError(e.to_string()))?;
    let Value::Object(mut object) = value else {
        return Err(AppError::ValidationError(
            "snapshot must be a JSON object".to_string(),
        ));
    };

    if !object.contains_key(TIMESTAMP_KEY) {
        object.insert(TIMESTAMP_KEY.to_string(), now_nanos().into());
    }
    let snapshot =
        Snapshot::from_object(&object).map_err(|e| AppError::ValidationError(e.to_string()))?;

    info!(
        timestamp = snapshot.timestamp,
        entities = snapshot.statuses.len(),
        "Ingesting snapshot"
    );
    Ok(publish(&state, snapshot))
}

fn publish(state: &AppState, snapshot: Snapshot) -> Json<PublishResponse> {
    let response = PublishResponse {
        timestamp: snapshot.timestamp,
        entities: snapshot.statuses.len(),
    };
    state.board.publish(snapshot);
    Json(response)
}
