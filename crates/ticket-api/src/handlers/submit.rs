//! /{queue}/{object_type} handler — accepts work for asynchronous processing.

use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use ticket_core::AcceptError;

use super::ApiState;

#[derive(Deserialize)]
pub struct SubmitParams {
    /// Caller's estimate of processing time in seconds. Feeds Retry-After.
    pub estimated_secs: Option<u64>,
}

#[derive(Serialize)]
pub struct SubmitResponse {
    pub operation_id: String,
    pub status_location: String,
    pub retry_after_secs: u64,
}

pub async fn handle_submit(
    State(state): State<ApiState>,
    Path((queue, object_type)): Path<(String, String)>,
    Query(params): Query<SubmitParams>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Response, (StatusCode, String)> {
    if queue != state.queue_name {
        return Err((StatusCode::NOT_FOUND, format!("unknown queue \"{queue}\"")));
    }

    let estimated = params.estimated_secs.map(Duration::from_secs);
    let accepted = state
        .acceptance
        .accept(&object_type, payload, estimated)
        .await
        .map_err(|e| match e {
            AcceptError::ValidationFailed(_) => (StatusCode::BAD_REQUEST, e.to_string()),
            AcceptError::QueueUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
            AcceptError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        })?;

    let retry_after_secs = accepted.retry_after.as_secs();
    let body = Json(SubmitResponse {
        operation_id: accepted.operation_id.to_string(),
        status_location: accepted.status_location.clone(),
        retry_after_secs,
    });

    Ok((
        StatusCode::ACCEPTED,
        [
            (header::LOCATION, accepted.status_location),
            (header::RETRY_AFTER, retry_after_secs.to_string()),
        ],
        body,
    )
        .into_response())
}
