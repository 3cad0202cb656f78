//! /status/{operation_id} handler — the poll endpoint.
//!
//! Translates the resolver's outcome into HTTP: 202 while pending, 302 or
//! 200 on success depending on onComplete, 422 on a persisted failure, 404
//! when a synchronous wait runs out of schedule.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use ticket_services::{OnComplete, OnPending, ResolvedStatus};

use super::{parse_operation_id, ApiState};

#[derive(Deserialize)]
pub struct StatusParams {
    #[serde(rename = "onComplete")]
    pub on_complete: Option<String>,
    #[serde(rename = "onPending")]
    pub on_pending: Option<String>,
}

pub async fn handle_status(
    State(state): State<ApiState>,
    Path(operation_id): Path<String>,
    Query(params): Query<StatusParams>,
) -> Result<Response, (StatusCode, String)> {
    let id = parse_operation_id(&operation_id)?;

    // Closed-variant parse: unrecognized text is a 400, never a default.
    let on_complete = match params.on_complete.as_deref() {
        Some(s) => s
            .parse::<OnComplete>()
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("onComplete: {e}")))?,
        None => OnComplete::Redirect,
    };
    let on_pending = match params.on_pending.as_deref() {
        Some(s) => s
            .parse::<OnPending>()
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("onPending: {e}")))?,
        None => OnPending::Accepted,
    };

    let resolved = state
        .resolver
        .resolve(&id, on_complete, on_pending)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(match resolved {
        ResolvedStatus::Pending {
            status_location,
            retry_after,
        } => (
            StatusCode::ACCEPTED,
            [
                (header::LOCATION, status_location),
                (header::RETRY_AFTER, retry_after.as_secs().to_string()),
            ],
        )
            .into_response(),
        ResolvedStatus::TimedOut => (
            StatusCode::NOT_FOUND,
            "operation did not complete within the wait ceiling".to_string(),
        )
            .into_response(),
        ResolvedStatus::CompletedRedirect { location } => {
            (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
        }
        ResolvedStatus::CompletedStream { artifact } => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "application/octet-stream".to_string(),
            )],
            artifact,
        )
            .into_response(),
        ResolvedStatus::Failed { detail } => {
            (StatusCode::UNPROCESSABLE_ENTITY, Json(detail)).into_response()
        }
    })
}
