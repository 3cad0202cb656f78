//! /artifacts/{token} handler — dereferences scoped read references.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use super::ApiState;

pub async fn handle_artifact(
    State(state): State<ApiState>,
    Path(token): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    let artifact = state
        .store
        .read_scoped(&token)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    match artifact {
        Some(a) => Ok((
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "application/octet-stream".to_string(),
            )],
            a.body,
        )
            .into_response()),
        None => Err((
            StatusCode::NOT_FOUND,
            "unknown or expired artifact reference".to_string(),
        )),
    }
}
