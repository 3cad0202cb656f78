//! HTTP API handlers — the poll-based request-reply surface.

pub mod admin;
pub mod artifacts;
pub mod status;
pub mod submit;

use std::sync::Arc;

use axum::http::StatusCode;

use ticket_core::OperationId;
use ticket_services::{AcceptanceHandler, ResultStore, StatusResolver, WorkQueue};

#[derive(Clone)]
pub struct ApiState {
    pub acceptance: Arc<AcceptanceHandler>,
    pub resolver: Arc<StatusResolver>,
    pub queue: Arc<dyn WorkQueue>,
    pub store: Arc<dyn ResultStore>,
    /// Queue name accepted in the submit path.
    pub queue_name: String,
    /// Unix ms when the daemon started.
    pub started_at: u64,
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Parse an operation id path segment.
fn parse_operation_id(s: &str) -> Result<OperationId, (StatusCode, String)> {
    s.parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            "operation id must be 64 lowercase hex characters".to_string(),
        )
    })
}

// Re-export handler functions for use in router setup.
pub use admin::handle_admin_status;
pub use artifacts::handle_artifact;
pub use status::handle_status;
pub use submit::handle_submit;
