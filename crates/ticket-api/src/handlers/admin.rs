//! /admin/status handler — daemon introspection.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use ticket_core::now_ms;

use super::ApiState;

#[derive(Serialize)]
pub struct AdminStatusResponse {
    pub uptime_secs: u64,
    pub queue: QueueDepths,
    pub artifacts: usize,
}

#[derive(Serialize)]
pub struct QueueDepths {
    pub ready: usize,
    pub leased: usize,
    pub dead: usize,
}

pub async fn handle_admin_status(State(state): State<ApiState>) -> Json<AdminStatusResponse> {
    let queue = state.queue.stats().await;
    let store = state.store.stats().await;

    Json(AdminStatusResponse {
        uptime_secs: now_ms().saturating_sub(state.started_at) / 1000,
        queue: QueueDepths {
            ready: queue.ready,
            leased: queue.leased,
            dead: queue.dead,
        },
        artifacts: store.artifacts,
    })
}
