pub mod handlers;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

pub use handlers::ApiState;

/// Build the router. Exposed separately from `serve` so tests can run it on
/// their own listener.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/status/{operation_id}", get(handlers::handle_status))
        .route("/artifacts/{token}", get(handlers::handle_artifact))
        .route("/admin/status", get(handlers::handle_admin_status))
        .route("/{queue}/{object_type}", post(handlers::handle_submit))
        .with_state(state)
        .layer(cors)
}

pub async fn serve(state: ApiState, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!(port, "API listening on 127.0.0.1");
    serve_on(state, listener).await
}

pub async fn serve_on(state: ApiState, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}
