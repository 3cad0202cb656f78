//! ticketd — asynchronous request-reply daemon.
//!
//! Accepts work over HTTP, queues it, processes it in the background, and
//! serves poll-based status until the result artifact is ready.

use std::sync::Arc;

use anyhow::Result;

use ticket_core::config::TicketConfig;
use ticket_services::{
    AcceptanceHandler, BasicRules, InMemoryResultStore, InMemoryWorkQueue, ResultStore,
    StatusResolver, WorkQueue, WorkerDriver,
};

mod processor;
use processor::EchoProcessor;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = TicketConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = TicketConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        TicketConfig::default()
    });

    tracing::info!(
        base_url = %config.service.base_url,
        queue = %config.service.queue_name,
        "ticketd starting"
    );

    // Collaborators. In-memory adapters; a deployment swaps in broker- and
    // blob-backed implementations of the same traits.
    let queue: Arc<dyn WorkQueue> = Arc::new(InMemoryWorkQueue::new());
    let store: Arc<dyn ResultStore> = Arc::new(InMemoryResultStore::new());

    let acceptance = Arc::new(AcceptanceHandler::new(
        queue.clone(),
        Arc::new(BasicRules {
            max_payload_bytes: config.accept.max_payload_bytes,
        }),
        config.accept.clone(),
        config.service.base_url.clone(),
    ));
    let resolver = Arc::new(StatusResolver::new(
        store.clone(),
        config.resolver.clone(),
        config.service.base_url.clone(),
    ));

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let worker_task = {
        let driver = WorkerDriver::new(
            queue.clone(),
            store.clone(),
            Arc::new(EchoProcessor::new(config.worker.simulate_work_ms)),
            config.worker.clone(),
            shutdown_tx.subscribe(),
        );
        tokio::spawn(driver.run())
    };

    let state = ticket_api::ApiState {
        acceptance,
        resolver,
        queue: queue.clone(),
        store: store.clone(),
        queue_name: config.service.queue_name.clone(),
        started_at: ticket_core::now_ms(),
    };
    let api_task = tokio::spawn(ticket_api::serve(state, config.service.api_port));

    // ── Wait for exit ────────────────────────────────────────────────────────

    let mut shutdown_rx = shutdown_tx.subscribe();

    tokio::select! {
        _ = shutdown_rx.recv() => tracing::info!("shutting down"),
        r = worker_task        => tracing::error!("worker driver exited: {:?}", r),
        r = api_task           => tracing::error!("API server exited: {:?}", r),
    }

    Ok(())
}
