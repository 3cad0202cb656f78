//! Ticket integration test harness.
//!
//! Each test boots the full stack — queue, store, acceptance handler,
//! status resolver, worker driver, HTTP API — inside the test process on an
//! ephemeral port and drives it over real HTTP:
//!
//!   cargo test --test integration
//!
//! Timings are shrunk via config so the synchronous-wait and redelivery
//! paths finish in milliseconds. Each server owns its own queue and store;
//! tests do not share state.

mod accept;
mod status;
mod worker;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use ticket_core::config::TicketConfig;
use ticket_core::ProcessingError;
use ticket_services::{
    AcceptanceHandler, BasicRules, InMemoryResultStore, InMemoryWorkQueue, Processor,
    StatusResolver, WorkQueue, WorkerDriver,
};

pub const QUEUE_NAME: &str = "requests";

// ── Harness ───────────────────────────────────────────────────────────────────

/// Processor used by every test server: echoes the payload as the artifact.
/// Payload members steer it: "sleep_ms" delays, "fail" returns a business
/// failure, "panic" crashes the processing task.
pub struct TestProcessor;

#[async_trait]
impl Processor for TestProcessor {
    async fn process(&self, payload: &Value) -> Result<Bytes, ProcessingError> {
        if let Some(ms) = payload.get("sleep_ms").and_then(|v| v.as_u64()) {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        if payload.get("panic").is_some() {
            panic!("induced processor crash");
        }
        if let Some(reason) = payload.get("fail") {
            return Err(ProcessingError::new(
                "rejected",
                format!("payload asked to fail: {reason}"),
            ));
        }
        serde_json::to_vec(payload)
            .map(Bytes::from)
            .map_err(|e| ProcessingError::new("encode", e.to_string()))
    }
}

/// Config with timings shrunk for tests: 20 ms worker polls, 200 ms leases,
/// redelivery cap 2, synchronous-wait schedule 25+50+100+200 ms.
pub fn fast_config() -> TicketConfig {
    let mut config = TicketConfig::default();
    config.worker.poll_interval_ms = 20;
    config.worker.visibility_timeout_ms = 200;
    config.worker.max_redeliveries = 2;
    config.resolver.sync_initial_ms = 25;
    config.resolver.sync_ceiling_ms = 200;
    config
}

/// The full stack on an ephemeral port.
pub struct TestServer {
    pub base_url: String,
    pub queue: Arc<InMemoryWorkQueue>,
    pub store: Arc<InMemoryResultStore>,
    shutdown: tokio::sync::broadcast::Sender<()>,
}

impl TestServer {
    pub async fn start() -> Result<TestServer> {
        Self::start_with(fast_config()).await
    }

    pub async fn start_with(mut config: TicketConfig) -> Result<TestServer> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let base_url = format!("http://127.0.0.1:{port}");
        config.service.base_url = base_url.clone();

        let queue = Arc::new(InMemoryWorkQueue::new());
        let store = Arc::new(InMemoryResultStore::new());

        let acceptance = Arc::new(AcceptanceHandler::new(
            queue.clone(),
            Arc::new(BasicRules {
                max_payload_bytes: config.accept.max_payload_bytes,
            }),
            config.accept.clone(),
            base_url.clone(),
        ));
        let resolver = Arc::new(StatusResolver::new(
            store.clone(),
            config.resolver.clone(),
            base_url.clone(),
        ));

        let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);
        let driver = WorkerDriver::new(
            queue.clone(),
            store.clone(),
            Arc::new(TestProcessor),
            config.worker.clone(),
            shutdown_tx.subscribe(),
        );
        tokio::spawn(driver.run());

        let state = ticket_api::ApiState {
            acceptance,
            resolver,
            queue: queue.clone(),
            store: store.clone(),
            queue_name: config.service.queue_name.clone(),
            started_at: ticket_core::now_ms(),
        };
        tokio::spawn(ticket_api::serve_on(state, listener));

        Ok(TestServer {
            base_url,
            queue,
            store,
            shutdown: shutdown_tx,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
    }
}

/// Client that does not follow redirects, so 302 responses stay observable.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("reqwest client")
}

/// Poll a status URL until it leaves 202, returning the terminal response.
pub async fn poll_until_terminal(
    http: &reqwest::Client,
    status_url: &str,
    on_complete: &str,
) -> Result<reqwest::Response> {
    for _ in 0..200 {
        let resp = http
            .get(status_url)
            .query(&[("onComplete", on_complete), ("onPending", "Accepted")])
            .send()
            .await?;
        if resp.status() != reqwest::StatusCode::ACCEPTED {
            return Ok(resp);
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    bail!("operation never left pending: {status_url}")
}

/// Wait until the dead-letter channel holds at least `n` messages.
pub async fn wait_for_dead_letters(queue: &InMemoryWorkQueue, n: usize) -> Result<()> {
    for _ in 0..200 {
        if queue.stats().await.dead >= n {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    bail!("dead-letter count never reached {n}")
}

/// A well-formed operation id that no submission produced.
pub fn unknown_operation_id() -> String {
    "0123456789abcdef".repeat(4)
}
