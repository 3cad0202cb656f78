//! Worker driver — drains the work queue and persists results.
//!
//! Acknowledgement happens only after the artifact write returns, so a crash
//! anywhere between dequeue and acknowledge ends in redelivery, and the
//! store's overwrite-by-key makes reprocessing safe.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use tokio::sync::{broadcast, Semaphore};

use ticket_core::config::WorkerSettings;
use ticket_core::{Envelope, FailureDetail, ProcessingError};

use crate::result_store::{ArtifactKind, ResultStore};
use crate::work_queue::{DeliveryHandle, WorkQueue};

/// Caller-supplied business logic, invoked once per delivery.
///
/// Returning an error is a terminal outcome recorded for the client, not a
/// retry request. Retry-on-failure, if wanted, belongs inside the processor.
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, payload: &Value) -> Result<Bytes, ProcessingError>;
}

pub struct WorkerDriver {
    queue: Arc<dyn WorkQueue>,
    store: Arc<dyn ResultStore>,
    processor: Arc<dyn Processor>,
    settings: WorkerSettings,
    shutdown: broadcast::Receiver<()>,
    semaphore: Arc<Semaphore>,
}

impl WorkerDriver {
    pub fn new(
        queue: Arc<dyn WorkQueue>,
        store: Arc<dyn ResultStore>,
        processor: Arc<dyn Processor>,
        settings: WorkerSettings,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        let permits = if settings.max_concurrent == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            settings.max_concurrent as usize
        };
        Self {
            queue,
            store,
            processor,
            settings,
            shutdown,
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        tracing::info!(
            max_concurrent = self.semaphore.available_permits(),
            poll_interval_ms = self.settings.poll_interval_ms,
            "worker driver started"
        );

        let mut interval =
            tokio::time::interval(Duration::from_millis(self.settings.poll_interval_ms));

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("worker driver shutting down");
                    return Ok(());
                }
                _ = interval.tick() => {
                    self.drain_ready().await;
                }
            }
        }
    }

    /// Process every message that was ready at the start of the tick. Waits
    /// for the batch so a tick never overlaps itself.
    pub async fn drain_ready(&self) {
        let visibility = Duration::from_millis(self.settings.visibility_timeout_ms);
        let ready = self.queue.stats().await.ready;
        let mut tasks = Vec::new();

        for _ in 0..ready {
            let delivery = match self.queue.dequeue(visibility).await {
                Ok(Some(d)) => d,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "dequeue failed");
                    break;
                }
            };

            if delivery.delivery_count > self.settings.max_redeliveries {
                tracing::warn!(
                    handle = %delivery.handle,
                    delivery_count = delivery.delivery_count,
                    "redelivery budget exhausted, dead-lettering"
                );
                if let Err(e) = self.queue.deadletter(delivery.handle).await {
                    tracing::warn!(error = %e, "dead-letter failed");
                }
                continue;
            }

            let envelope = match Envelope::decode(&delivery.body) {
                Ok(env) => env,
                Err(e) => {
                    // Permanent: redelivery cannot repair a bad envelope.
                    tracing::warn!(
                        handle = %delivery.handle,
                        error = %e,
                        "dead-lettering undecodable message"
                    );
                    if let Err(e) = self.queue.deadletter(delivery.handle).await {
                        tracing::warn!(error = %e, "dead-letter failed");
                    }
                    continue;
                }
            };

            let permit = match self.semaphore.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => break, // semaphore closed
            };
            let queue = self.queue.clone();
            let store = self.store.clone();
            let processor = self.processor.clone();
            let handle = delivery.handle;

            tasks.push(tokio::spawn(async move {
                process_delivery(queue, store, processor, envelope, handle).await;
                drop(permit);
            }));
        }

        for task in tasks {
            if let Err(e) = task.await {
                // A panic inside processing lands here. The delivery stays
                // unacknowledged; the lease expires and the queue redelivers.
                tracing::error!(error = %e, "processing task aborted");
            }
        }
    }
}

async fn process_delivery(
    queue: Arc<dyn WorkQueue>,
    store: Arc<dyn ResultStore>,
    processor: Arc<dyn Processor>,
    envelope: Envelope,
    handle: DeliveryHandle,
) {
    let (payload, properties) = envelope.into_parts();
    let operation_id = properties.operation_id;
    let key = operation_id.as_str();

    let started = Instant::now();
    let outcome = processor.process(&payload).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let (written, kind) = match outcome {
        Ok(artifact) => (
            store.write(key, artifact, ArtifactKind::Success).await,
            ArtifactKind::Success,
        ),
        Err(error) => {
            tracing::debug!(
                operation_id = operation_id.short(),
                code = %error.code,
                "processor returned failure"
            );
            let detail = FailureDetail { error };
            match serde_json::to_vec(&detail) {
                Ok(body) => (
                    store
                        .write(key, Bytes::from(body), ArtifactKind::Failure)
                        .await,
                    ArtifactKind::Failure,
                ),
                Err(e) => {
                    tracing::error!(error = %e, "failure detail encoding failed");
                    return;
                }
            }
        }
    };

    match written {
        Ok(()) => {
            if let Err(e) = queue.acknowledge(handle).await {
                tracing::warn!(error = %e, "acknowledge failed, message may redeliver");
            }
            tracing::info!(
                operation_id = operation_id.short(),
                object_type = %properties.object_type,
                ?kind,
                elapsed_ms,
                "operation processed"
            );
        }
        Err(e) => {
            // Not acknowledged: the artifact must land before the message
            // may be removed.
            tracing::warn!(
                operation_id = operation_id.short(),
                error = %e,
                "artifact write failed, leaving delivery for redelivery"
            );
        }
    }
}
