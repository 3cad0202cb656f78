//! Acceptance handler — validates, assigns identity, enqueues, replies.
//!
//! Validate before commit: a request that fails business rules is rejected
//! before any side effect. The enqueue happens before the response is
//! returned; if the queue is down the caller gets an error, never a false
//! acceptance.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde_json::Value;

use ticket_core::config::AcceptSettings;
use ticket_core::{now_ms, status_location, AcceptError, Envelope, EnvelopeProperties, OperationId};

use crate::work_queue::WorkQueue;

/// Business-rule validation applied before any side effect.
///
/// The service's own rules are minimal; deployments supply their own
/// implementation for domain-specific checks.
pub trait RequestValidator: Send + Sync {
    fn validate(&self, object_type: &str, payload: &Value) -> Result<(), String>;
}

/// Default rules: the payload must be a JSON object within the size cap.
pub struct BasicRules {
    pub max_payload_bytes: usize,
}

impl RequestValidator for BasicRules {
    fn validate(&self, _object_type: &str, payload: &Value) -> Result<(), String> {
        if !payload.is_object() {
            return Err("payload must be a JSON object".to_string());
        }
        let len = serde_json::to_vec(payload).map(|v| v.len()).unwrap_or(0);
        if len > self.max_payload_bytes {
            return Err(format!(
                "payload is {} bytes, limit {}",
                len, self.max_payload_bytes
            ));
        }
        Ok(())
    }
}

/// Outcome of a successful acceptance.
#[derive(Debug, Clone)]
pub struct Accepted {
    pub operation_id: OperationId,
    pub status_location: String,
    /// Suggested delay before the first poll.
    pub retry_after: Duration,
    pub submitted_at: u64,
}

/// Stateless request intake. Any number of instances may run concurrently;
/// the only shared state is the queue itself.
pub struct AcceptanceHandler {
    queue: Arc<dyn WorkQueue>,
    validator: Arc<dyn RequestValidator>,
    settings: AcceptSettings,
    base_url: String,
}

impl AcceptanceHandler {
    pub fn new(
        queue: Arc<dyn WorkQueue>,
        validator: Arc<dyn RequestValidator>,
        settings: AcceptSettings,
        base_url: String,
    ) -> Self {
        Self {
            queue,
            validator,
            settings,
            base_url,
        }
    }

    /// Validate and enqueue one request.
    pub async fn accept(
        &self,
        object_type: &str,
        payload: Value,
        estimated: Option<Duration>,
    ) -> Result<Accepted, AcceptError> {
        self.validator
            .validate(object_type, &payload)
            .map_err(AcceptError::ValidationFailed)?;

        let submitted_at = now_ms();
        let payload_bytes =
            serde_json::to_vec(&payload).map_err(|e| AcceptError::Internal(e.to_string()))?;
        let operation_id = OperationId::generate(submitted_at, &payload_bytes);
        let status_location = status_location(&self.base_url, &operation_id);

        let envelope = Envelope::wrap(
            payload,
            EnvelopeProperties {
                operation_id: operation_id.clone(),
                submitted_at,
                status_location: status_location.clone(),
                object_type: object_type.to_string(),
            },
        );
        let raw = envelope
            .encode()
            .map_err(|e| AcceptError::Internal(e.to_string()))?;

        self.queue
            .enqueue(Bytes::from(raw))
            .await
            .map_err(|e| AcceptError::QueueUnavailable(e.to_string()))?;

        tracing::info!(
            operation_id = operation_id.short(),
            object_type,
            "operation accepted"
        );

        let retry_after = estimated
            .unwrap_or_else(|| Duration::from_secs(self.settings.default_retry_after_secs));

        Ok(Accepted {
            operation_id,
            status_location,
            retry_after,
            submitted_at,
        })
    }
}
