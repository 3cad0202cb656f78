//! Default processor — simulates work and echoes the payload.
//!
//! The success artifact is the submitted payload itself, so the full round
//! trip through queue and store is observable out of the box. A `"fail"`
//! member in the payload produces a persisted failure instead, which makes
//! the failure path reachable without custom business logic.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use ticket_core::ProcessingError;
use ticket_services::Processor;

pub struct EchoProcessor {
    simulate_work: Duration,
}

impl EchoProcessor {
    pub fn new(simulate_work_ms: u64) -> Self {
        Self {
            simulate_work: Duration::from_millis(simulate_work_ms),
        }
    }
}

#[async_trait]
impl Processor for EchoProcessor {
    async fn process(&self, payload: &Value) -> Result<Bytes, ProcessingError> {
        if !self.simulate_work.is_zero() {
            tokio::time::sleep(self.simulate_work).await;
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
