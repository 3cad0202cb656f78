//! Work-queue envelope — wraps a caller payload with tracking metadata.
//!
//! The payload is opaque. It is stored under the reserved `RequestObject`
//! field and never inspected or merged into top-level fields, so caller
//! schemas cannot collide with tracking metadata. The worker recovers
//! exactly the document the client submitted.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EnvelopeError;
use crate::operation::OperationId;

/// Reserved field holding the caller payload.
pub const REQUEST_OBJECT: &str = "RequestObject";
/// Reserved field holding tracking metadata.
pub const ENVELOPE_PROPERTIES: &str = "EnvelopeProperties";

/// Tracking metadata carried alongside the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeProperties {
    pub operation_id: OperationId,
    /// Unix ms when the operation was accepted.
    pub submitted_at: u64,
    /// Absolute URL the client polls.
    pub status_location: String,
    /// Resource type from the submit path. Worker-side logging only.
    pub object_type: String,
}

/// The transport wrapper placed on the work queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "RequestObject")]
    request_object: Value,
    #[serde(rename = "EnvelopeProperties")]
    properties: EnvelopeProperties,
}

impl Envelope {
    pub fn wrap(payload: Value, properties: EnvelopeProperties) -> Self {
        Self {
            request_object: payload,
            properties,
        }
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Decode a dequeued message. Fails if either reserved field is absent.
    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let doc: Value = serde_json::from_slice(bytes)
            .map_err(|e| EnvelopeError::Malformed(e.to_string()))?;
        let obj = doc
            .as_object()
            .ok_or_else(|| EnvelopeError::Malformed("not a JSON object".to_string()))?;
        if !obj.contains_key(REQUEST_OBJECT) {
            return Err(EnvelopeError::MissingField(REQUEST_OBJECT));
        }
        if !obj.contains_key(ENVELOPE_PROPERTIES) {
            return Err(EnvelopeError::MissingField(ENVELOPE_PROPERTIES));
        }
        serde_json::from_value(doc).map_err(|e| EnvelopeError::Malformed(e.to_string()))
    }

    pub fn payload(&self) -> &Value {
        &self.request_object
    }

    pub fn properties(&self) -> &EnvelopeProperties {
        &self.properties
    }

    pub fn into_parts(self) -> (Value, EnvelopeProperties) {
        (self.request_object, self.properties)
    }
}
