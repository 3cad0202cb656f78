//! Operation identity and status-location derivation.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Unix milliseconds now.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Globally unique operation identifier — 64 lowercase hex characters.
///
/// Derived as `BLAKE3(nonce || submitted_at || payload)` where the nonce is
/// 16 random bytes. Uniqueness rests on the nonce; the timestamp and payload
/// bind the id to the submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
    /// Assign a fresh id for a submission.
    pub fn generate(submitted_at: u64, payload: &[u8]) -> Self {
        let nonce: [u8; 16] = rand::random();
        let mut h = blake3::Hasher::new();
        h.update(&nonce);
        h.update(&submitted_at.to_le_bytes());
        h.update(payload);
        Self(hex::encode(h.finalize().as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 16 characters, for log fields.
    pub fn short(&self) -> &str {
        &self.0[..16.min(self.0.len())]
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("operation id must be 64 lowercase hex characters")]
pub struct InvalidOperationId;

impl FromStr for OperationId {
    type Err = InvalidOperationId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_lower = s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if s.len() == 64 && hex_lower {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidOperationId)
        }
    }
}

/// The absolute URL a client polls for this operation.
///
/// Derivation is deterministic: same base URL and id, same location. The
/// base URL comes from configuration, never from ambient environment.
pub fn status_location(base_url: &str, id: &OperationId) -> String {
    format!("{}/status/{}", base_url.trim_end_matches('/'), id)
}
