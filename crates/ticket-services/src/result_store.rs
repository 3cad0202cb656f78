//! Result store port — key-addressable storage for operation artifacts.
//!
//! Existence of a key is the status oracle: an operation is pending until an
//! artifact exists under its id, and the artifact's kind decides success or
//! failure. Writes overwrite by key, so reprocessing the same operation is
//! idempotent. The store also mints short-lived scoped read references so a
//! completed artifact can be fetched without broader store access.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use ticket_core::now_ms;

/// How a stored artifact ended: worker success or persisted failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Success,
    Failure,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("result store unavailable: {0}")]
    Unavailable(String),
    #[error("no artifact under key {0}")]
    Missing(String),
}

/// A persisted artifact with its kind.
#[derive(Debug, Clone)]
pub struct StoredArtifact {
    pub body: Bytes,
    pub kind: ArtifactKind,
    /// Unix ms of the write that produced this artifact.
    pub written_at: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub artifacts: usize,
    pub grants: usize,
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Overwrite-by-key. Writing the same artifact twice leaves the store in
    /// the same observable state as writing it once.
    async fn write(&self, key: &str, body: Bytes, kind: ArtifactKind) -> Result<(), StoreError>;

    async fn read(&self, key: &str) -> Result<Option<StoredArtifact>, StoreError>;

    /// Mint a short-lived read-only reference (valet key) to an artifact.
    /// Fails if no artifact exists under the key.
    async fn scoped_read_ref(&self, key: &str, ttl: Duration) -> Result<String, StoreError>;

    /// Dereference a scoped reference. None when expired or unknown.
    async fn read_scoped(&self, token: &str) -> Result<Option<StoredArtifact>, StoreError>;

    async fn stats(&self) -> StoreStats;
}

// ── In-memory implementation ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Grant {
    key: String,
    expires_at_ms: u64,
}

/// In-memory result store. Development and test adapter; a blob-store
/// implementation satisfies the same trait.
#[derive(Default)]
pub struct InMemoryResultStore {
    artifacts: DashMap<String, StoredArtifact>,
    grants: DashMap<String, Grant>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.artifacts.contains_key(key))
    }

    async fn write(&self, key: &str, body: Bytes, kind: ArtifactKind) -> Result<(), StoreError> {
        self.artifacts.insert(
            key.to_string(),
            StoredArtifact {
                body,
                kind,
                written_at: now_ms(),
            },
        );
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<StoredArtifact>, StoreError> {
        Ok(self.artifacts.get(key).map(|a| a.clone()))
    }

    async fn scoped_read_ref(&self, key: &str, ttl: Duration) -> Result<String, StoreError> {
        if !self.artifacts.contains_key(key) {
            return Err(StoreError::Missing(key.to_string()));
        }
        let token: [u8; 16] = rand::random();
        let token = hex::encode(token);
        self.grants.insert(
            token.clone(),
            Grant {
                key: key.to_string(),
                expires_at_ms: now_ms() + ttl.as_millis() as u64,
            },
        );
        Ok(token)
    }

    async fn read_scoped(&self, token: &str) -> Result<Option<StoredArtifact>, StoreError> {
        let grant = match self.grants.get(token) {
            Some(g) => g.clone(),
            None => return Ok(None),
        };
        if grant.expires_at_ms <= now_ms() {
            self.grants.remove(token);
            return Ok(None);
        }
        Ok(self.artifacts.get(&grant.key).map(|a| a.clone()))
    }

    async fn stats(&self) -> StoreStats {
        StoreStats {
            artifacts: self.artifacts.len(),
            grants: self.grants.len(),
        }
    }
}
