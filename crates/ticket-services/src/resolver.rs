//! Status resolver — observes an operation's lifecycle through the result
//! store and decides what each poll returns.
//!
//! The store is the only oracle: an operation is pending until an artifact
//! exists under its key, and the artifact's kind decides success or failure.
//! Nothing here mutates operation state, so a terminal observation can never
//! regress to pending.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde_json::Value;

use ticket_core::config::ResolverSettings;
use ticket_core::{status_location, OperationId};

use crate::result_store::{ArtifactKind, ResultStore, StoreError};

/// How a completed result should be returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnComplete {
    /// Redirect to a scoped artifact reference.
    Redirect,
    /// Return the artifact inline.
    Stream,
}

/// How a pending result should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnPending {
    /// Answer immediately with a retry hint.
    Accepted,
    /// Hold the poll open under a bounded backoff schedule.
    Synchronous,
}

/// Unrecognized onComplete/onPending text. Rejected at the boundary, never
/// silently defaulted.
#[derive(Debug, thiserror::Error)]
#[error("unrecognized value \"{got}\", expected one of: {expected}")]
pub struct UnknownVariant {
    pub got: String,
    pub expected: &'static str,
}

impl FromStr for OnComplete {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("redirect") {
            Ok(Self::Redirect)
        } else if s.eq_ignore_ascii_case("stream") {
            Ok(Self::Stream)
        } else {
            Err(UnknownVariant {
                got: s.to_string(),
                expected: "Redirect, Stream",
            })
        }
    }
}

impl FromStr for OnPending {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("accepted") {
            Ok(Self::Accepted)
        } else if s.eq_ignore_ascii_case("synchronous") {
            Ok(Self::Synchronous)
        } else {
            Err(UnknownVariant {
                got: s.to_string(),
                expected: "Accepted, Synchronous",
            })
        }
    }
}

/// What one poll resolved to. The API layer maps these onto HTTP statuses.
#[derive(Debug, Clone)]
pub enum ResolvedStatus {
    Pending {
        status_location: String,
        retry_after: Duration,
    },
    CompletedRedirect {
        /// Scoped artifact reference (valet key), not the artifact itself.
        location: String,
    },
    CompletedStream {
        artifact: Bytes,
    },
    Failed {
        /// The failure artifact the worker persisted.
        detail: Value,
    },
    /// Synchronous wait ran out of schedule. Maps to not-found, distinct
    /// from Failed.
    TimedOut,
}

pub struct StatusResolver {
    store: Arc<dyn ResultStore>,
    settings: ResolverSettings,
    base_url: String,
}

impl StatusResolver {
    pub fn new(store: Arc<dyn ResultStore>, settings: ResolverSettings, base_url: String) -> Self {
        Self {
            store,
            settings,
            base_url,
        }
    }

    /// Resolve one poll.
    ///
    /// Cancel-safe: the synchronous wait holds no resources across its
    /// sleeps, so an upstream deadline can drop this future at any point.
    pub async fn resolve(
        &self,
        id: &OperationId,
        on_complete: OnComplete,
        on_pending: OnPending,
    ) -> Result<ResolvedStatus, StoreError> {
        let key = id.as_str();

        if !self.store.exists(key).await? {
            match on_pending {
                OnPending::Accepted => {
                    return Ok(ResolvedStatus::Pending {
                        status_location: status_location(&self.base_url, id),
                        retry_after: Duration::from_secs(self.settings.retry_after_secs),
                    });
                }
                OnPending::Synchronous => {
                    if !self.wait_for_result(key).await? {
                        tracing::debug!(operation_id = id.short(), "synchronous wait timed out");
                        return Ok(ResolvedStatus::TimedOut);
                    }
                }
            }
        }

        self.resolve_existing(id, on_complete).await
    }

    /// Bounded doubling wait. Existence is re-checked before every sleep and
    /// the loop stops scheduling sleeps once the next one would exceed the
    /// ceiling. Returns whether the artifact appeared.
    async fn wait_for_result(&self, key: &str) -> Result<bool, StoreError> {
        let ceiling = Duration::from_millis(self.settings.sync_ceiling_ms);
        let mut wait = Duration::from_millis(self.settings.sync_initial_ms);
        loop {
            if self.store.exists(key).await? {
                return Ok(true);
            }
            if wait > ceiling {
                return Ok(false);
            }
            tokio::time::sleep(wait).await;
            wait *= 2;
        }
    }

    async fn resolve_existing(
        &self,
        id: &OperationId,
        on_complete: OnComplete,
    ) -> Result<ResolvedStatus, StoreError> {
        let key = id.as_str();
        let artifact = self
            .store
            .read(key)
            .await?
            .ok_or_else(|| StoreError::Missing(key.to_string()))?;

        match artifact.kind {
            ArtifactKind::Failure => {
                let detail = serde_json::from_slice(&artifact.body).unwrap_or_else(|_| {
                    serde_json::json!({
                        "error": { "code": "unknown", "message": "failure detail unreadable" }
                    })
                });
                Ok(ResolvedStatus::Failed { detail })
            }
            ArtifactKind::Success => match on_complete {
                OnComplete::Redirect => {
                    let ttl = Duration::from_secs(self.settings.scoped_ref_ttl_secs);
                    let token = self.store.scoped_read_ref(key, ttl).await?;
                    Ok(ResolvedStatus::CompletedRedirect {
                        location: format!(
                            "{}/artifacts/{}",
                            self.base_url.trim_end_matches('/'),
                            token
                        ),
                    })
                }
                OnComplete::Stream => {
                    if artifact.body.len() as u64 > self.settings.max_stream_bytes {
                        tracing::warn!(
                            operation_id = id.short(),
                            bytes = artifact.body.len(),
                            limit = self.settings.max_stream_bytes,
                            "streaming artifact above size threshold"
                        );
                    }
                    Ok(ResolvedStatus::CompletedStream {
                        artifact: artifact.body,
                    })
                }
            },
        }
    }
}
