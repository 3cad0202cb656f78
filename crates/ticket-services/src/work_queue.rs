//! Work queue port — at-least-once delivery of envelope bytes to workers.
//!
//! The queue carries opaque bytes with a redelivery count. Dequeue leases a
//! message for a visibility window; a message that is neither acknowledged
//! nor dead-lettered before the window ends returns to the ready list and is
//! delivered again. Duplicate delivery after a lease expiry is possible and
//! callers must tolerate it.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use ticket_core::now_ms;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue unavailable: {0}")]
    Unavailable(String),
    #[error("unknown delivery handle {0}")]
    UnknownHandle(u64),
}

/// Lease handle for an in-flight delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeliveryHandle(pub u64);

impl std::fmt::Display for DeliveryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One leased message.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub handle: DeliveryHandle,
    pub body: Bytes,
    /// How many times this message has been delivered, this one included.
    pub delivery_count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub ready: usize,
    pub leased: usize,
    pub dead: usize,
}

#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn enqueue(&self, body: Bytes) -> Result<(), QueueError>;

    /// Lease the next ready message for `visibility`, if any.
    async fn dequeue(&self, visibility: Duration) -> Result<Option<Delivery>, QueueError>;

    /// Remove a leased message permanently. Valid only while the lease holds.
    async fn acknowledge(&self, handle: DeliveryHandle) -> Result<(), QueueError>;

    /// Move a leased message to the dead-letter channel for inspection.
    async fn deadletter(&self, handle: DeliveryHandle) -> Result<(), QueueError>;

    async fn stats(&self) -> QueueStats;
}

// ── In-memory implementation ──────────────────────────────────────────────────

#[derive(Debug)]
struct QueuedMessage {
    body: Bytes,
    delivery_count: u32,
}

#[derive(Debug)]
struct LeasedMessage {
    body: Bytes,
    delivery_count: u32,
    lease_expires_ms: u64,
}

#[derive(Debug, Default)]
struct Inner {
    next_handle: u64,
    ready: VecDeque<QueuedMessage>,
    leased: HashMap<u64, LeasedMessage>,
    dead: Vec<QueuedMessage>,
    closed: bool,
}

impl Inner {
    /// Return expired leases to the front of the ready list.
    fn reap_expired(&mut self) {
        let now = now_ms();
        let expired: Vec<u64> = self
            .leased
            .iter()
            .filter(|(_, m)| m.lease_expires_ms <= now)
            .map(|(h, _)| *h)
            .collect();
        for handle in expired {
            if let Some(m) = self.leased.remove(&handle) {
                self.ready.push_front(QueuedMessage {
                    body: m.body,
                    delivery_count: m.delivery_count,
                });
            }
        }
    }
}

/// In-memory work queue with lease semantics. Development and test adapter;
/// a broker-backed implementation satisfies the same trait.
#[derive(Default)]
pub struct InMemoryWorkQueue {
    inner: Mutex<Inner>,
}

impl InMemoryWorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a broker outage: subsequent enqueues fail.
    pub fn close(&self) {
        self.inner.lock().unwrap().closed = true;
    }

    /// Dead-lettered message bodies, oldest first.
    pub fn dead_letters(&self) -> Vec<Bytes> {
        let inner = self.inner.lock().unwrap();
        inner.dead.iter().map(|m| m.body.clone()).collect()
    }
}

#[async_trait]
impl WorkQueue for InMemoryWorkQueue {
    async fn enqueue(&self, body: Bytes) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return Err(QueueError::Unavailable("queue closed".to_string()));
        }
        inner.ready.push_back(QueuedMessage {
            body,
            delivery_count: 0,
        });
        Ok(())
    }

    async fn dequeue(&self, visibility: Duration) -> Result<Option<Delivery>, QueueError> {
        let mut inner = self.inner.lock().unwrap();
        inner.reap_expired();

        let message = match inner.ready.pop_front() {
            Some(m) => m,
            None => return Ok(None),
        };

        inner.next_handle += 1;
        let handle = DeliveryHandle(inner.next_handle);
        let delivery_count = message.delivery_count + 1;
        inner.leased.insert(
            handle.0,
            LeasedMessage {
                body: message.body.clone(),
                delivery_count,
                lease_expires_ms: now_ms() + visibility.as_millis() as u64,
            },
        );

        Ok(Some(Delivery {
            handle,
            body: message.body,
            delivery_count,
        }))
    }

    async fn acknowledge(&self, handle: DeliveryHandle) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .leased
            .remove(&handle.0)
            .map(|_| ())
            .ok_or(QueueError::UnknownHandle(handle.0))
    }

    async fn deadletter(&self, handle: DeliveryHandle) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().unwrap();
        let message = inner
            .leased
            .remove(&handle.0)
            .ok_or(QueueError::UnknownHandle(handle.0))?;
        inner.dead.push(QueuedMessage {
            body: message.body,
            delivery_count: message.delivery_count,
        });
        Ok(())
    }

    async fn stats(&self) -> QueueStats {
        let mut inner = self.inner.lock().unwrap();
        inner.reap_expired();
        QueueStats {
            ready: inner.ready.len(),
            leased: inner.leased.len(),
            dead: inner.dead.len(),
        }
    }
}
