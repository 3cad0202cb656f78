//! ticket-services — the asynchronous request-reply core.
//!
//! Ports to the external collaborators (work queue, result store) plus the
//! three active pieces built on them: the acceptance handler, the status
//! resolver, and the worker driver.

pub mod acceptance;
pub mod resolver;
pub mod result_store;
pub mod work_queue;
pub mod worker;

pub use acceptance::{Accepted, AcceptanceHandler, BasicRules, RequestValidator};
pub use resolver::{OnComplete, OnPending, ResolvedStatus, StatusResolver, UnknownVariant};
pub use result_store::{
    ArtifactKind, InMemoryResultStore, ResultStore, StoreError, StoreStats, StoredArtifact,
};
pub use work_queue::{
    Delivery, DeliveryHandle, InMemoryWorkQueue, QueueError, QueueStats, WorkQueue,
};
pub use worker::{Processor, WorkerDriver};
