//! ticket-core — shared types, envelope codec, and configuration.
//! All other ticket crates depend on this one.

pub mod config;
pub mod envelope;
pub mod error;
pub mod operation;

pub use envelope::{Envelope, EnvelopeProperties};
pub use error::{AcceptError, EnvelopeError, FailureDetail, ProcessingError};
pub use operation::{now_ms, status_location, OperationId};
