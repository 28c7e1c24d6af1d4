//! Relabeler - mutating admission webhook for pod labels
//!
//! The API server calls `POST /mutate` with an AdmissionReview envelope
//! before persisting a resource. The pipeline decodes the envelope,
//! classifies the target kind, evaluates label mutation rules against
//! the pod and answers with a JSON Patch on the same envelope. The
//! webhook never rejects a resource; when it cannot read a pod it says
//! so in the response and admits anyway.
//!
//! # Modules
//!
//! - [`admission`] - AdmissionReview wire model
//! - [`codec`] - envelope decode/encode with the accepted-media registry
//! - [`classify`] - supported-kind check
//! - [`decision`] - label mutation rules
//! - [`patch`] - JSON Patch construction
//! - [`pipeline`] - request pipeline and response assembly
//! - [`events`] - audit event sink
//! - [`server`] - HTTPS surface
//! - [`error`] - error types

#![deny(missing_docs)]

pub mod admission;
pub mod classify;
pub mod codec;
pub mod decision;
pub mod error;
pub mod events;
pub mod patch;
pub mod pipeline;
pub mod server;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Default port for the webhook HTTPS server
///
/// The in-cluster Service maps 443 onto this. Port 8443 is used instead
/// of 443 to avoid requiring root privileges.
pub const DEFAULT_WEBHOOK_PORT: u16 = 8443;
