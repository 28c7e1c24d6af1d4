//! Error types for the admission webhook

use axum::http::StatusCode;
use thiserror::Error;

/// Main error type for envelope handling
///
/// These are the transport-tier failures: the admission call itself is
/// answered with an error status instead of an envelope. Failures inside
/// the decision tier never surface here; those are reported in the
/// admission response while still allowing the request.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Declared content type is not in the accepted registry
    #[error("unsupported content type {0:?}, expected application/json")]
    UnsupportedMediaType(String),

    /// Request body does not parse as an AdmissionReview envelope
    #[error("malformed admission review: {0}")]
    MalformedEnvelope(#[source] serde_json::Error),

    /// Envelope parsed but carries no request section
    #[error("admission review carries no request")]
    EmptyRequest,

    /// Response envelope could not be serialized
    #[error("failed to encode admission review: {0}")]
    Encode(#[source] serde_json::Error),
}

impl Error {
    /// HTTP status reported for this error at the transport tier
    pub fn http_status(&self) -> StatusCode {
        match self {
            Error::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::MalformedEnvelope(_) | Error::EmptyRequest => StatusCode::BAD_REQUEST,
            Error::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
