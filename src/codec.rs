//! Envelope decode and encode
//!
//! The codec is an immutable registry value: accepted media types are
//! fixed at construction, one instance is built in `main` and shared
//! read-only by every in-flight request. No process-wide decoder state.

use crate::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use crate::error::Error;

/// Media type the mutating endpoint accepts
pub const MEDIA_TYPE_JSON: &str = "application/json";

/// Decode/encode registry for the admission envelope
#[derive(Clone, Debug)]
pub struct ReviewCodec {
    accepted: Vec<String>,
}

/// A decoded envelope whose request section is guaranteed present
///
/// The request is split out of the envelope at decode time so callers
/// read it non-optionally; [`DecodedReview::into_reply`] puts it back
/// next to the response when the reply is assembled. The envelope value
/// is the one that came off the wire, metadata untouched.
#[derive(Debug)]
pub struct DecodedReview {
    review: AdmissionReview,
    request: AdmissionRequest,
}

impl DecodedReview {
    /// The admission request carried by the envelope
    pub fn request(&self) -> &AdmissionRequest {
        &self.request
    }

    /// Attach the response and hand back the inbound envelope, request
    /// section restored
    pub fn into_reply(mut self, response: AdmissionResponse) -> AdmissionReview {
        self.review.request = Some(self.request);
        self.review.response = Some(response);
        self.review
    }
}

impl ReviewCodec {
    /// Codec accepting the standard admission media type
    pub fn new() -> Self {
        Self {
            accepted: vec![MEDIA_TYPE_JSON.to_string()],
        }
    }

    /// Whether the declared content type is in the accepted registry
    ///
    /// Exact string match; parameters such as `; charset=utf-8` do not
    /// match, which is what the API server sends anyway.
    pub fn accepts(&self, content_type: &str) -> bool {
        self.accepted.iter().any(|accepted| accepted == content_type)
    }

    /// Decode an inbound envelope
    ///
    /// Fails when the declared content type is not accepted, when the
    /// bytes do not parse as an [`AdmissionReview`], or when the parsed
    /// envelope carries no request section. All three abort the call at
    /// the transport tier; on success the returned [`DecodedReview`]
    /// always carries a request.
    pub fn decode(&self, body: &[u8], content_type: &str) -> Result<DecodedReview, Error> {
        if !self.accepts(content_type) {
            return Err(Error::UnsupportedMediaType(content_type.to_string()));
        }
        let mut review: AdmissionReview =
            serde_json::from_slice(body).map_err(Error::MalformedEnvelope)?;
        let request = review.request.take().ok_or(Error::EmptyRequest)?;
        Ok(DecodedReview { review, request })
    }

    /// Encode the envelope, response included, back to bytes
    pub fn encode(&self, review: &AdmissionReview) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(review).map_err(Error::Encode)
    }
}

impl Default for ReviewCodec {
    fn default() -> Self {
        Self::new()
    }
}
