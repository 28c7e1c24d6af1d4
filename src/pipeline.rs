//! Admission pipeline
//!
//! Drives one admission call from raw bytes to raw bytes: decode,
//! classify, decide, build the patch, assemble the response onto the
//! inbound envelope, encode. The pipeline holds no mutable state and is
//! shared read-only across all in-flight requests; its only side effect
//! is the audit sink, which is fire-and-forget.
//!
//! Failures fall into two tiers with different blast radius:
//!
//! - transport tier: the envelope itself is unusable. The call fails
//!   with an error status and a plain-text reason, no envelope.
//! - decision tier: the envelope is fine but the pod body is not. The
//!   webhook still answers 200 with `allowed: true` and only notes the
//!   failure under `status.message`. A broken label rule must never
//!   block cluster writes.

use std::sync::Arc;

use axum::http::StatusCode;
use tracing::{debug, error, info, warn};

use crate::admission::{AdmissionRequest, AdmissionResponse};
use crate::classify::{classify, Classification};
use crate::codec::ReviewCodec;
use crate::decision::{Outcome, RuleSet};
use crate::events::EventSink;
use crate::patch;

/// Verdict of one pipeline pass, ready for the HTTP layer
#[derive(Debug)]
pub enum Reply {
    /// 200 with the encoded response envelope
    Admission(Vec<u8>),
    /// Transport-tier failure
    Rejected {
        /// HTTP status to answer with
        status: StatusCode,
        /// Plain-text reason for the caller
        reason: String,
    },
}

/// The admission decision pipeline
pub struct Pipeline {
    codec: ReviewCodec,
    rules: RuleSet,
    sink: Arc<dyn EventSink>,
}

impl Pipeline {
    /// Pipeline over the given codec, rule set and audit sink
    pub fn new(codec: ReviewCodec, rules: RuleSet, sink: Arc<dyn EventSink>) -> Self {
        Self { codec, rules, sink }
    }

    /// Run one admission call through the pipeline
    pub async fn review(&self, body: &[u8], content_type: &str) -> Reply {
        let decoded = match self.codec.decode(body, content_type) {
            Ok(decoded) => decoded,
            Err(e) => {
                error!(error = %e, "rejecting admission call at the transport tier");
                return Reply::Rejected {
                    status: e.http_status(),
                    reason: e.to_string(),
                };
            }
        };
        let request = decoded.request();

        info!(
            uid = %request.uid,
            kind = %request.kind,
            namespace = %request.namespace,
            name = %request.name,
            operation = %request.operation,
            "processing admission request"
        );
        self.sink
            .record(&format!(
                "admission request: uid={}, kind={}, namespace={}, name={}, operation={}",
                request.uid, request.kind, request.namespace, request.name, request.operation
            ))
            .await;

        let response = match classify(request) {
            Classification::Unsupported { kind } => {
                debug!(uid = %request.uid, kind = %kind, "unsupported kind, admitting unchanged");
                AdmissionResponse::allow(&request.uid)
            }
            Classification::Supported => self.decide_pod(request).await,
        };

        let review = decoded.into_reply(response);

        match self.codec.encode(&review) {
            Ok(bytes) => Reply::Admission(bytes),
            Err(e) => {
                error!(error = %e, "failed to encode admission response");
                Reply::Rejected {
                    status: e.http_status(),
                    reason: "internal error".to_string(),
                }
            }
        }
    }

    /// Decide and assemble the response for a supported-kind request
    async fn decide_pod(&self, request: &AdmissionRequest) -> AdmissionResponse {
        match self.rules.decide(request.object.as_ref()) {
            Outcome::NoOp => {
                debug!(uid = %request.uid, "no rule matched, admitting unchanged");
                AdmissionResponse::allow(&request.uid)
            }
            Outcome::Mutate(mutation) => match serde_json::to_vec(&patch::build(&mutation)) {
                Ok(ops) => {
                    info!(
                        uid = %request.uid,
                        namespace = %request.namespace,
                        name = %request.name,
                        patch = %String::from_utf8_lossy(&ops),
                        "admitting with label patch"
                    );
                    self.sink
                        .record(&format!(
                            "pod {}/{}: label {:?} replaced: {:?} -> {:?}",
                            request.namespace, request.name, mutation.key, mutation.from, mutation.to
                        ))
                        .await;
                    AdmissionResponse::allow(&request.uid).with_patch(ops)
                }
                Err(e) => {
                    // Decision-tier failure, so fail open rather than 500
                    warn!(uid = %request.uid, error = %e, "failed to serialize patch, admitting unpatched");
                    AdmissionResponse::allow(&request.uid)
                        .with_message(format!("failed to serialize patch: {e}"))
                }
            },
            Outcome::DecodeFailure(message) => {
                warn!(uid = %request.uid, detail = %message, "pod body unreadable, admitting unpatched");
                AdmissionResponse::allow(&request.uid).with_message(message)
            }
        }
    }
}
