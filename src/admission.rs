//! AdmissionReview wire model
//!
//! Hand-rolled serde types for the admission protocol. The envelope is
//! decoded once per call and the response is attached to that same
//! value before it is encoded again, so `apiVersion` and `kind` pass
//! through verbatim without the webhook knowing anything about protocol
//! revisions.

use std::fmt;

use k8s_openapi::ByteString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level admission envelope
///
/// Carries the request on the way in; the response is written onto the
/// same instance on the way out. Never rebuild a fresh envelope for the
/// reply, the metadata fields would be lost.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReview {
    /// Protocol version, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    /// Envelope kind, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Inbound admission request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<AdmissionRequest>,

    /// Outbound admission response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<AdmissionResponse>,
}

/// One resource under admission, as sent by the API server
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    /// Correlation identifier, echoed verbatim in the response
    #[serde(default)]
    pub uid: String,

    /// Kind descriptor of the target resource
    #[serde(default)]
    pub kind: GroupVersionKind,

    /// Namespace of the target resource
    #[serde(default)]
    pub namespace: String,

    /// Name of the target resource
    #[serde(default)]
    pub name: String,

    /// Operation under admission
    ///
    /// Strictly typed on purpose: a value outside the
    /// CREATE/UPDATE/DELETE/CONNECT vocabulary fails envelope decoding
    /// as malformed instead of riding along as an opaque string.
    pub operation: Operation,

    /// Serialized body of the target resource, kept raw until the
    /// decision tier decides to interpret it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Value>,
}

/// group/version/kind triple identifying a resource type
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupVersionKind {
    /// API group; empty for the core group
    #[serde(default)]
    pub group: String,

    /// API version within the group
    #[serde(default)]
    pub version: String,

    /// Resource kind
    #[serde(default)]
    pub kind: String,
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Core-group resources render as `v1/Pod`, everything else as
        // `group/version/Kind`
        if self.group.is_empty() {
            write!(f, "{}/{}", self.version, self.kind)
        } else {
            write!(f, "{}/{}/{}", self.group, self.version, self.kind)
        }
    }
}

/// Admission operation that triggered the review
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    /// Resource is being created
    Create,
    /// Resource is being updated
    Update,
    /// Resource is being deleted
    Delete,
    /// Connect call on a subresource
    Connect,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Create => "CREATE",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
            Operation::Connect => "CONNECT",
        };
        f.write_str(name)
    }
}

/// The webhook's verdict, attached to the envelope on the way out
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    /// Correlation identifier copied from the request
    pub uid: String,

    /// Admission verdict; this webhook always allows
    pub allowed: bool,

    /// Serialized JSON Patch; base64 on the wire
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<ByteString>,

    /// Patch dialect marker, set whenever `patch` is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<PatchType>,

    /// Outcome details, only set when the decision tier failed open
    #[serde(default, rename = "status", skip_serializing_if = "Option::is_none")]
    pub result: Option<Status>,
}

impl AdmissionResponse {
    /// Response admitting the request unchanged
    pub fn allow(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            allowed: true,
            patch: None,
            patch_type: None,
            result: None,
        }
    }

    /// Attach a serialized JSON Patch and its dialect marker
    pub fn with_patch(mut self, patch: Vec<u8>) -> Self {
        self.patch = Some(ByteString(patch));
        self.patch_type = Some(PatchType::JsonPatch);
        self
    }

    /// Attach a failure message without withdrawing admission
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.result = Some(Status {
            message: message.into(),
        });
        self
    }
}

/// Patch dialects the API server accepts in an admission response
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatchType {
    /// RFC 6902 JSON Patch
    #[serde(rename = "JSONPatch")]
    JsonPatch,
}

/// Human-readable outcome attached to fail-open responses
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Failure description for the API server audit log
    #[serde(default)]
    pub message: String,
}
