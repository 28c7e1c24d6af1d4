//! Supported-kind check
//!
//! The webhook mutates exactly one resource kind. Every other kind is
//! admitted unchanged without the decision tier ever looking at the
//! object body.

use crate::admission::AdmissionRequest;

/// The one resource kind this webhook mutates
pub const SUPPORTED_KIND: &str = "Pod";

/// Verdict of the kind check
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classification {
    /// Request targets the supported kind; the body may be interpreted
    Supported,
    /// Any other kind; admit unchanged, skip the decision tier
    Unsupported {
        /// Declared kind, kept for logging
        kind: String,
    },
}

/// Classify a request by its declared kind descriptor
///
/// Case-sensitive comparison on the kind name alone; group and version
/// are not consulted.
pub fn classify(request: &AdmissionRequest) -> Classification {
    if request.kind.kind == SUPPORTED_KIND {
        Classification::Supported
    } else {
        Classification::Unsupported {
            kind: request.kind.kind.clone(),
        }
    }
}
