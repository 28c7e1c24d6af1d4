//! HTTPS surface for the webhook
//!
//! One mutating endpoint and one liveness endpoint. Handlers stay thin:
//! raw bytes and the declared content type go into the pipeline, status
//! and bytes come back out. TLS is terminated here; the API server
//! refuses to call webhooks over plain HTTP.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use thiserror::Error;
use tracing::{error, info};

use crate::codec::MEDIA_TYPE_JSON;
use crate::pipeline::{Pipeline, Reply};

/// Drain window for in-flight requests once a shutdown signal arrives
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Errors starting or running the webhook server
#[derive(Debug, Error)]
pub enum ServeError {
    /// TLS key material could not be loaded
    #[error("failed to configure TLS: {0}")]
    TlsConfig(String),
    /// The server failed while binding or serving
    #[error("webhook server error: {0}")]
    Serve(String),
}

/// Build the webhook router
pub fn webhook_router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/mutate", post(mutate_handler))
        .route("/health", get(health_handler))
        .with_state(pipeline)
}

/// Handle `POST /mutate`: run the pipeline over the raw body
async fn mutate_handler(
    State(pipeline): State<Arc<Pipeline>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    pipeline.review(&body, content_type).await.into_response()
}

/// Handle `GET /health`: liveness only, no dependencies consulted
async fn health_handler() -> &'static str {
    "ok"
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Admission(bytes) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, MEDIA_TYPE_JSON)],
                bytes,
            )
                .into_response(),
            Reply::Rejected { status, reason } => (status, reason).into_response(),
        }
    }
}

/// Serve the webhook over TLS until a shutdown signal arrives
///
/// Binds `addr`, terminates TLS with the given certificate and key and
/// drains in-flight requests for up to [`SHUTDOWN_GRACE`] on SIGINT or
/// SIGTERM.
pub async fn serve(
    addr: SocketAddr,
    cert: &Path,
    key: &Path,
    pipeline: Arc<Pipeline>,
) -> Result<(), ServeError> {
    let tls = RustlsConfig::from_pem_file(cert, key)
        .await
        .map_err(|e| ServeError::TlsConfig(e.to_string()))?;

    let app = webhook_router(pipeline);
    let handle = Handle::new();
    tokio::spawn(shutdown_on_signal(handle.clone()));

    info!(addr = %addr, "webhook server listening");
    axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .map_err(|e| ServeError::Serve(e.to_string()))?;

    info!("webhook server stopped");
    Ok(())
}

/// Wait for SIGINT or SIGTERM, then start the graceful drain
async fn shutdown_on_signal(handle: Handle) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received, draining in-flight requests");
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ReviewCodec;
    use crate::decision::RuleSet;
    use crate::events::{EventSink, NoopEventSink};
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_router() -> Router {
        let sink: Arc<dyn EventSink> = Arc::new(NoopEventSink);
        let pipeline = Pipeline::new(ReviewCodec::new(), RuleSet::new(), sink);
        webhook_router(Arc::new(pipeline))
    }

    fn pod_review_body(labels: Value) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "http-uid-1",
                "kind": {"group": "", "version": "v1", "kind": "Pod"},
                "namespace": "default",
                "name": "web-0",
                "operation": "CREATE",
                "object": {"metadata": {"name": "web-0", "labels": labels}}
            }
        }))
        .unwrap()
    }

    fn mutate_request(content_type: Option<&str>, body: Vec<u8>) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri("/mutate");
        if let Some(value) = content_type {
            builder = builder.header(header::CONTENT_TYPE, value);
        }
        builder.body(Body::from(body)).unwrap()
    }

    // ==========================================================================
    // Integration Tests: HTTP Handlers
    // ==========================================================================

    #[tokio::test]
    async fn mutate_answers_the_envelope_with_a_patch() {
        let response = test_router()
            .oneshot(mutate_request(
                Some("application/json"),
                pod_review_body(json!({"changed": "false"})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let review: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(review["response"]["uid"], "http-uid-1");
        assert_eq!(review["response"]["allowed"], true);
        assert_eq!(review["response"]["patchType"], "JSONPatch");
    }

    #[tokio::test]
    async fn mutate_rejects_non_json_content_types() {
        let response = test_router()
            .oneshot(mutate_request(
                Some("text/plain"),
                pod_review_body(json!({"changed": "false"})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn mutate_without_content_type_is_rejected() {
        let response = test_router()
            .oneshot(mutate_request(None, pod_review_body(json!({}))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn mutate_rejects_garbage_bodies() {
        let response = test_router()
            .oneshot(mutate_request(
                Some("application/json"),
                b"not an envelope".to_vec(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let reason = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(reason.contains("malformed admission review"));
    }

    #[tokio::test]
    async fn mutate_only_accepts_post() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/mutate")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn health_answers_ok() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    // ==========================================================================
    // Unit Tests: Reply Conversion
    // ==========================================================================

    #[tokio::test]
    async fn admission_reply_converts_to_json_200() {
        let response = Reply::Admission(b"{\"allowed\":true}".to_vec()).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn rejected_reply_converts_to_plain_text_error() {
        let response = Reply::Rejected {
            status: StatusCode::UNSUPPORTED_MEDIA_TYPE,
            reason: "unsupported content type".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"unsupported content type");
    }
}
