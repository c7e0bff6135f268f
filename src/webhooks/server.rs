//! Admission webhook server.
//!
//! Accepts `AdmissionReview` documents on `POST /mutate` (and `POST /` for
//! registrations that omit a path) and answers with the review produced by
//! [`CaInjector`]. Bodies that are not a review at all get HTTP 400; every
//! decided request gets HTTP 200, including denials.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use axum_server::tls_rustls::RustlsConfig;
use kube::core::DynamicObject;
use kube::core::admission::{AdmissionResponse, AdmissionReview};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::health::HealthState;
use crate::webhooks::injector::{CaInjector, Outcome, RawAdmission, internal_error};

/// Upper bound for answering one review
pub const ADMISSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared state for webhook handlers
pub struct WebhookState {
    pub injector: Arc<CaInjector>,
    health_state: Option<Arc<HealthState>>,
}

impl WebhookState {
    pub fn new(injector: Arc<CaInjector>) -> Self {
        Self {
            injector,
            health_state: None,
        }
    }

    pub fn with_health_state(mut self, health_state: Arc<HealthState>) -> Self {
        self.health_state = Some(health_state);
        self
    }
}

/// Errors that can occur when serving the webhook
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The body is not a usable AdmissionReview
    #[error("invalid AdmissionReview: {0}")]
    Decode(String),

    /// TLS configuration error
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    /// Server error
    #[error("webhook server error: {0}")]
    Server(String),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match self {
            WebhookError::Decode(_) => StatusCode::BAD_REQUEST,
            WebhookError::TlsConfig(_) | WebhookError::Server(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}

fn decode_review(body: &[u8]) -> Result<RawAdmission, WebhookError> {
    let review: Value =
        serde_json::from_slice(body).map_err(|e| WebhookError::Decode(e.to_string()))?;
    RawAdmission::from_review(review).map_err(WebhookError::Decode)
}

/// Create the webhook router
pub fn create_webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/mutate", post(mutate))
        .route("/", post(mutate))
        .with_state(state)
}

async fn mutate(
    State(state): State<Arc<WebhookState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<AdmissionReview<DynamicObject>>), WebhookError> {
    let admission = decode_review(&body).inspect_err(|e| {
        error!(error = %e, "Rejecting admission body");
    })?;
    let request = &admission.request;

    debug!(
        uid = %request.uid,
        operation = ?request.operation,
        namespace = ?request.namespace,
        name = %request.name,
        "Processing admission request"
    );

    let response: AdmissionResponse =
        match tokio::time::timeout(ADMISSION_TIMEOUT, state.injector.evaluate(&admission)).await {
            Ok(response) => response,
            Err(_) => {
                error!(uid = %request.uid, "Admission decision timed out");
                if let Some(ref health) = state.health_state {
                    health
                        .metrics
                        .record_admission(Outcome::InternalError, ADMISSION_TIMEOUT.as_secs_f64());
                }
                internal_error(request, "admission decision timed out")
            }
        };

    Ok((StatusCode::OK, Json(response.into_review())))
}

/// Run the webhook server with TLS
///
/// Marks the health state ready once the TLS material is loaded and the
/// listener is about to accept connections.
pub async fn run_webhook_server(
    state: Arc<WebhookState>,
    addr: SocketAddr,
    cert_path: &Path,
    key_path: &Path,
) -> Result<(), WebhookError> {
    let app = create_webhook_router(state.clone());

    let config = RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(|e| WebhookError::TlsConfig(e.to_string()))?;

    info!(addr = %addr, "Webhook server listening with TLS");
    if let Some(ref health) = state.health_state {
        health.set_ready(true).await;
    }

    axum_server::bind_rustls(addr, config)
        .serve(app.into_make_service())
        .await
        .map_err(|e| WebhookError::Server(e.to_string()))?;

    Ok(())
}
