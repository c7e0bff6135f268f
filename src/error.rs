//! Error types shared by the webhook and the TLS bootstrap.
//!
//! Admission-level errors are never surfaced to the transport: the
//! injector converts them into a structured admission result. They only
//! escape as-is from the bootstrap path, where they are fatal.

use thiserror::Error;

/// Error type for Kubernetes-facing operations
#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key or certificate generation failed
    #[error("Certificate error: {0}")]
    Certificate(String),
}

impl Error {
    /// Check if this error indicates a not-found condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Kube(kube::Error::Api(e)) if e.code == 404)
    }
}

/// Result type alias for Kubernetes-facing operations
pub type Result<T> = std::result::Result<T, Error>;

/// API server rejection with the given status code, for mocked clients.
#[cfg(test)]
pub(crate) fn api_error(code: u16, reason: &str, message: &str) -> Error {
    Error::Kube(kube::Error::Api(kube::error::ErrorResponse {
        status: "Failure".to_string(),
        message: message.to_string(),
        reason: reason.to_string(),
        code,
    }))
}
