//! Mutating admission webhook for CA injection.
//!
//! - `patch`: structural JSON Patch generation
//! - `mutation`: the CA volume and mounts added to a Pod
//! - `policy`: optional service account check
//! - `injector`: the admission decision for one request
//! - `server`: HTTPS endpoint wiring

pub mod injector;
pub mod mutation;
pub mod patch;
pub mod policy;
mod server;

pub use injector::{CaInjector, Outcome, RawAdmission, WRONG_TYPE_WARNING};
pub use mutation::INJECTED_VOLUME_NAME;
pub use server::{
    ADMISSION_TIMEOUT, WebhookError, WebhookState, create_webhook_router, run_webhook_server,
};

// Re-export kube-rs admission types for contract testing
pub use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
