// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Integration tests for pod-ca-trust
//!
//! These tests require a running Kubernetes cluster accessible via kubeconfig.
//! Tests are marked with #[ignore] and must be run explicitly:
//!
//! ```bash
//! # Run all integration tests (parallel execution supported)
//! cargo test --test integration -- --ignored
//!
//! # Run specific test
//! cargo test --test integration test_trust_record_upsert_is_idempotent -- --ignored
//! ```
//!
//! The tests use your existing kubeconfig (~/.kube/config or KUBECONFIG env var).
//!
//! ## Design Principles
//!
//! - **Parallel Test Execution**: Each test creates its own namespace
//! - **RAII Cleanup**: TestNamespace implements Drop for automatic cleanup even on panic
//! - **Real API Semantics**: Server-side apply and JSON patches hit a real API server

// Shared test fixtures (used by functional, proptest, and integration)
#[path = "../common/mod.rs"]
mod common;

mod namespace;

mod service_account_tests;

pub use namespace::*;

/// Client for the cluster under test.
pub async fn test_client() -> kube::Client {
    kube::Client::try_default()
        .await
        .expect("Failed to create Kubernetes client - is a cluster reachable?")
}
