// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Functional tests for the admission webhook and the TLS bootstrap.
//!
//! These tests drive the HTTP router and the bootstrap sequence end to end
//! WITHOUT requiring a live Kubernetes cluster. Cluster access is replaced
//! by mocks of the trust store, service account and registration seams.
//!
//! ```bash
//! # Run all functional tests
//! cargo test --test functional
//!
//! # Run specific test
//! cargo test --test functional test_sample_pod_gets_three_operations
//! ```
//!
//! ## Test Categories
//!
//! - **Admission tests**: full AdmissionReview round trips through the router
//! - **Bootstrap tests**: secret and registration writes of `--tls-init`

#[path = "../common/mod.rs"]
mod common;

mod mocks;

pub use mocks::*;
