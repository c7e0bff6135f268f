//! Kubernetes-facing clients used by the webhook and the TLS bootstrap.
//!
//! ## Objects Written
//!
//! | Object | Writer | Purpose |
//! |--------|--------|---------|
//! | ConfigMap / Secret | webhook | Per-namespace CA trust record mounted into pods |
//! | TLS Secret | bootstrap | The webhook's own key pair and certificate |
//! | MutatingWebhookConfiguration | bootstrap | CA bundle the API server trusts |
//!
//! Each writer sits behind a small trait so the injector and the bootstrap
//! can be exercised without a cluster.

pub mod common;
pub mod registration;
pub mod service_accounts;
pub mod trust_store;

pub use common::standard_labels;
pub use registration::{KubeWebhookRegistration, WebhookRegistration, ca_bundle_patch};
pub use service_accounts::{KubeServiceAccounts, ServiceAccountLookup};
pub use trust_store::{
    BOOTSTRAP_FIELD_MANAGER, KubeTrustStore, RecordKind, TrustRecord, TrustStore,
    WEBHOOK_FIELD_MANAGER,
};
