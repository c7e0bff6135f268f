//! pod-ca-trust library crate
//!
//! A mutating admission webhook that makes a cluster CA available to every
//! Pod: the CA is provisioned into each Pod's namespace and mounted into
//! each container. The same binary can bootstrap its own serving
//! certificate with `--tls-init`.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod health;
pub mod resources;
pub mod webhooks;

pub use config::{BootstrapConfig, ConfigError, InjectionConfig, WebhookConfig};
pub use error::{Error, Result};
pub use health::HealthState;
pub use webhooks::{CaInjector, WebhookError, WebhookState, run_webhook_server};

use std::sync::Arc;

use kube::Client;
use tracing::info;

use resources::{KubeServiceAccounts, KubeTrustStore, WEBHOOK_FIELD_MANAGER};

/// Wire the injector to the cluster the client points at.
///
/// `ca_bundle` is the CA content handed to every namespace; it is read once
/// at startup and never reloaded.
pub fn build_webhook_state(
    client: Client,
    config: &WebhookConfig,
    ca_bundle: Vec<u8>,
    health_state: Option<Arc<HealthState>>,
) -> Arc<WebhookState> {
    info!(
        record_name = %config.injection.record_name,
        record_kind = ?config.injection.record_kind,
        mount_path = %config.injection.mount_path,
        provisioning = config.injection.provisioning,
        "Configuring CA injection"
    );

    let injector = CaInjector::new(
        config.injection.clone(),
        ca_bundle,
        Arc::new(KubeTrustStore::new(client.clone(), WEBHOOK_FIELD_MANAGER)),
        Arc::new(KubeServiceAccounts::new(client)),
    );
    let state = match health_state {
        Some(health) => {
            WebhookState::new(Arc::new(injector.with_health_state(health.clone())))
                .with_health_state(health)
        }
        None => WebhookState::new(Arc::new(injector)),
    };
    Arc::new(state)
}
