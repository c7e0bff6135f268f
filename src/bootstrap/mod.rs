//! One-shot TLS bootstrap (`--tls-init`).
//!
//! Generates the serving key and certificate, stores them in the TLS secret
//! the webhook Deployment mounts, and publishes the certificate as the CA
//! bundle of the webhook registration. The secret is written before the
//! registration is patched, so the API server never trusts a certificate
//! the webhook cannot present.

pub mod certificate;

use std::sync::Arc;

use kube::Client;
use thiserror::Error;
use tracing::info;

use crate::config::BootstrapConfig;
use crate::error::Error;
use crate::resources::{
    BOOTSTRAP_FIELD_MANAGER, KubeTrustStore, KubeWebhookRegistration, RecordKind, TrustRecord,
    TrustStore, WebhookRegistration,
};

pub use certificate::{KeyMaterial, generate_key_material};

/// Secret key holding the private key
pub const TLS_KEY_KEY: &str = "tls.key";
/// Secret key holding the serving certificate
pub const TLS_CERT_KEY: &str = "tls.crt";
/// Secret key holding the CA certificate
pub const CA_CERT_KEY: &str = "ca.crt";

/// Errors that abort the bootstrap
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("generating key material: {0}")]
    Generate(#[source] Error),

    #[error("storing TLS secret {namespace}/{name}: {source}")]
    Persist {
        namespace: String,
        name: String,
        #[source]
        source: Error,
    },

    #[error("patching webhook {name}: {source}")]
    Register {
        name: String,
        #[source]
        source: Error,
    },
}

/// The TLS secret for freshly generated key material.
///
/// The certificate is self-signed, so it is also stored as `ca.crt`.
pub fn tls_secret_record(config: &BootstrapConfig, material: &KeyMaterial) -> TrustRecord {
    let mut record = TrustRecord::single(
        RecordKind::TlsSecret,
        config.namespace.as_str(),
        config.secret_name.as_str(),
        TLS_KEY_KEY,
        material.private_key_pem.as_bytes(),
    );
    record.entries.insert(
        TLS_CERT_KEY.to_string(),
        material.certificate_pem.as_bytes().to_vec(),
    );
    record.entries.insert(
        CA_CERT_KEY.to_string(),
        material.certificate_pem.as_bytes().to_vec(),
    );
    record
}

/// Runs the bootstrap steps against injected collaborators.
pub struct Bootstrapper {
    store: Arc<dyn TrustStore>,
    registration: Arc<dyn WebhookRegistration>,
}

impl Bootstrapper {
    pub fn new(store: Arc<dyn TrustStore>, registration: Arc<dyn WebhookRegistration>) -> Self {
        Self {
            store,
            registration,
        }
    }

    /// Generate, persist, then register. Stops at the first failure.
    pub async fn bootstrap(&self, config: &BootstrapConfig) -> Result<KeyMaterial, BootstrapError> {
        let material = generate_key_material(&config.dns_name).map_err(BootstrapError::Generate)?;
        info!(dns_name = %config.dns_name, "Generated serving certificate");

        let record = tls_secret_record(config, &material);
        self.store
            .upsert(&record)
            .await
            .map_err(|source| BootstrapError::Persist {
                namespace: config.namespace.clone(),
                name: config.secret_name.clone(),
                source,
            })?;
        info!(
            namespace = %config.namespace,
            secret = %config.secret_name,
            "Stored TLS secret"
        );

        self.registration
            .set_ca_bundle(&config.webhook_name, material.certificate_pem.as_bytes())
            .await
            .map_err(|source| BootstrapError::Register {
                name: config.webhook_name.clone(),
                source,
            })?;
        info!(webhook = %config.webhook_name, "Published CA bundle");

        Ok(material)
    }
}

/// Bootstrap against the cluster the client points at.
pub async fn run_bootstrap(client: Client, config: &BootstrapConfig) -> Result<(), BootstrapError> {
    let bootstrapper = Bootstrapper::new(
        Arc::new(KubeTrustStore::new(client.clone(), BOOTSTRAP_FIELD_MANAGER)),
        Arc::new(KubeWebhookRegistration::new(client, BOOTSTRAP_FIELD_MANAGER)),
    );
    bootstrapper.bootstrap(config).await?;
    Ok(())
}
