//! CA bundle publication on the MutatingWebhookConfiguration.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use json_patch::{Patch as JsonPatch, PatchOperation, ReplaceOperation};
use jsonptr::PointerBuf;
use k8s_openapi::api::admissionregistration::v1::MutatingWebhookConfiguration;
use kube::Client;
use kube::api::{Api, Patch, PatchParams};
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::error::Result;

/// Location of the CA bundle within the registration object
pub const CA_BUNDLE_POINTER: [&str; 4] = ["webhooks", "0", "clientConfig", "caBundle"];

/// Build the single `replace` operation that publishes a CA bundle.
///
/// `caBundle` is a byte field, so the value is the base64 of the PEM.
pub fn ca_bundle_patch(ca_pem: &[u8]) -> JsonPatch {
    JsonPatch(vec![PatchOperation::Replace(ReplaceOperation {
        path: PointerBuf::from_tokens(CA_BUNDLE_POINTER),
        value: serde_json::Value::String(STANDARD.encode(ca_pem)),
    })])
}

/// Writer of the webhook registration's CA bundle.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WebhookRegistration: Send + Sync {
    /// Replace the CA bundle of the first webhook in the named registration.
    async fn set_ca_bundle(&self, webhook_name: &str, ca_pem: &[u8]) -> Result<()>;
}

/// [`WebhookRegistration`] backed by a JSON patch against the API server.
#[derive(Clone)]
pub struct KubeWebhookRegistration {
    client: Client,
    field_manager: &'static str,
}

impl KubeWebhookRegistration {
    pub fn new(client: Client, field_manager: &'static str) -> Self {
        Self {
            client,
            field_manager,
        }
    }
}

#[async_trait]
impl WebhookRegistration for KubeWebhookRegistration {
    async fn set_ca_bundle(&self, webhook_name: &str, ca_pem: &[u8]) -> Result<()> {
        let api: Api<MutatingWebhookConfiguration> = Api::all(self.client.clone());
        let params = PatchParams {
            field_manager: Some(self.field_manager.to_string()),
            ..Default::default()
        };
        debug!(webhook = %webhook_name, "Patching CA bundle");
        api.patch(
            webhook_name,
            &params,
            &Patch::Json::<()>(ca_bundle_patch(ca_pem)),
        )
        .await?;
        Ok(())
    }
}
