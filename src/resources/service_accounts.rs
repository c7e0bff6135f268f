//! Service account resolution for the injection policy.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ServiceAccount;
use kube::Client;
use kube::api::Api;

#[cfg(test)]
use mockall::automock;

use crate::error::Result;

/// Read access to service accounts.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ServiceAccountLookup: Send + Sync {
    /// Number of secrets the named service account references.
    async fn secret_count(&self, namespace: &str, name: &str) -> Result<usize>;
}

/// [`ServiceAccountLookup`] backed by the API server.
#[derive(Clone)]
pub struct KubeServiceAccounts {
    client: Client,
}

impl KubeServiceAccounts {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ServiceAccountLookup for KubeServiceAccounts {
    async fn secret_count(&self, namespace: &str, name: &str) -> Result<usize> {
        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);
        let account = api.get(name).await?;
        Ok(account.secrets.map(|s| s.len()).unwrap_or(0))
    }
}
