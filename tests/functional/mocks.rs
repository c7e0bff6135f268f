//! Mocks for the cluster-facing seams.

use async_trait::async_trait;
use mockall::mock;

use pod_ca_trust::{Error, Result};
use pod_ca_trust::resources::{ServiceAccountLookup, TrustRecord, TrustStore, WebhookRegistration};

mock! {
    pub Store {}

    #[async_trait]
    impl TrustStore for Store {
        async fn upsert(&self, record: &TrustRecord) -> Result<()>;
    }
}

mock! {
    pub Accounts {}

    #[async_trait]
    impl ServiceAccountLookup for Accounts {
        async fn secret_count(&self, namespace: &str, name: &str) -> Result<usize>;
    }
}

mock! {
    pub Registration {}

    #[async_trait]
    impl WebhookRegistration for Registration {
        async fn set_ca_bundle(&self, webhook_name: &str, ca_pem: &[u8]) -> Result<()>;
    }
}

/// A store that accepts every upsert.
pub fn accepting_store() -> MockStore {
    let mut store = MockStore::new();
    store.expect_upsert().returning(|_| Ok(()));
    store
}

/// The API server refusing a write.
pub fn forbidden(message: &str) -> Error {
    Error::Kube(kube::Error::Api(kube::error::ErrorResponse {
        status: "Failure".to_string(),
        message: message.to_string(),
        reason: "Forbidden".to_string(),
        code: 403,
    }))
}
