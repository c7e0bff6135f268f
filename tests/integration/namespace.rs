//! Throwaway namespaces for the cluster tests.
//!
//! Trust records are namespaced, so every test writes into a namespace of its
//! own and removes it on drop. Needs `#[tokio::test(flavor = "multi_thread")]`
//! because the drop blocks on the delete.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Namespace;
use kube::Client;
use kube::api::{Api, DeleteParams, ObjectMeta, PostParams, PropagationPolicy};
use kube::core::NamespaceResourceScope;
use uuid::Uuid;

/// Label put on every namespace created here, for sweeping leftovers with
/// `kubectl delete ns -l pod-ca-trust.test/suite=integration`.
pub const SUITE_LABEL: &str = "pod-ca-trust.test/suite";

pub struct TestNamespace {
    client: Client,
    name: String,
}

impl TestNamespace {
    /// Create `{prefix}-{8 hex chars}`.
    pub async fn create(client: Client, prefix: &str) -> Self {
        let name = format!("{}-{}", prefix, &Uuid::new_v4().simple().to_string()[..8]);

        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some(name.clone()),
                labels: Some(BTreeMap::from([(
                    SUITE_LABEL.to_string(),
                    "integration".to_string(),
                )])),
                ..Default::default()
            },
            ..Default::default()
        };
        Api::<Namespace>::all(client.clone())
            .create(&PostParams::default(), &namespace)
            .await
            .unwrap_or_else(|e| panic!("creating namespace {}: {}", name, e));

        Self { client, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> Client {
        self.client.clone()
    }

    pub fn api<K>(&self) -> Api<K>
    where
        K: kube::Resource<Scope = NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), &self.name)
    }
}

impl Drop for TestNamespace {
    fn drop(&mut self) {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let params = DeleteParams {
            propagation_policy: Some(PropagationPolicy::Background),
            ..Default::default()
        };
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                match api.delete(&self.name, &params).await {
                    Ok(_) => {}
                    Err(kube::Error::Api(e)) if e.code == 404 => {}
                    Err(e) => eprintln!("leaving namespace {} behind: {}", self.name, e),
                }
            });
        });
    }
}
