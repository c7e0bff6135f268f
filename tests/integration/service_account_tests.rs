//! Service account lookups for the injection policy.

use k8s_openapi::api::core::v1::{ObjectReference, ServiceAccount};
use kube::api::{ObjectMeta, PostParams};

use pod_ca_trust::resources::{KubeServiceAccounts, ServiceAccountLookup};

use crate::{TestNamespace, test_client};

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires Kubernetes cluster"]
async fn test_secret_count_reflects_account() {
    let ns = TestNamespace::create(test_client().await, "accounts").await;
    let api = ns.api::<ServiceAccount>();

    let account = ServiceAccount {
        metadata: ObjectMeta {
            name: Some("builder".to_string()),
            ..Default::default()
        },
        secrets: Some(vec![ObjectReference {
            name: Some("registry-token".to_string()),
            ..Default::default()
        }]),
        ..Default::default()
    };
    api.create(&PostParams::default(), &account).await.unwrap();

    let lookup = KubeServiceAccounts::new(ns.client());
    assert_eq!(lookup.secret_count(ns.name(), "builder").await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires Kubernetes cluster"]
async fn test_missing_account_is_not_found() {
    let ns = TestNamespace::create(test_client().await, "accounts").await;
    let lookup = KubeServiceAccounts::new(ns.client());

    let err = lookup.secret_count(ns.name(), "ghost").await.unwrap_err();
    assert!(err.is_not_found());
}
