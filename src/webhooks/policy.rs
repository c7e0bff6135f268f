//! Service account policy.
//!
//! Pods running under a service account that already references secrets are
//! treated as covered by an existing trust arrangement and left alone.

use k8s_openapi::api::core::v1::Pod;

use crate::error::Result;
use crate::resources::ServiceAccountLookup;

/// Outcome of the service account policy
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicyDecision {
    /// Provision the trust record and mutate the pod
    Inject,
    /// The pod's service account already references secrets
    AlreadyCovered { service_account: String },
}

/// Resolve the pod's service account and decide whether to inject.
///
/// Pods without an explicit service account are always injected.
pub async fn evaluate(
    pod: &Pod,
    namespace: &str,
    accounts: &dyn ServiceAccountLookup,
) -> Result<PolicyDecision> {
    let Some(service_account) = pod
        .spec
        .as_ref()
        .and_then(|spec| spec.service_account_name.as_deref())
        .filter(|name| !name.is_empty())
    else {
        return Ok(PolicyDecision::Inject);
    };

    if accounts.secret_count(namespace, service_account).await? > 0 {
        Ok(PolicyDecision::AlreadyCovered {
            service_account: service_account.to_string(),
        })
    } else {
        Ok(PolicyDecision::Inject)
    }
}
