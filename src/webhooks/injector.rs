//! CA injection: the admission decision for a single Pod.
//!
//! [`CaInjector::evaluate`] never fails. Malformed objects become a
//! `BadRequest` result, provisioning and patch failures an `InternalError`
//! result; everything else is allowed, with or without a patch.

use std::sync::Arc;
use std::time::Instant;

use k8s_openapi::api::core::v1::Pod;
use kube::core::admission::{
    AdmissionRequest, AdmissionResponse, AdmissionReview, ConvertAdmissionReviewError,
};
use kube::core::{DynamicObject, GroupVersionKind, Status};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::InjectionConfig;
use crate::health::HealthState;
use crate::resources::{ServiceAccountLookup, TrustRecord, TrustStore};
use crate::webhooks::mutation;
use crate::webhooks::patch;
use crate::webhooks::policy::{self, PolicyDecision};

/// Warning returned for objects that are not Pods
pub const WRONG_TYPE_WARNING: &str = "wrong object type sent to the webhook, ignored";

/// Terminal outcome of one admission, used for logs and metrics
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Not a Pod
    Ignored,
    /// The object could not be decoded
    BadRequest,
    /// The service account policy skipped the Pod
    Covered,
    /// Already mutated, nothing to patch
    Unchanged,
    /// A patch was returned
    Patched,
    /// Provisioning, lookup or patch generation failed
    InternalError,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Ignored => "ignored",
            Outcome::BadRequest => "bad_request",
            Outcome::Covered => "covered",
            Outcome::Unchanged => "unchanged",
            Outcome::Patched => "patched",
            Outcome::InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn pod_gvk() -> GroupVersionKind {
    GroupVersionKind::gvk("", "v1", "Pod")
}

/// Allowed response carrying a single warning.
fn allowed_with_warning<T>(request: &AdmissionRequest<T>, warning: String) -> AdmissionResponse
where
    T: kube::Resource,
{
    let mut response = AdmissionResponse::from(request);
    response.warnings = Some(vec![warning]);
    response
}

/// Denial for an object that could not be decoded.
pub fn bad_request<T>(request: &AdmissionRequest<T>, message: &str) -> AdmissionResponse
where
    T: kube::Resource,
{
    let mut response = AdmissionResponse::from(request).deny(message);
    response.result = Status::failure(message, "BadRequest").with_code(400);
    response
}

/// Denial for a failure on our side.
pub fn internal_error<T>(request: &AdmissionRequest<T>, message: &str) -> AdmissionResponse
where
    T: kube::Resource,
{
    let mut response = AdmissionResponse::from(request).deny(message);
    response.result = Status::failure(message, "InternalError").with_code(500);
    response
}

/// Name used in logs; pods created from a template only have a generate name.
fn pod_display_name(pod: &Pod) -> String {
    match (&pod.metadata.name, &pod.metadata.generate_name) {
        (Some(name), _) if !name.is_empty() => name.clone(),
        (_, Some(prefix)) => format!("{}???", prefix),
        _ => "???".to_string(),
    }
}

/// An admission request with the admitted object kept as raw JSON.
///
/// The envelope is decoded on its own so that an object the typed models
/// reject is still answered with a `BadRequest` result for its UID.
#[derive(Clone, Debug)]
pub struct RawAdmission {
    pub request: AdmissionRequest<DynamicObject>,
    pub object: Option<Value>,
}

impl RawAdmission {
    /// Split an `AdmissionReview` document into envelope and object.
    ///
    /// `oldObject` is dropped; nothing here looks at it.
    pub fn from_review(mut review: Value) -> Result<Self, String> {
        let object = review
            .get_mut("request")
            .and_then(Value::as_object_mut)
            .and_then(|request| {
                request.remove("oldObject");
                request.remove("object")
            })
            .filter(|object| !object.is_null());

        let review: AdmissionReview<DynamicObject> =
            serde_json::from_value(review).map_err(|e| e.to_string())?;
        let request: AdmissionRequest<DynamicObject> = review
            .try_into()
            .map_err(|e: ConvertAdmissionReviewError| e.to_string())?;
        Ok(Self { request, object })
    }
}

fn decode_pod(object: Option<&Value>) -> Result<Pod, String> {
    let object = object.ok_or_else(|| "missing object in admission request".to_string())?;
    Pod::deserialize(object).map_err(|e| e.to_string())
}

/// Admission logic for CA injection.
///
/// Holds only immutable state, so one instance serves all requests
/// concurrently.
pub struct CaInjector {
    config: InjectionConfig,
    ca_bundle: Vec<u8>,
    store: Arc<dyn TrustStore>,
    accounts: Arc<dyn ServiceAccountLookup>,
    health_state: Option<Arc<HealthState>>,
}

impl CaInjector {
    /// Create an injector for the given configuration and CA bytes.
    pub fn new(
        config: InjectionConfig,
        ca_bundle: Vec<u8>,
        store: Arc<dyn TrustStore>,
        accounts: Arc<dyn ServiceAccountLookup>,
    ) -> Self {
        Self {
            config,
            ca_bundle,
            store,
            accounts,
            health_state: None,
        }
    }

    /// Record admission metrics into the given health state.
    pub fn with_health_state(mut self, health_state: Arc<HealthState>) -> Self {
        self.health_state = Some(health_state);
        self
    }

    /// Decide on one admission request.
    pub async fn evaluate(&self, admission: &RawAdmission) -> AdmissionResponse {
        let started = Instant::now();
        let (response, outcome) = self.decide(admission).await;
        if let Some(ref state) = self.health_state {
            state
                .metrics
                .record_admission(outcome, started.elapsed().as_secs_f64());
        }
        response
    }

    fn trust_record(&self, namespace: &str) -> TrustRecord {
        TrustRecord::single(
            self.config.record_kind,
            namespace,
            self.config.record_name.as_str(),
            self.config.record_key.as_str(),
            self.ca_bundle.clone(),
        )
    }

    async fn decide(&self, admission: &RawAdmission) -> (AdmissionResponse, Outcome) {
        let request = &admission.request;
        let uid = &request.uid;

        if request.kind != pod_gvk() {
            warn!(
                uid = %uid,
                kind = %request.kind.kind,
                name = %request.name,
                "Wrong object type sent to the webhook, ignored"
            );
            return (
                allowed_with_warning(request, WRONG_TYPE_WARNING.to_string()),
                Outcome::Ignored,
            );
        }

        let pod = match decode_pod(admission.object.as_ref()) {
            Ok(pod) => pod,
            Err(message) => {
                error!(uid = %uid, error = %message, "Failed to decode Pod");
                return (bad_request(request, &message), Outcome::BadRequest);
            }
        };

        let namespace = request
            .namespace
            .clone()
            .or_else(|| pod.metadata.namespace.clone())
            .unwrap_or_default();
        let pod_name = pod_display_name(&pod);

        if self.config.skip_accounts_with_secrets {
            match policy::evaluate(&pod, &namespace, self.accounts.as_ref()).await {
                Ok(PolicyDecision::Inject) => {}
                Ok(PolicyDecision::AlreadyCovered { service_account }) => {
                    info!(
                        uid = %uid,
                        namespace = %namespace,
                        pod = %pod_name,
                        service_account = %service_account,
                        "Pod service account already references secrets, skipped"
                    );
                    let warning = format!(
                        "Pod \"{}/{}\" uses service account {:?} which already references secrets, CA not injected",
                        namespace, pod_name, service_account
                    );
                    return (allowed_with_warning(request, warning), Outcome::Covered);
                }
                Err(e) => {
                    return self.fail(
                        request,
                        &namespace,
                        &pod_name,
                        format!("resolving service account: {}", e),
                    );
                }
            }
        }

        if request.dry_run {
            debug!(uid = %uid, namespace = %namespace, "Dry run, skipping trust record");
        } else if self.config.provisioning {
            info!(
                uid = %uid,
                namespace = %namespace,
                record = %self.config.record_name,
                "Applying CA trust record"
            );
            if let Err(e) = self.store.upsert(&self.trust_record(&namespace)).await {
                if let Some(ref state) = self.health_state {
                    state.metrics.record_provisioning_error();
                }
                return self.fail(
                    request,
                    &namespace,
                    &pod_name,
                    format!("applying CA trust record: {}", e),
                );
            }
        }

        let mut mutated = pod.clone();
        mutation::inject(&mut mutated, &self.config);

        let patch = match patch::diff_objects(&pod, &mutated) {
            Ok(Some(patch)) => patch,
            Ok(None) => {
                info!(uid = %uid, "Pod \"{}/{}\" unchanged.", namespace, pod_name);
                return (AdmissionResponse::from(request), Outcome::Unchanged);
            }
            Err(e) => {
                return self.fail(
                    request,
                    &namespace,
                    &pod_name,
                    format!("generating patch: {}", e),
                );
            }
        };

        let paths = patch::touched_paths(&patch);
        match AdmissionResponse::from(request).with_patch(patch) {
            Ok(response) => {
                info!(
                    uid = %uid,
                    paths = ?paths,
                    "Pod \"{}/{}\" patched.",
                    namespace,
                    pod_name
                );
                (response, Outcome::Patched)
            }
            Err(e) => self.fail(
                request,
                &namespace,
                &pod_name,
                format!("serializing patch: {}", e),
            ),
        }
    }

    fn fail(
        &self,
        request: &AdmissionRequest<DynamicObject>,
        namespace: &str,
        pod_name: &str,
        message: String,
    ) -> (AdmissionResponse, Outcome) {
        error!(
            uid = %request.uid,
            namespace = %namespace,
            pod = %pod_name,
            error = %message,
            "Admission failed"
        );
        (internal_error(request, &message), Outcome::InternalError)
    }
}
