//! Trust record upserts.
//!
//! A trust record is a namespaced ConfigMap or Secret holding CA bytes.
//! Writes are blind server-side applies under a fixed field manager: no
//! prior read, so concurrent admissions in the same namespace converge on
//! the same object without conflicts.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Client;
use kube::api::{Api, Patch, PatchParams};
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::error::Result;
use crate::resources::common::standard_labels;

/// Field manager used by the admission webhook
pub const WEBHOOK_FIELD_MANAGER: &str = "pod-ca-trust-webhook";
/// Field manager used by the TLS bootstrap
pub const BOOTSTRAP_FIELD_MANAGER: &str = "pod-ca-trust-tls-init";

/// Secret type for TLS key pairs
const SECRET_TYPE_TLS: &str = "kubernetes.io/tls";

/// The kind of object a trust record is stored as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    /// Plain ConfigMap (UTF-8 entries go to `data`, anything else to `binaryData`)
    ConfigMap,
    /// Opaque Secret
    Secret,
    /// `kubernetes.io/tls` Secret
    TlsSecret,
}

/// A named, namespaced key-value object holding trust material.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrustRecord {
    pub namespace: String,
    pub name: String,
    pub kind: RecordKind,
    pub entries: BTreeMap<String, Vec<u8>>,
}

impl TrustRecord {
    /// Record with a single entry.
    pub fn single(
        kind: RecordKind,
        namespace: impl Into<String>,
        name: impl Into<String>,
        key: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(key.into(), bytes.into());
        Self {
            namespace: namespace.into(),
            name: name.into(),
            kind,
            entries,
        }
    }

    fn metadata(&self) -> ObjectMeta {
        ObjectMeta {
            name: Some(self.name.clone()),
            namespace: Some(self.namespace.clone()),
            labels: Some(standard_labels("trust-record")),
            ..Default::default()
        }
    }

    /// Render as a ConfigMap.
    pub fn to_config_map(&self) -> ConfigMap {
        let mut data = BTreeMap::new();
        let mut binary_data = BTreeMap::new();
        for (key, bytes) in &self.entries {
            match String::from_utf8(bytes.clone()) {
                Ok(text) => {
                    data.insert(key.clone(), text);
                }
                Err(e) => {
                    binary_data.insert(key.clone(), ByteString(e.into_bytes()));
                }
            }
        }

        ConfigMap {
            metadata: self.metadata(),
            data: (!data.is_empty()).then_some(data),
            binary_data: (!binary_data.is_empty()).then_some(binary_data),
            ..Default::default()
        }
    }

    /// Render as a Secret; the type follows the record kind.
    pub fn to_secret(&self) -> Secret {
        let data = self
            .entries
            .iter()
            .map(|(key, bytes)| (key.clone(), ByteString(bytes.clone())))
            .collect();

        Secret {
            metadata: self.metadata(),
            type_: match self.kind {
                RecordKind::TlsSecret => Some(SECRET_TYPE_TLS.to_string()),
                _ => Some("Opaque".to_string()),
            },
            data: Some(data),
            ..Default::default()
        }
    }
}

/// Idempotent create-or-update of trust records.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TrustStore: Send + Sync {
    /// Create or update the record. Identical calls converge.
    async fn upsert(&self, record: &TrustRecord) -> Result<()>;
}

/// [`TrustStore`] backed by server-side apply.
#[derive(Clone)]
pub struct KubeTrustStore {
    client: Client,
    field_manager: &'static str,
}

impl KubeTrustStore {
    pub fn new(client: Client, field_manager: &'static str) -> Self {
        Self {
            client,
            field_manager,
        }
    }
}

#[async_trait]
impl TrustStore for KubeTrustStore {
    async fn upsert(&self, record: &TrustRecord) -> Result<()> {
        let params = PatchParams::apply(self.field_manager).force();
        debug!(
            namespace = %record.namespace,
            name = %record.name,
            kind = ?record.kind,
            field_manager = self.field_manager,
            "Applying trust record"
        );

        match record.kind {
            RecordKind::ConfigMap => {
                let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), &record.namespace);
                api.patch(&record.name, &params, &Patch::Apply(&record.to_config_map()))
                    .await?;
            }
            RecordKind::Secret | RecordKind::TlsSecret => {
                let api: Api<Secret> = Api::namespaced(self.client.clone(), &record.namespace);
                api.patch(&record.name, &params, &Patch::Apply(&record.to_secret()))
                    .await?;
            }
        }
        Ok(())
    }
}
