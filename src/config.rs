//! Process configuration read once from environment variables.
//!
//! Every component receives its configuration by value at construction
//! time; nothing below `main` reads the environment. Lookups go through a
//! caller-supplied function so tests can provide a fixed map.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::resources::RecordKind;

/// Default webhook listen address
pub const DEFAULT_LISTEN: &str = "0.0.0.0:8443";
/// Default health/metrics listen address
pub const DEFAULT_HEALTH_LISTEN: &str = "0.0.0.0:8080";
/// Default path of the CA certificate injected into pods
pub const DEFAULT_CA_CERT_PATH: &str = "/etc/webhook/certs/ca.crt";
/// Default mount path of the CA file inside every container
pub const DEFAULT_MOUNT_PATH: &str = "/etc/ssl/certs/injected-ca.pem";
/// Default name of the per-namespace trust record
pub const DEFAULT_RECORD_NAME: &str = "pod-ca-trust.crt";
/// Default key of the CA bytes within the trust record
pub const DEFAULT_RECORD_KEY: &str = "ca.crt";
/// Default name of the TLS secret written by the bootstrap
pub const DEFAULT_TLS_SECRET_NAME: &str = "pod-ca-trust-tls";
/// Default name of the MutatingWebhookConfiguration
pub const DEFAULT_WEBHOOK_NAME: &str = "pod-ca-trust";

/// Configuration errors. All of them are fatal at startup.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set
    #[error("ENV variable ${0} must be set")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed
    #[error("ENV variable ${name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Reads variables through a lookup function.
struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        (self.lookup)(name).ok_or(ConfigError::Missing(name))
    }

    fn with_default(&self, name: &'static str, default: &str) -> String {
        (self.lookup)(name).unwrap_or_else(|| default.to_string())
    }

    fn parse_with_default<T>(&self, name: &'static str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let value = self.with_default(name, default);
        value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value: value.clone(),
            reason: e.to_string(),
        })
    }
}

/// How pods are mutated and what gets provisioned per admission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InjectionConfig {
    /// Name of the trust record referenced by the injected volume
    pub record_name: String,
    /// Key of the CA bytes within the trust record; also the mount sub-path
    pub record_key: String,
    /// Whether the trust record is a ConfigMap or a Secret
    pub record_kind: RecordKind,
    /// File path the CA is mounted at in every container
    pub mount_path: String,
    /// Mark the volume source optional so a missing record does not block scheduling
    pub volume_optional: bool,
    /// Upsert the trust record on every non-dry-run admission
    pub provisioning: bool,
    /// Leave pods alone whose service account already references secrets
    pub skip_accounts_with_secrets: bool,
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            record_name: DEFAULT_RECORD_NAME.to_string(),
            record_key: DEFAULT_RECORD_KEY.to_string(),
            record_kind: RecordKind::ConfigMap,
            mount_path: DEFAULT_MOUNT_PATH.to_string(),
            volume_optional: false,
            provisioning: true,
            skip_accounts_with_secrets: false,
        }
    }
}

impl InjectionConfig {
    fn from_env<F>(env: &Env<F>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let record_kind = match env.with_default("CA_RECORD_KIND", "configmap").as_str() {
            "configmap" => RecordKind::ConfigMap,
            "secret" => RecordKind::Secret,
            other => {
                return Err(ConfigError::Invalid {
                    name: "CA_RECORD_KIND",
                    value: other.to_string(),
                    reason: "expected \"configmap\" or \"secret\"".to_string(),
                });
            }
        };

        Ok(Self {
            record_name: env.with_default("CA_RECORD_NAME", DEFAULT_RECORD_NAME),
            record_key: env.with_default("CA_RECORD_KEY", DEFAULT_RECORD_KEY),
            record_kind,
            mount_path: env.with_default("CA_BUNDLE_PATH", DEFAULT_MOUNT_PATH),
            volume_optional: env.parse_with_default("CA_VOLUME_OPTIONAL", "false")?,
            provisioning: env.parse_with_default("CA_PROVISIONING", "true")?,
            skip_accounts_with_secrets: env
                .parse_with_default("SKIP_ACCOUNTS_WITH_SECRETS", "false")?,
        })
    }
}

/// Configuration for serve mode.
#[derive(Clone, Debug)]
pub struct WebhookConfig {
    /// Webhook (TLS) listen address
    pub listen: SocketAddr,
    /// Health and metrics listen address
    pub health_listen: SocketAddr,
    /// Server certificate presented by the webhook
    pub tls_cert_path: PathBuf,
    /// Private key for the server certificate
    pub tls_key_path: PathBuf,
    /// CA certificate that gets injected into pods
    pub ca_cert_path: PathBuf,
    /// Pod mutation settings
    pub injection: InjectionConfig,
}

impl WebhookConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };
        Ok(Self {
            listen: env.parse_with_default("LISTEN", DEFAULT_LISTEN)?,
            health_listen: env.parse_with_default("HEALTH_LISTEN", DEFAULT_HEALTH_LISTEN)?,
            tls_cert_path: PathBuf::from(env.required("SERVE_TLS_CERT")?),
            tls_key_path: PathBuf::from(env.required("SERVE_TLS_KEY")?),
            ca_cert_path: PathBuf::from(env.with_default("CA_CERT_PATH", DEFAULT_CA_CERT_PATH)),
            injection: InjectionConfig::from_env(&env)?,
        })
    }
}

/// Configuration for the one-shot TLS bootstrap (`--tls-init`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// Namespace the TLS secret is written to
    pub namespace: String,
    /// Name of the TLS secret
    pub secret_name: String,
    /// Name of the MutatingWebhookConfiguration to patch
    pub webhook_name: String,
    /// DNS name the webhook service is reached at
    pub dns_name: String,
}

impl BootstrapConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };
        Ok(Self {
            namespace: env.required("TLS_NAMESPACE")?,
            secret_name: env.with_default("TLS_SECRET_NAME", DEFAULT_TLS_SECRET_NAME),
            webhook_name: env.with_default("WEBHOOK_NAME", DEFAULT_WEBHOOK_NAME),
            dns_name: env.required("TLS_DNS_NAME")?,
        })
    }
}
