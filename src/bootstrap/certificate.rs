//! Self-signed serving certificate for the webhook.
//!
//! The certificate doubles as its own CA: the API server is told to trust
//! exactly this certificate through the webhook registration's `caBundle`.

use p256::SecretKey;
use p256::pkcs8::{DecodePrivateKey, LineEnding};
use rcgen::{
    CertificateParams, DistinguishedName, DnType, DnValue, ExtendedKeyUsagePurpose, IsCa,
    KeyPair, KeyUsagePurpose, SerialNumber,
};

use crate::error::{Error, Result};

/// Subject common name of the serving certificate
pub const COMMON_NAME: &str = "pod-ca-trust-webhook";

/// Validity of the serving certificate (10 years)
pub const VALIDITY_DAYS: i64 = 3650;

/// PEM-encoded key pair and certificate
#[derive(Clone)]
pub struct KeyMaterial {
    /// SEC1 `EC PRIVATE KEY`
    pub private_key_pem: String,
    /// Self-signed certificate
    pub certificate_pem: String,
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("private_key_pem", &"<redacted>")
            .field("certificate_pem", &self.certificate_pem)
            .finish()
    }
}

/// Re-encode rcgen's PKCS#8 key as a SEC1 `EC PRIVATE KEY` block.
fn sec1_pem(key_pair: &KeyPair) -> Result<String> {
    let secret = SecretKey::from_pkcs8_der(&key_pair.serialize_der())
        .map_err(|e| Error::Certificate(format!("failed to decode private key: {}", e)))?;
    let pem = secret
        .to_sec1_pem(LineEnding::LF)
        .map_err(|e| Error::Certificate(format!("failed to encode private key: {}", e)))?;
    Ok(pem.as_str().to_string())
}

fn compute_validity(days: i64) -> (::time::OffsetDateTime, ::time::OffsetDateTime) {
    let now = ::time::OffsetDateTime::now_utc();
    (now, now + ::time::Duration::days(days))
}

/// Generate a fresh ECDSA key and a server certificate for `dns_name`.
pub fn generate_key_material(dns_name: &str) -> Result<KeyMaterial> {
    let key_pair = KeyPair::generate()
        .map_err(|e| Error::Certificate(format!("failed to generate key pair: {}", e)))?;

    let mut params = CertificateParams::new(vec![dns_name.to_string()])
        .map_err(|e| Error::Certificate(format!("invalid DNS name {:?}: {}", dns_name, e)))?;

    let mut dn = DistinguishedName::new();
    dn.push(
        DnType::CommonName,
        DnValue::Utf8String(COMMON_NAME.to_string()),
    );
    params.distinguished_name = dn;
    params.serial_number = Some(SerialNumber::from_slice(&[1]));
    params.is_ca = IsCa::ExplicitNoCa;
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];

    let (not_before, not_after) = compute_validity(VALIDITY_DAYS);
    params.not_before = not_before;
    params.not_after = not_after;

    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| Error::Certificate(format!("failed to sign certificate: {}", e)))?;

    Ok(KeyMaterial {
        private_key_pem: sec1_pem(&key_pair)?,
        certificate_pem: cert.pem(),
    })
}
