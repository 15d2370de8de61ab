//! Root CA material: generation, loading, and the bundled default.

use std::sync::{Arc, OnceLock};

use bon::Builder;
use time::OffsetDateTime;
use time::macros::datetime;
use tracing::{info, warn};

use crate::cert::Certificate;
use crate::cert::extensions::KeyUsages;
use crate::cert::params::DistinguishedName;
use crate::error::{CertMintError, Result};
use crate::issuer::self_sign;
use crate::key::KeyPair;
use crate::pem_utils::{decode_certificate, decode_private_key};
use crate::serial::{ClockSerial, SerialAllocator};
use crate::template::build_root;

const BUNDLED_CERT_PEM: &str = include_str!("../assets/root_ca.crt");
const BUNDLED_KEY_PEM: &str = include_str!("../assets/root_ca.key");

/// Fixed start of a generated root's validity.
pub const ROOT_NOT_BEFORE: OffsetDateTime = datetime!(2023-03-20 0:00 UTC);
/// Fixed end of a generated root's validity, a thousand years on, so that the
/// locally trusted root never expires in practice.
pub const ROOT_NOT_AFTER: OffsetDateTime = datetime!(3023-03-20 0:00 UTC);

/// The identity a generated root carries unless configured otherwise.
pub fn default_root_subject() -> DistinguishedName {
    DistinguishedName::builder()
        .common_name("Certmint Root CA".to_string())
        .country("US".to_string())
        .state("California".to_string())
        .locality("San Francisco".to_string())
        .organization("Certmint".to_string())
        .organization_unit("Certmint Proxy".to_string())
        .build()
}

/// Configuration for [`RootCa::generate_with`].
///
/// # Fields
/// * `subject` - Subject (and issuer) name of the root.
/// * `not_before` - Start of validity.
/// * `not_after` - End of validity.
/// * `max_path_length` - Basic constraints path length.
#[derive(Clone, Debug, Builder)]
pub struct RootOptions {
    #[builder(default = default_root_subject())]
    pub subject: DistinguishedName,
    #[builder(default = ROOT_NOT_BEFORE)]
    pub not_before: OffsetDateTime,
    #[builder(default = ROOT_NOT_AFTER)]
    pub not_after: OffsetDateTime,
    #[builder(default = 1)]
    pub max_path_length: u8,
}

impl Default for RootOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A root certificate paired with its private key.
///
/// Built once and then shared read-only, usually behind an `Arc`. Nothing
/// hands out mutable access, so leaf issuance cannot change the root.
#[derive(Debug, Clone)]
pub struct RootCa {
    cert: Certificate,
    key: KeyPair,
}

impl RootCa {
    /// Self-signs a new root for `key` with the default identity and a
    /// clock-derived serial.
    pub fn generate(key: KeyPair) -> Result<Self> {
        Self::generate_with(key, &RootOptions::default(), &ClockSerial)
    }

    pub fn generate_with(
        key: KeyPair,
        options: &RootOptions,
        serials: &dyn SerialAllocator,
    ) -> Result<Self> {
        let template = build_root(options, serials.next_serial());
        let cert = self_sign(template, &key)?;
        info!(
            subject = %cert.common_name(),
            fingerprint = %cert.fingerprint_sha256(),
            "generated root CA"
        );
        Ok(Self { cert, key })
    }

    /// Loads a root from a `CERTIFICATE` PEM block and an `EC PRIVATE KEY`
    /// (or PKCS#8 `PRIVATE KEY`) PEM block.
    ///
    /// Every failure, including a decode error, is reported as `LoadError`.
    pub fn load(cert_pem: impl AsRef<[u8]>, key_pem: impl AsRef<[u8]>) -> Result<Self> {
        load_parts(cert_pem.as_ref(), key_pem.as_ref()).map_err(CertMintError::into_load)
    }

    /// Pairs an already parsed certificate with its key.
    ///
    /// The certificate must be a CA allowed to sign certificates, and its
    /// public key must be the key's.
    pub fn from_parts(cert: Certificate, key: KeyPair) -> Result<Self> {
        if !cert.is_ca() {
            return Err(CertMintError::LoadError(
                "root certificate is not a CA".to_string(),
            ));
        }
        let usage = cert.key_usage();
        if !usage.is_empty() && !usage.contains(KeyUsages::KeyCertSign) {
            return Err(CertMintError::LoadError(
                "root certificate may not sign certificates".to_string(),
            ));
        }
        if cert.public_key()? != key.public_key() {
            return Err(CertMintError::LoadError(
                "private key does not match root certificate".to_string(),
            ));
        }
        Ok(Self { cert, key })
    }

    /// The root compiled into the crate, loaded on first use and kept for the
    /// life of the process. A load failure is remembered and returned to
    /// every caller.
    pub fn bundled() -> Result<Arc<RootCa>> {
        static BUNDLED: OnceLock<Result<Arc<RootCa>>> = OnceLock::new();
        BUNDLED
            .get_or_init(|| match RootCa::load(BUNDLED_CERT_PEM, BUNDLED_KEY_PEM) {
                Ok(root) => {
                    info!(
                        fingerprint = %root.cert.fingerprint_sha256(),
                        "loaded bundled root CA"
                    );
                    Ok(Arc::new(root))
                }
                Err(err) => {
                    warn!(error = %err, "bundled root CA failed to load");
                    Err(err)
                }
            })
            .clone()
    }

    pub fn certificate(&self) -> &Certificate {
        &self.cert
    }

    pub fn key(&self) -> &KeyPair {
        &self.key
    }

    pub fn subject(&self) -> &DistinguishedName {
        self.cert.subject()
    }

    /// `(certificate PEM, private key PEM)`, e.g. for installing into a trust
    /// store or persisting a generated root.
    pub fn to_pem_pair(&self) -> Result<(String, String)> {
        Ok((self.cert.to_pem(), self.key.to_pem()?))
    }
}

fn load_parts(cert_pem: &[u8], key_pem: &[u8]) -> Result<RootCa> {
    let cert = decode_certificate(cert_pem)?;
    let key = decode_private_key(key_pem)?;
    RootCa::from_parts(cert, key)
}

/// Supplies the root that leaves are signed with.
pub trait RootMaterial: Send + Sync {
    fn root(&self) -> Result<Arc<RootCa>>;
}

impl RootMaterial for Arc<RootCa> {
    fn root(&self) -> Result<Arc<RootCa>> {
        Ok(Arc::clone(self))
    }
}

/// Provider for the root compiled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledRoot;

impl RootMaterial for BundledRoot {
    fn root(&self) -> Result<Arc<RootCa>> {
        RootCa::bundled()
    }
}
