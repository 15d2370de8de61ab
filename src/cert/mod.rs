pub mod extensions;
pub mod params;

use std::net::IpAddr;

use der::{Decode, Encode};
use extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, ExtendedKeyUsageOption, KeyUsage,
    SubjectAltName, SubjectKeyIdentifier, ToAndFromX509Extension,
};
use params::{DistinguishedName, Validity};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::error::{CertMintError, Result};
use crate::key::PublicKey;

/// `ecdsa-with-SHA256`, the only signature algorithm this crate produces.
pub(crate) fn ecdsa_with_sha256() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
        parameters: None,
    }
}

/// Represents a parsed X.509 certificate.
///
/// A `Certificate` is read-only: it keeps the exact DER it was parsed from and
/// the decoded fields this crate cares about. Anything that needs a variant
/// of a certificate builds a new
/// [`CertificateTemplate`](params::CertificateTemplate) instead.
#[derive(Debug, Clone)]
pub struct Certificate {
    inner: x509_cert::Certificate,
    der: Vec<u8>,
    subject: DistinguishedName,
    issuer: DistinguishedName,
    subject_alt_name: SubjectAltName,
    validity: Validity,
    basic_constraints: Option<BasicConstraints>,
    key_usage: Option<KeyUsage>,
    extended_key_usage: ExtendedKeyUsage,
    subject_key_id: Option<Vec<u8>>,
    authority_key_id: Option<Vec<u8>>,
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

impl Certificate {
    /// Parses a DER-encoded certificate.
    ///
    /// The extensions this crate models are decoded eagerly, so a malformed
    /// SAN, basic constraints, key usage, or key identifier fails here rather
    /// than later.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = x509_cert::Certificate::from_der(der)?;
        let tbs = &inner.tbs_certificate;

        let mut subject_alt_name = SubjectAltName::default();
        let mut basic_constraints = None;
        let mut key_usage = None;
        let mut extended_key_usage = ExtendedKeyUsage::default();
        let mut subject_key_id = None;
        let mut authority_key_id = None;

        for ext in tbs.extensions.iter().flatten() {
            let value = ext.extn_value.as_bytes();
            let id = ext.extn_id;
            if id == SubjectAltName::OID {
                subject_alt_name = SubjectAltName::from_x509_extension_value(value)?;
            } else if id == BasicConstraints::OID {
                basic_constraints = Some(BasicConstraints::from_x509_extension_value(value)?);
            } else if id == KeyUsage::OID {
                key_usage = Some(KeyUsage::from_x509_extension_value(value)?);
            } else if id == ExtendedKeyUsage::OID {
                extended_key_usage = ExtendedKeyUsage::from_x509_extension_value(value)?;
            } else if id == SubjectKeyIdentifier::OID {
                subject_key_id = Some(SubjectKeyIdentifier::from_x509_extension_value(value)?.0);
            } else if id == AuthorityKeyIdentifier::OID {
                authority_key_id =
                    Some(AuthorityKeyIdentifier::from_x509_extension_value(value)?.key_identifier);
            }
        }

        let validity = Validity {
            not_before: from_x509_time(&tbs.validity.not_before)?,
            not_after: from_x509_time(&tbs.validity.not_after)?,
        };

        Ok(Self {
            subject: DistinguishedName::from_x509_name(&tbs.subject),
            issuer: DistinguishedName::from_x509_name(&tbs.issuer),
            subject_alt_name,
            validity,
            basic_constraints,
            key_usage,
            extended_key_usage,
            subject_key_id,
            authority_key_id,
            der: der.to_vec(),
            inner,
        })
    }

    /// Parses the first `CERTIFICATE` block of a PEM document.
    pub fn from_pem(input: impl AsRef<[u8]>) -> Result<Self> {
        crate::pem_utils::decode_certificate(input)
    }

    /// The DER encoding this certificate was parsed from.
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// Encodes the certificate into PEM format.
    pub fn to_pem(&self) -> String {
        crate::pem_utils::encode_certificate(self)
    }

    /// X.509 version number as written on certificates (1, 2 or 3).
    pub fn version(&self) -> u8 {
        match self.inner.tbs_certificate.version {
            x509_cert::Version::V1 => 1,
            x509_cert::Version::V2 => 2,
            x509_cert::Version::V3 => 3,
        }
    }

    /// Big-endian serial number octets, exactly as encoded.
    pub fn serial_number(&self) -> &[u8] {
        self.inner.tbs_certificate.serial_number.as_bytes()
    }

    /// The serial number as an integer. Fails for serials wider than 128 bits.
    pub fn serial(&self) -> Result<u128> {
        crate::serial::serial_from_bytes(self.serial_number())
    }

    pub fn subject(&self) -> &DistinguishedName {
        &self.subject
    }

    pub fn issuer(&self) -> &DistinguishedName {
        &self.issuer
    }

    pub fn common_name(&self) -> &str {
        &self.subject.common_name
    }

    pub fn subject_alt_name(&self) -> &SubjectAltName {
        &self.subject_alt_name
    }

    pub fn dns_names(&self) -> &[String] {
        &self.subject_alt_name.dns_names
    }

    pub fn ip_addresses(&self) -> &[IpAddr] {
        &self.subject_alt_name.ip_addresses
    }

    pub fn validity(&self) -> &Validity {
        &self.validity
    }

    pub fn basic_constraints(&self) -> Option<&BasicConstraints> {
        self.basic_constraints.as_ref()
    }

    pub fn is_ca(&self) -> bool {
        self.basic_constraints.is_some_and(|bc| bc.is_ca)
    }

    pub fn max_path_length(&self) -> Option<u8> {
        self.basic_constraints.and_then(|bc| bc.max_path_length)
    }

    /// Key usage bits. Empty when the extension is absent.
    pub fn key_usage(&self) -> KeyUsage {
        self.key_usage.unwrap_or_default()
    }

    pub fn extended_key_usage(&self) -> &[ExtendedKeyUsageOption] {
        &self.extended_key_usage.usage
    }

    pub fn subject_key_id(&self) -> Option<&[u8]> {
        self.subject_key_id.as_deref()
    }

    pub fn authority_key_id(&self) -> Option<&[u8]> {
        self.authority_key_id.as_deref()
    }

    pub fn subject_public_key_info(&self) -> &SubjectPublicKeyInfoOwned {
        &self.inner.tbs_certificate.subject_public_key_info
    }

    /// The subject's public key. Fails for anything other than P-256.
    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(self.subject_public_key_info())
    }

    /// Whether subject and issuer are the same encoded name.
    pub fn is_self_issued(&self) -> bool {
        self.inner.tbs_certificate.subject == self.inner.tbs_certificate.issuer
    }

    /// Checks that this certificate was signed by the holder of `issuer_key`.
    pub fn verify_signed_by(&self, issuer_key: &PublicKey) -> Result<()> {
        if self.inner.signature_algorithm.oid != const_oid::db::rfc5912::ECDSA_WITH_SHA_256 {
            return Err(CertMintError::SigningError(format!(
                "unsupported signature algorithm {}",
                self.inner.signature_algorithm.oid
            )));
        }
        let tbs = self
            .inner
            .tbs_certificate
            .to_der()
            .map_err(|e| CertMintError::SigningError(e.to_string()))?;
        let signature = self.inner.signature.as_bytes().ok_or_else(|| {
            CertMintError::SigningError("signature has unused bits".to_string())
        })?;
        issuer_key.verify(&tbs, signature)
    }

    /// Lowercase hex SHA-256 over the DER encoding.
    pub fn fingerprint_sha256(&self) -> String {
        Sha256::digest(&self.der)
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    /// The underlying `x509-cert` structure.
    pub fn inner(&self) -> &x509_cert::Certificate {
        &self.inner
    }
}

fn from_x509_time(time: &x509_cert::time::Time) -> Result<OffsetDateTime> {
    let secs = time.to_unix_duration().as_secs();
    i64::try_from(secs)
        .ok()
        .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
        .ok_or_else(|| CertMintError::DecodingError(format!("time out of range: {secs}s")))
}
