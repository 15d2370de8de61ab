use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use const_oid::AssociatedOid;
use der::{
    Decode, Encode,
    asn1::{Ia5String, OctetString},
    oid::ObjectIdentifier,
};
use x509_cert::ext::pkix::name::GeneralName;

use crate::error::CertMintError;

/// Trait for converting to and from X.509 extensions.
///
/// This trait provides methods to encode and decode X.509 extension values.
///
/// # Example
/// ```
/// use certmint::cert::extensions::{SubjectAltName, ToAndFromX509Extension};
/// let san = SubjectAltName::dns("example.com");
/// let encoded = san.to_x509_extension_value().unwrap();
/// let decoded = SubjectAltName::from_x509_extension_value(&encoded).unwrap();
/// assert_eq!(san, decoded);
/// ```
pub trait ToAndFromX509Extension {
    /// The Object Identifier (OID) for the extension.
    const OID: ObjectIdentifier;

    /// Encodes the extension into a DER-encoded byte vector.
    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertMintError>;

    /// Decodes the extension from a DER-encoded byte slice.
    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertMintError>
    where
        Self: Sized;
}

/// Represents the Subject Alternative Name (SAN) extension.
///
/// Only DNS names and IP addresses are modelled. Other general name forms
/// found while decoding (URIs, e-mail addresses, directory names) are skipped.
///
/// # Fields
/// * `dns_names` - DNS names, encoded first.
/// * `ip_addresses` - IP addresses, 4 or 16 octets on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectAltName {
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
}

impl SubjectAltName {
    pub fn dns(name: impl Into<String>) -> Self {
        Self {
            dns_names: vec![name.into()],
            ip_addresses: vec![],
        }
    }

    pub fn ip(ip: IpAddr) -> Self {
        Self {
            dns_names: vec![],
            ip_addresses: vec![ip],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dns_names.is_empty() && self.ip_addresses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dns_names.len() + self.ip_addresses.len()
    }
}

impl ToAndFromX509Extension for SubjectAltName {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectAltName::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertMintError> {
        let dns = self.dns_names.iter().map(|name| {
            Ia5String::try_from(name.clone())
                .map(GeneralName::DnsName)
                .map_err(|_| {
                    CertMintError::InvalidInput(format!("{name:?} is not a valid DNS name"))
                })
        });
        let ips = self.ip_addresses.iter().map(|ip| -> Result<GeneralName, CertMintError> {
            let octets = match ip {
                IpAddr::V4(v4) => v4.octets().to_vec(),
                IpAddr::V6(v6) => v6.octets().to_vec(),
            };
            Ok(GeneralName::IpAddress(OctetString::new(octets)?))
        });
        let names = dns.chain(ips).collect::<Result<Vec<_>, _>>()?;
        let san = x509_cert::ext::pkix::SubjectAltName(names);

        san.to_der()
            .map_err(|e| CertMintError::EncodingError(e.to_string()))
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertMintError> {
        let san = x509_cert::ext::pkix::SubjectAltName::from_der(extension)?;
        let mut decoded = Self::default();
        for name in san.0.iter() {
            match name {
                GeneralName::DnsName(dns) => decoded.dns_names.push(dns.to_string()),
                GeneralName::IpAddress(octets) => {
                    decoded.ip_addresses.push(ip_from_octets(octets.as_bytes())?)
                }
                _ => {}
            }
        }
        Ok(decoded)
    }
}

fn ip_from_octets(octets: &[u8]) -> Result<IpAddr, CertMintError> {
    if let Ok(v4) = <[u8; 4]>::try_from(octets) {
        return Ok(IpAddr::V4(Ipv4Addr::from(v4)));
    }
    if let Ok(v6) = <[u8; 16]>::try_from(octets) {
        return Ok(IpAddr::V6(Ipv6Addr::from(v6)));
    }
    Err(CertMintError::DecodingError(format!(
        "IP address SAN of {} octets",
        octets.len()
    )))
}

/// Represents the Basic Constraints extension.
///
/// This extension indicates whether the certificate is a CA certificate and its path length.
///
/// # Fields
/// * `is_ca` - Indicates if the certificate is a CA.
/// * `max_path_length` - The maximum number of intermediate CAs allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BasicConstraints {
    pub is_ca: bool,
    pub max_path_length: Option<u8>,
}

impl ToAndFromX509Extension for BasicConstraints {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::BasicConstraints::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertMintError> {
        let bc = x509_cert::ext::pkix::BasicConstraints {
            ca: self.is_ca,
            path_len_constraint: self.max_path_length.filter(|_| self.is_ca),
        };

        bc.to_der()
            .map_err(|e| CertMintError::EncodingError(e.to_string()))
    }

    fn from_x509_extension_value(der_bytes: &[u8]) -> Result<Self, CertMintError> {
        let bc = x509_cert::ext::pkix::BasicConstraints::from_der(der_bytes)?;
        Ok(Self {
            is_ca: bc.ca,
            max_path_length: bc.path_len_constraint,
        })
    }
}

pub use der::flagset::FlagSet;
use x509_cert::ext::pkix::KeyUsage as X509KeyUsage;
pub use x509_cert::ext::pkix::KeyUsages;

/// Represents the Key Usage extension.
///
/// This extension defines the purpose of the key contained in the certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyUsage(pub FlagSet<KeyUsages>);

impl KeyUsage {
    /// `keyCertSign` and `cRLSign`, for a CA.
    pub fn certificate_authority() -> Self {
        KeyUsage(KeyUsages::KeyCertSign | KeyUsages::CRLSign)
    }

    /// `digitalSignature` and `keyEncipherment`, for a TLS endpoint.
    pub fn tls_endpoint() -> Self {
        KeyUsage(KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment)
    }

    pub fn contains(&self, usage: KeyUsages) -> bool {
        self.0.contains(usage)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl ToAndFromX509Extension for KeyUsage {
    const OID: ObjectIdentifier = <X509KeyUsage as AssociatedOid>::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertMintError> {
        let ku = X509KeyUsage(self.0);
        ku.to_der()
            .map_err(|e| CertMintError::EncodingError(e.to_string()))
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertMintError> {
        let ku = X509KeyUsage::from_der(extension)?;
        Ok(Self(ku.0))
    }
}

/// Represents the Extended Key Usage extension.
///
/// This extension indicates purposes for which the public key may be used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedKeyUsage {
    pub usage: Vec<ExtendedKeyUsageOption>,
}

impl ToAndFromX509Extension for ExtendedKeyUsage {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::ExtendedKeyUsage::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertMintError> {
        let oids: Vec<ObjectIdentifier> = self.usage.iter().map(|v| (*v).into()).collect();
        let eku = x509_cert::ext::pkix::ExtendedKeyUsage(oids);
        eku.to_der()
            .map_err(|e| CertMintError::EncodingError(e.to_string()))
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertMintError> {
        let eku = x509_cert::ext::pkix::ExtendedKeyUsage::from_der(extension)?;
        let usage = eku.0.iter().map(|v| ExtendedKeyUsageOption::from(*v)).collect();
        Ok(Self { usage })
    }
}

/// Represents an option for the Extended Key Usage extension.
///
/// Purposes without a named variant survive decoding as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedKeyUsageOption {
    ServerAuth,
    ClientAuth,
    CodeSigning,
    EmailProtection,
    TimeStamping,
    OcspSigning,
    Other(ObjectIdentifier),
}

impl From<ExtendedKeyUsageOption> for ObjectIdentifier {
    fn from(value: ExtendedKeyUsageOption) -> Self {
        match value {
            ExtendedKeyUsageOption::OcspSigning => const_oid::db::rfc5912::ID_KP_OCSP_SIGNING,
            ExtendedKeyUsageOption::ServerAuth => const_oid::db::rfc5912::ID_KP_SERVER_AUTH,
            ExtendedKeyUsageOption::ClientAuth => const_oid::db::rfc5912::ID_KP_CLIENT_AUTH,
            ExtendedKeyUsageOption::CodeSigning => const_oid::db::rfc5912::ID_KP_CODE_SIGNING,
            ExtendedKeyUsageOption::EmailProtection => {
                const_oid::db::rfc5912::ID_KP_EMAIL_PROTECTION
            }
            ExtendedKeyUsageOption::TimeStamping => const_oid::db::rfc5912::ID_KP_TIME_STAMPING,
            ExtendedKeyUsageOption::Other(oid) => oid,
        }
    }
}

impl From<ObjectIdentifier> for ExtendedKeyUsageOption {
    fn from(oid: ObjectIdentifier) -> Self {
        match oid {
            const_oid::db::rfc5912::ID_KP_OCSP_SIGNING => ExtendedKeyUsageOption::OcspSigning,
            const_oid::db::rfc5912::ID_KP_SERVER_AUTH => ExtendedKeyUsageOption::ServerAuth,
            const_oid::db::rfc5912::ID_KP_CLIENT_AUTH => ExtendedKeyUsageOption::ClientAuth,
            const_oid::db::rfc5912::ID_KP_CODE_SIGNING => ExtendedKeyUsageOption::CodeSigning,
            const_oid::db::rfc5912::ID_KP_EMAIL_PROTECTION => {
                ExtendedKeyUsageOption::EmailProtection
            }
            const_oid::db::rfc5912::ID_KP_TIME_STAMPING => ExtendedKeyUsageOption::TimeStamping,
            other => ExtendedKeyUsageOption::Other(other),
        }
    }
}

/// Represents the Subject Key Identifier (SKI) extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectKeyIdentifier(pub Vec<u8>);

impl ToAndFromX509Extension for SubjectKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertMintError> {
        let ski = x509_cert::ext::pkix::SubjectKeyIdentifier(OctetString::new(self.0.as_slice())?);
        ski.to_der()
            .map_err(|e| CertMintError::EncodingError(e.to_string()))
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertMintError> {
        let ski = x509_cert::ext::pkix::SubjectKeyIdentifier::from_der(extension)?;
        Ok(Self(ski.0.as_bytes().to_vec()))
    }
}

/// Represents the Authority Key Identifier (AKI) extension.
///
/// Only the `keyIdentifier` form is produced; the issuer name and serial
/// alternatives are ignored when decoding.
///
/// # Fields
/// * `key_identifier` - The subject key identifier of the signing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityKeyIdentifier {
    pub key_identifier: Vec<u8>,
}

impl ToAndFromX509Extension for AuthorityKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::AuthorityKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertMintError> {
        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier {
            key_identifier: Some(OctetString::new(self.key_identifier.as_slice())?),
            authority_cert_issuer: None,
            authority_cert_serial_number: None,
        };

        aki.to_der()
            .map_err(|e| CertMintError::EncodingError(e.to_string()))
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertMintError> {
        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier::from_der(extension)?;
        Ok(Self {
            key_identifier: aki
                .key_identifier
                .map(|id| id.as_bytes().to_vec())
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_constraints_encoding_decoding() {
        let original = BasicConstraints {
            is_ca: true,
            max_path_length: Some(1),
        };
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = BasicConstraints::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_basic_constraints_drops_path_length_for_leaf() {
        let leaf = BasicConstraints {
            is_ca: false,
            max_path_length: Some(3),
        };
        let encoded = leaf.to_x509_extension_value().unwrap();
        let decoded = BasicConstraints::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(decoded, BasicConstraints::default());
    }

    #[test]
    fn test_san_keeps_dns_and_ip_entries() {
        let original = SubjectAltName {
            dns_names: vec!["a.example.com".to_string(), "b.example.com".to_string()],
            ip_addresses: vec!["127.0.0.1".parse().unwrap(), "::1".parse().unwrap()],
        };
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = SubjectAltName::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original, decoded);
        assert_eq!(decoded.len(), 4);
    }

    #[test]
    fn test_san_rejects_non_ascii_dns_name() {
        let san = SubjectAltName::dns("bücher.example");
        assert!(matches!(
            san.to_x509_extension_value(),
            Err(CertMintError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_san_skips_unmodelled_names() {
        let raw = x509_cert::ext::pkix::SubjectAltName(vec![
            GeneralName::Rfc822Name(Ia5String::new("ops@example.com").unwrap()),
            GeneralName::DnsName(Ia5String::new("example.com").unwrap()),
        ]);
        let decoded = SubjectAltName::from_x509_extension_value(&raw.to_der().unwrap()).unwrap();
        assert_eq!(decoded, SubjectAltName::dns("example.com"));
    }

    #[test]
    fn test_key_usage_encoding_decoding() {
        let original = KeyUsage::tls_endpoint();
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = KeyUsage::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original, decoded);
        assert!(decoded.contains(KeyUsages::KeyEncipherment));
        assert!(!decoded.contains(KeyUsages::KeyCertSign));
    }

    #[test]
    fn test_extended_key_usage_keeps_unknown_purposes() {
        let custom = ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.10.3.3");
        let original = ExtendedKeyUsage {
            usage: vec![
                ExtendedKeyUsageOption::ServerAuth,
                ExtendedKeyUsageOption::ClientAuth,
                ExtendedKeyUsageOption::Other(custom),
            ],
        };
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = ExtendedKeyUsage::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_key_identifiers_encoding_decoding() {
        let ski = SubjectKeyIdentifier(vec![1, 2, 3, 4, 5]);
        let decoded =
            SubjectKeyIdentifier::from_x509_extension_value(&ski.to_x509_extension_value().unwrap())
                .unwrap();
        assert_eq!(ski, decoded);

        let aki = AuthorityKeyIdentifier {
            key_identifier: vec![6, 7, 8, 9, 10],
        };
        let decoded = AuthorityKeyIdentifier::from_x509_extension_value(
            &aki.to_x509_extension_value().unwrap(),
        )
        .unwrap();
        assert_eq!(aki, decoded);
    }
}
