use der::Encode;
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;

use crate::cert::extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, SubjectAltName,
    SubjectKeyIdentifier,
};
use crate::cert::params::{CertificateTemplate, DistinguishedName, ExtensionParam};
use crate::cert::{Certificate, ecdsa_with_sha256};
use crate::error::{CertMintError, Result};
use crate::key::{KeyPair, PublicKey};
use crate::tbs_certificate::TbsCertificate;

/// Represents an entity capable of issuing certificates.
///
/// This trait provides methods to retrieve issuer details and issue certificates.
pub trait Issuer {
    /// Returns the distinguished name of the issuer.
    fn issuer_name(&self) -> &DistinguishedName;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// The issuer name as it goes into the `issuer` field.
    fn issuer_x509_name(&self) -> Result<Name> {
        self.issuer_name().as_x509_name()
    }

    /// The key identifier for the authority key identifier extension, or
    /// `None` to leave the extension out.
    fn authority_key_id(&self) -> Option<Vec<u8>> {
        Some(self.signing_key().public_key().key_identifier())
    }

    /// The key an issued certificate must verify under.
    fn verification_key(&self) -> Result<PublicKey> {
        Ok(self.signing_key().public_key())
    }

    /// Signs `template` for `subject_public_key`.
    ///
    /// The DER output is parsed back and its signature checked against
    /// [`Issuer::verification_key`], so a malformed or mis-signed certificate
    /// is reported here. Unrepresentable template values are `InvalidInput`;
    /// every other failure is `SigningError`.
    fn issue(
        &self,
        template: CertificateTemplate,
        subject_public_key: &PublicKey,
    ) -> Result<Certificate> {
        sign_with(self, template, subject_public_key).map_err(|err| match err {
            CertMintError::InvalidInput(_) => err,
            other => other.into_signing(),
        })
    }
}

fn sign_with<I: Issuer + ?Sized>(
    issuer: &I,
    template: CertificateTemplate,
    subject_public_key: &PublicKey,
) -> Result<Certificate> {
    let extensions = template_extensions(&template, subject_public_key, issuer.authority_key_id())?;

    let tbs_cert = TbsCertificate {
        serial_number: template.serial_number,
        issuer: issuer.issuer_x509_name()?,
        validity: template.validity,
        subject: template.subject,
        subject_public_key: *subject_public_key,
        extensions,
    };

    let tbs_cert_inner = tbs_cert.to_tbs_certificate_inner()?;
    let signature = issuer.signing_key().sign_data(&tbs_cert_inner.to_der()?);

    let cert_inner = CertificateInner {
        tbs_certificate: tbs_cert_inner,
        signature_algorithm: ecdsa_with_sha256(),
        signature: der::asn1::BitString::from_bytes(&signature)?,
    };

    let certificate = Certificate::from_der(&cert_inner.to_der()?)?;
    certificate.verify_signed_by(&issuer.verification_key()?)?;
    Ok(certificate)
}

fn template_extensions(
    template: &CertificateTemplate,
    subject_public_key: &PublicKey,
    authority_key_id: Option<Vec<u8>>,
) -> Result<Vec<ExtensionParam>> {
    let basic_constraints = BasicConstraints {
        is_ca: template.is_ca,
        max_path_length: template.max_path_length,
    };
    let mut extensions = vec![ExtensionParam::from_extension(basic_constraints, true)?];

    if !template.key_usage.is_empty() {
        extensions.push(ExtensionParam::from_extension(template.key_usage, true)?);
    }

    if !template.extended_key_usage.is_empty() {
        let extended_key_usage = ExtendedKeyUsage {
            usage: template.extended_key_usage.clone(),
        };
        extensions.push(ExtensionParam::from_extension(extended_key_usage, false)?);
    }

    let san = SubjectAltName {
        dns_names: template.dns_names.clone(),
        ip_addresses: template.ip_addresses.clone(),
    };
    if !san.is_empty() {
        // RFC 5280 4.2.1.6: critical when the subject name is empty.
        let subject_is_empty = template.subject.as_x509_name()?.0.is_empty();
        extensions.push(ExtensionParam::from_extension(san, subject_is_empty)?);
    }

    if template.is_ca {
        let ski = SubjectKeyIdentifier(subject_public_key.key_identifier());
        extensions.push(ExtensionParam::from_extension(ski, false)?);
    }

    if let Some(key_identifier) = authority_key_id {
        let aki = AuthorityKeyIdentifier { key_identifier };
        extensions.push(ExtensionParam::from_extension(aki, false)?);
    }

    Ok(extensions)
}

/// Issues certificates on behalf of an existing CA certificate.
///
/// The issuer name is copied byte for byte from the CA's subject so that
/// chain building matches it exactly.
pub struct CertificateIssuer<'a> {
    cert: &'a Certificate,
    key: &'a KeyPair,
}

impl<'a> CertificateIssuer<'a> {
    pub fn new(cert: &'a Certificate, key: &'a KeyPair) -> Self {
        Self { cert, key }
    }
}

impl Issuer for CertificateIssuer<'_> {
    fn issuer_name(&self) -> &DistinguishedName {
        self.cert.subject()
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }

    fn issuer_x509_name(&self) -> Result<Name> {
        Ok(self.cert.inner().tbs_certificate.subject.clone())
    }

    fn authority_key_id(&self) -> Option<Vec<u8>> {
        Some(
            self.cert
                .subject_key_id()
                .map(<[u8]>::to_vec)
                .unwrap_or_else(|| self.key.public_key().key_identifier()),
        )
    }

    fn verification_key(&self) -> Result<PublicKey> {
        self.cert.public_key()
    }
}

/// Issuer for self-signed certificates: the issuer is the subject itself.
pub(crate) struct SelfIssuer<'a> {
    pub(crate) name: &'a DistinguishedName,
    pub(crate) key: &'a KeyPair,
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self) -> &DistinguishedName {
        self.name
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }

    fn authority_key_id(&self) -> Option<Vec<u8>> {
        None
    }
}

/// Signs `template` with `issuer_key` as `issuer_cert`.
///
/// The result is verified against `issuer_cert`'s public key, so passing a
/// key that does not belong to `issuer_cert` fails with `SigningError`.
pub fn sign(
    template: CertificateTemplate,
    issuer_cert: &Certificate,
    issuer_key: &KeyPair,
    subject_public_key: &PublicKey,
) -> Result<Certificate> {
    CertificateIssuer::new(issuer_cert, issuer_key).issue(template, subject_public_key)
}

/// Signs `template` with `key`, using the template's own subject as issuer.
pub fn self_sign(template: CertificateTemplate, key: &KeyPair) -> Result<Certificate> {
    let name = template.subject.clone();
    SelfIssuer { name: &name, key }.issue(template, &key.public_key())
}
