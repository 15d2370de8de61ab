use der::Encode;
use der::asn1::{GeneralizedTime, OctetString, UtcTime};
use time::OffsetDateTime;
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::Time;

use crate::cert::ecdsa_with_sha256;
use crate::cert::params::{DistinguishedName, ExtensionParam, Validity};
use crate::error::{CertMintError, Result};
use crate::key::PublicKey;
use crate::serial::serial_to_bytes;

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
/// This struct contains all the fields required to generate a valid X.509 certificate.
///
/// # Fields
/// * `serial_number` - The unique identifier for the certificate.
/// * `issuer` - The issuer name, copied verbatim from the issuing certificate.
/// * `validity` - The certificate's validity period.
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key` - The public key of the certificate subject.
/// * `extensions` - Additional X.509 extensions for the certificate.
pub struct TbsCertificate {
    pub serial_number: u128,
    pub issuer: Name,
    pub validity: Validity,
    pub subject: DistinguishedName,
    pub subject_public_key: PublicKey,
    pub extensions: Vec<ExtensionParam>,
}

impl TbsCertificate {
    /// Converts the `TbsCertificate` into a `TbsCertificateInner` for DER encoding.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner> {
        let extensions = self
            .extensions
            .iter()
            .map(|ext| -> Result<x509_cert::ext::Extension> {
                Ok(x509_cert::ext::Extension {
                    extn_id: ext.oid,
                    critical: ext.critical,
                    extn_value: OctetString::new(ext.value.clone())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let validity = x509_cert::time::Validity {
            not_before: to_x509_time(self.validity.not_before)?,
            not_after: to_x509_time(self.validity.not_after)?,
        };

        let serial_number = SerialNumber::new(&serial_to_bytes(self.serial_number))?;

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number,
            signature: ecdsa_with_sha256(),
            issuer: self.issuer.clone(),
            validity,
            subject: self.subject.as_x509_name()?,
            subject_public_key_info: self.subject_public_key.to_spki()?,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: (!extensions.is_empty()).then_some(extensions),
        })
    }

    /// Encodes the `TbsCertificate` into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.to_tbs_certificate_inner()?
            .to_der()
            .map_err(|e| CertMintError::EncodingError(e.to_string()))
    }
}

/// RFC 5280 section 4.1.2.5: `UTCTime` through 2049, `GeneralizedTime` from
/// 2050 on.
pub(crate) fn to_x509_time(at: OffsetDateTime) -> Result<Time> {
    let secs = u64::try_from(at.unix_timestamp())
        .map_err(|_| CertMintError::InvalidInput(format!("{at} is before 1970")))?;
    let datetime = der::DateTime::from_unix_duration(std::time::Duration::from_secs(secs))
        .map_err(|e| CertMintError::InvalidInput(format!("{at} is out of range: {e}")))?;
    if datetime.year() < 2050 {
        Ok(Time::UtcTime(UtcTime::from_date_time(datetime)?))
    } else {
        Ok(Time::GeneralTime(GeneralizedTime::from_date_time(datetime)))
    }
}
