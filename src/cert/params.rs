use std::net::IpAddr;

use bon::Builder;
use const_oid::ObjectIdentifier;
use der::asn1::{Any, PrintableStringRef, SetOfVec};
use der::{Tag, Tagged};
use time::{Duration, OffsetDateTime};
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};

use super::extensions::ToAndFromX509Extension;
pub use crate::cert::extensions::ExtendedKeyUsageOption;
use crate::cert::extensions::KeyUsage;
use crate::error::{CertMintError, Result};

const OID_COUNTRY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
const OID_STATE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");
const OID_LOCALITY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.7");
const OID_ORGANIZATION: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
const OID_ORGANIZATION_UNIT: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");
const OID_COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

/// The unsigned description of a certificate, consumed by
/// [`Issuer::issue`](crate::issuer::Issuer::issue).
///
/// A template lives for a single issuance. Certificates are never edited in
/// place; a look-alike of an existing certificate is a fresh template.
///
/// # Fields
/// * `serial_number` - The serial to embed.
/// * `subject` - The distinguished name of the certificate subject.
/// * `dns_names` - DNS subject alternative names.
/// * `ip_addresses` - IP address subject alternative names.
/// * `validity` - The `notBefore`/`notAfter` window.
/// * `is_ca` - Whether the certificate may sign other certificates.
/// * `max_path_length` - The basic constraints path length, CA only.
/// * `key_usage` - Key usage bits; omitted from the certificate when empty.
/// * `extended_key_usage` - Extended key usages; omitted when empty.
#[derive(Clone, Debug, Builder)]
pub struct CertificateTemplate {
    pub serial_number: u128,
    pub subject: DistinguishedName,
    #[builder(default)]
    pub dns_names: Vec<String>,
    #[builder(default)]
    pub ip_addresses: Vec<IpAddr>,
    pub validity: Validity,
    #[builder(default)]
    pub is_ca: bool,
    pub max_path_length: Option<u8>,
    #[builder(default)]
    pub key_usage: KeyUsage,
    #[builder(default)]
    pub extended_key_usage: Vec<ExtendedKeyUsageOption>,
}

/// Distinguished name parameters for building an X.509 certificate.
///
/// This struct represents the subject or issuer name in a certificate. An
/// empty `common_name` means the name carries no CN attribute.
///
/// # Fields
/// * `common_name` - The common name (CN).
/// * `country` - The country (C).
/// * `state` - The state or province (ST).
/// * `locality` - The locality or city (L).
/// * `organization` - The organization (O).
/// * `organization_unit` - The organizational unit (OU).
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    #[builder(default)]
    pub common_name: String,
    pub country: Option<String>,
    pub state: Option<String>,
    pub locality: Option<String>,
    pub organization: Option<String>,
    pub organization_unit: Option<String>,
}

impl DistinguishedName {
    /// Converts the distinguished name to an X.509 `Name`.
    ///
    /// Attributes are emitted in C, ST, L, O, OU, CN order, one per RDN.
    /// Country is a `PrintableString`; everything else is `UTF8String`.
    pub fn as_x509_name(&self) -> Result<Name> {
        let mut rdns = Vec::new();
        if let Some(country) = self.country.as_deref() {
            PrintableStringRef::new(country).map_err(|_| {
                CertMintError::InvalidInput(format!("country {country:?} is not printable"))
            })?;
            push_attribute(&mut rdns, OID_COUNTRY, Tag::PrintableString, country)?;
        }
        let utf8_fields = [
            (OID_STATE, self.state.as_deref()),
            (OID_LOCALITY, self.locality.as_deref()),
            (OID_ORGANIZATION, self.organization.as_deref()),
            (OID_ORGANIZATION_UNIT, self.organization_unit.as_deref()),
        ];
        for (oid, value) in utf8_fields {
            if let Some(value) = value {
                push_attribute(&mut rdns, oid, Tag::Utf8String, value)?;
            }
        }
        if !self.common_name.is_empty() {
            push_attribute(&mut rdns, OID_COMMON_NAME, Tag::Utf8String, &self.common_name)?;
        }
        Ok(RdnSequence(rdns))
    }

    /// Creates a `DistinguishedName` from an X.509 `Name`.
    ///
    /// Attributes that are not directory strings, or that this type does not
    /// model, are skipped. The first occurrence of each attribute wins.
    pub fn from_x509_name(x509dn: &Name) -> Self {
        let mut dn = DistinguishedName::default();
        for rdn in x509dn.0.iter() {
            for attr in rdn.0.iter() {
                let Some(value) = directory_string(&attr.value) else {
                    continue;
                };
                let slot = match attr.oid {
                    OID_COUNTRY => &mut dn.country,
                    OID_STATE => &mut dn.state,
                    OID_LOCALITY => &mut dn.locality,
                    OID_ORGANIZATION => &mut dn.organization,
                    OID_ORGANIZATION_UNIT => &mut dn.organization_unit,
                    OID_COMMON_NAME => {
                        if dn.common_name.is_empty() {
                            dn.common_name = value;
                        }
                        continue;
                    }
                    _ => continue,
                };
                if slot.is_none() {
                    *slot = Some(value);
                }
            }
        }
        dn
    }
}

fn push_attribute(
    rdns: &mut Vec<RelativeDistinguishedName>,
    oid: ObjectIdentifier,
    tag: Tag,
    value: &str,
) -> Result<()> {
    let atv = AttributeTypeAndValue {
        oid,
        value: Any::new(tag, value.as_bytes().to_vec())?,
    };
    rdns.push(RelativeDistinguishedName(SetOfVec::try_from(vec![atv])?));
    Ok(())
}

fn directory_string(value: &Any) -> Option<String> {
    match value.tag() {
        Tag::Utf8String | Tag::PrintableString | Tag::Ia5String | Tag::TeletexString => {
            std::str::from_utf8(value.value()).ok().map(str::to_string)
        }
        _ => None,
    }
}

/// Certificate validity period.
///
/// This struct represents the `notBefore` and `notAfter` fields in a certificate.
/// X.509 times have one-second resolution, so constructors here truncate to
/// whole seconds.
///
/// # Fields
/// * `not_before` - The start of the validity period.
/// * `not_after` - The end of the validity period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity period starting now for the given number of days.
    pub fn for_days(days: i64) -> Result<Self> {
        let now = now_utc_seconds()?;
        Ok(Self {
            not_before: now,
            not_after: now + Duration::days(days),
        })
    }

    /// Creates a validity period starting now and ending `years` calendar
    /// years later.
    pub fn years_from_now(years: i32) -> Result<Self> {
        let now = now_utc_seconds()?;
        Ok(Self {
            not_before: now,
            not_after: add_years(now, years)?,
        })
    }

    /// Whether `at` falls inside the window, bounds included.
    pub fn contains(&self, at: OffsetDateTime) -> bool {
        self.not_before <= at && at <= self.not_after
    }
}

fn now_utc_seconds() -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(OffsetDateTime::now_utc().unix_timestamp())
        .map_err(|e| CertMintError::InvalidInput(e.to_string()))
}

/// Shift `at` by whole calendar years. February 29th lands on March 1st when
/// the target year is not a leap year.
pub(crate) fn add_years(at: OffsetDateTime, years: i32) -> Result<OffsetDateTime> {
    let year = at.year() + years;
    at.replace_year(year)
        .or_else(|_| {
            at.replace_day(28)
                .and_then(|d| d.replace_year(year))
                .map(|d| d + Duration::days(1))
        })
        .map_err(|e| CertMintError::InvalidInput(format!("validity out of range: {e}")))
}

/// Represents an X.509 extension.
///
/// This struct contains the OID, criticality, and value of an extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    pub fn from_extension<E: ToAndFromX509Extension>(extension: E, critical: bool) -> Result<Self> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }
}
