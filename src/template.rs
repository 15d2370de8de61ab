//! Certificate templates for the root and for interception leaves.
//!
//! Every builder here returns a fresh [`CertificateTemplate`]. The root passed
//! in is only read; its subject is cloned, never edited, so one [`RootCa`] can
//! serve any number of concurrent issuances.

use crate::address::{AddressClass, classify, parse_host};
use crate::cert::Certificate;
use crate::cert::extensions::{ExtendedKeyUsageOption, KeyUsage};
use crate::cert::params::{CertificateTemplate, Validity};
use crate::error::Result;
use crate::root::{RootCa, RootOptions};

/// Leaves are valid for this many calendar years from the moment of issue.
pub const LEAF_VALIDITY_YEARS: i32 = 1000;

fn leaf_template(root: &RootCa, serial: u128) -> Result<CertificateTemplate> {
    Ok(CertificateTemplate::builder()
        .serial_number(serial)
        .subject(root.certificate().subject().clone())
        .validity(Validity::years_from_now(LEAF_VALIDITY_YEARS)?)
        .is_ca(false)
        .key_usage(KeyUsage::tls_endpoint())
        .extended_key_usage(vec![
            ExtendedKeyUsageOption::ServerAuth,
            ExtendedKeyUsageOption::ClientAuth,
        ])
        .build())
}

/// Leaf template for a requested identity.
///
/// A DNS name becomes both the common name and the only DNS SAN. An IP
/// literal becomes the only IP SAN and the root's common name is kept. With
/// no identity the SAN list stays empty.
pub fn build_leaf_from_name(
    root: &RootCa,
    identity: Option<&str>,
    serial: u128,
) -> Result<CertificateTemplate> {
    let mut template = leaf_template(root, serial)?;
    let Some(identity) = identity else {
        return Ok(template);
    };
    match classify(identity) {
        AddressClass::Ipv4 | AddressClass::Ipv6 => {
            template.ip_addresses = parse_host(identity).into_iter().collect();
        }
        AddressClass::Unknown | AddressClass::Auto => {
            template.subject.common_name = identity.to_string();
            template.dns_names = vec![identity.to_string()];
        }
    }
    Ok(template)
}

/// Leaf template shaped after a certificate observed on the real upstream.
///
/// The observed DNS names and IP addresses are carried over. When the
/// observed certificate has a common name but no DNS names, that common name
/// becomes the single DNS name. The subject is the root's, with its common
/// name replaced by the first DNS name (or the observed common name when
/// there is none); no other observed subject field is used.
pub fn build_leaf_from_template(
    root: &RootCa,
    template_cert: &Certificate,
    serial: u128,
) -> Result<CertificateTemplate> {
    let mut template = leaf_template(root, serial)?;
    let observed_cn = template_cert.common_name();

    let mut dns_names = template_cert.dns_names().to_vec();
    if dns_names.is_empty() && !observed_cn.is_empty() {
        dns_names.push(observed_cn.to_string());
    }

    template.subject.common_name = dns_names
        .first()
        .cloned()
        .unwrap_or_else(|| observed_cn.to_string());
    template.dns_names = dns_names;
    template.ip_addresses = template_cert.ip_addresses().to_vec();
    Ok(template)
}

/// Template for a self-signed root CA.
pub fn build_root(options: &RootOptions, serial: u128) -> CertificateTemplate {
    CertificateTemplate::builder()
        .serial_number(serial)
        .subject(options.subject.clone())
        .validity(Validity {
            not_before: options.not_before,
            not_after: options.not_after,
        })
        .is_ca(true)
        .max_path_length(options.max_path_length)
        .key_usage(KeyUsage::certificate_authority())
        .build()
}
