#![allow(dead_code)]

use std::net::IpAddr;
use std::sync::Arc;

use certmint::authority::CertAuthority;
use certmint::cert::Certificate;
use certmint::cert::extensions::ExtendedKeyUsageOption;
use certmint::cert::params::{CertificateTemplate, DistinguishedName, Validity};
use certmint::issuer::self_sign;
use certmint::key::KeyPair;
use certmint::root::RootCa;

pub fn generate_root() -> Arc<RootCa> {
    Arc::new(RootCa::generate(KeyPair::generate_ecdsa_p256()).unwrap())
}

pub fn authority() -> CertAuthority {
    CertAuthority::new(generate_root())
}

/// A self-signed stand-in for a certificate presented by an upstream server.
pub fn upstream_cert(
    common_name: &str,
    dns_names: &[&str],
    ip_addresses: &[IpAddr],
) -> Certificate {
    let key = KeyPair::generate_ecdsa_p256();
    let template = CertificateTemplate::builder()
        .serial_number(4242)
        .subject(
            DistinguishedName::builder()
                .common_name(common_name.to_string())
                .organization("Upstream Org".to_string())
                .country("DE".to_string())
                .build(),
        )
        .dns_names(dns_names.iter().map(|name| name.to_string()).collect())
        .ip_addresses(ip_addresses.to_vec())
        .validity(Validity::for_days(90).unwrap())
        .extended_key_usage(vec![ExtendedKeyUsageOption::ServerAuth])
        .build();
    self_sign(template, &key).unwrap()
}

/// Writes `contents` to a file in the temp directory unique to this process
/// and `name`, returning its path.
pub fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("certmint-{}-{name}", std::process::id()));
    std::fs::write(&path, contents).expect("Failed to write temp file");
    path
}
