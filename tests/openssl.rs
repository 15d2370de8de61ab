mod util;

use std::fs;
use std::net::IpAddr;
use std::process::Command;

use certmint::authority::CertAuthority;
use certmint::cert::Certificate;
use certmint::root::RootCa;
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use openssl::x509::extension::SubjectAlternativeName;
use openssl::x509::{X509, X509Builder, X509NameBuilder};
use regex::Regex;
use time::OffsetDateTime;

fn common_name(name: &openssl::x509::X509NameRef) -> String {
    name.entries_by_nid(Nid::COMMONNAME)
        .next()
        .unwrap()
        .data()
        .as_utf8()
        .unwrap()
        .to_string()
}

/// An RSA-keyed certificate built by openssl, standing in for a real upstream.
fn openssl_upstream(cn: &str, dns_names: &[&str], ips: &[&str]) -> Certificate {
    let pkey = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::ORGANIZATIONNAME, "Upstream Inc").unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, cn).unwrap();
    let name = name.build();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(42).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&pkey).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(90).unwrap())
        .unwrap();

    if !dns_names.is_empty() || !ips.is_empty() {
        let mut san = SubjectAlternativeName::new();
        for dns in dns_names {
            san.dns(dns);
        }
        for ip in ips {
            san.ip(ip);
        }
        let san = san.build(&builder.x509v3_context(None, None)).unwrap();
        builder.append_extension(san).unwrap();
    }

    builder.sign(&pkey, MessageDigest::sha256()).unwrap();
    Certificate::from_der(&builder.build().to_der().unwrap()).unwrap()
}

#[test]
fn test_openssl_cli_reads_leaf() {
    let credential = CertAuthority::bundled()
        .unwrap()
        .issue_for_name("example.com")
        .unwrap();
    let cert_path = util::write_temp("cli_leaf.pem", credential.cert_pem());

    let output = Command::new("openssl")
        .arg("x509")
        .arg("-in")
        .arg(&cert_path)
        .arg("-noout")
        .arg("-text")
        .output()
        .expect("Failed to execute OpenSSL command");

    assert!(
        output.status.success(),
        "OpenSSL command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    // Older releases print `C = US`, newer ones `C=US`.
    let output_text = String::from_utf8_lossy(&output.stdout).replace(" = ", "=");

    assert!(
        output_text.contains(
            "Issuer: C=US, ST=California, L=San Francisco, O=Certmint, OU=Certmint Proxy, CN=Certmint Root CA"
        ),
        "Issuer field is incorrect"
    );
    assert!(
        output_text.contains(
            "Subject: C=US, ST=California, L=San Francisco, O=Certmint, OU=Certmint Proxy, CN=example.com"
        ),
        "Subject field is incorrect"
    );
    assert!(output_text.contains("Version: 3 (0x2)"));
    assert!(output_text.contains("Signature Algorithm: ecdsa-with-SHA256"));
    assert!(output_text.contains("DNS:example.com"));
    assert!(output_text.contains("CA:FALSE"));
    assert!(output_text.contains("TLS Web Server Authentication, TLS Web Client Authentication"));

    let not_after = Regex::new(r"Not After : \w+\s+\d+ \d{2}:\d{2}:\d{2} (\d{4}) GMT").unwrap();
    let year: i32 = not_after
        .captures(&output_text)
        .expect("Missing or incorrect Not After field")[1]
        .parse()
        .unwrap();
    assert_eq!(year, OffsetDateTime::now_utc().year() + 1000);

    fs::remove_file(cert_path).expect("Failed to remove test certificate");
}

#[test]
fn test_openssl_cli_verifies_chain() {
    let root = util::generate_root();
    let authority = CertAuthority::new(root.clone());
    let credential = authority.issue_for_name("chain.example.com").unwrap();

    let (root_pem, _) = root.to_pem_pair().unwrap();
    let root_path = util::write_temp("chain_root.pem", &root_pem);
    let leaf_path = util::write_temp("chain_leaf.pem", credential.cert_pem());

    let output = Command::new("openssl")
        .arg("verify")
        .arg("-CAfile")
        .arg(&root_path)
        .arg(&leaf_path)
        .output()
        .expect("Failed to execute OpenSSL command");

    assert!(
        output.status.success(),
        "OpenSSL verify failed: {}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains(": OK"));

    fs::remove_file(root_path).unwrap();
    fs::remove_file(leaf_path).unwrap();
}

#[test]
fn test_openssl_crate_validates_leaf() {
    let root = util::generate_root();
    let authority = CertAuthority::new(root.clone());
    let credential = authority.issue_for_name("server.example.com").unwrap();

    let x509 = X509::from_pem(credential.cert_pem().as_bytes()).expect("Failed to parse PEM");
    let root_x509 = X509::from_pem(root.certificate().to_pem().as_bytes()).unwrap();

    assert_eq!(common_name(x509.subject_name()), "server.example.com");
    assert_eq!(common_name(x509.issuer_name()), "Certmint Root CA");
    assert_eq!(x509.version(), 2, "X509 version should be 3 (0-based index)");
    assert_eq!(
        x509.signature_algorithm().object().nid(),
        Nid::ECDSA_WITH_SHA256
    );
    assert!(x509.verify(&root_x509.public_key().unwrap()).unwrap());

    let sans = x509.subject_alt_names().expect("SAN extension missing");
    let dns: Vec<&str> = sans.iter().filter_map(|name| name.dnsname()).collect();
    assert_eq!(dns, ["server.example.com"]);

    let serial = x509.serial_number().to_bn().unwrap().to_dec_str().unwrap();
    assert_eq!(
        serial.to_string(),
        credential.certificate().serial().unwrap().to_string()
    );

    let now = Asn1Time::days_from_now(0).unwrap();
    let remaining = now.diff(x509.not_after()).unwrap();
    assert!(remaining.days > 999 * 365);

    // The key PEM loads in openssl and belongs to the certificate.
    let key = PKey::private_key_from_pem(credential.key_pem().as_bytes()).unwrap();
    assert!(x509.public_key().unwrap().public_eq(&key));
}

#[test]
fn test_openssl_crate_reads_ip_leaf() {
    let credential = CertAuthority::bundled()
        .unwrap()
        .issue_for_name("::1")
        .unwrap();
    let x509 = X509::from_pem(credential.cert_pem().as_bytes()).unwrap();
    let sans = x509.subject_alt_names().expect("SAN extension missing");
    let ips: Vec<&[u8]> = sans.iter().filter_map(|name| name.ipaddress()).collect();
    assert_eq!(ips, [&"::1".parse::<std::net::Ipv6Addr>().unwrap().octets()[..]]);
    assert!(sans.iter().all(|name| name.dnsname().is_none()));
}

#[test]
fn test_root_accepted_by_openssl() {
    let root = RootCa::bundled().unwrap();
    let x509 = X509::from_pem(root.certificate().to_pem().as_bytes()).unwrap();
    assert!(x509.verify(&x509.public_key().unwrap()).unwrap());
    assert_eq!(common_name(x509.subject_name()), "Certmint Root CA");

    let generated = util::generate_root();
    let x509 = X509::from_pem(generated.certificate().to_pem().as_bytes()).unwrap();
    assert!(x509.verify(&x509.public_key().unwrap()).unwrap());
    let (_, key_pem) = generated.to_pem_pair().unwrap();
    let key = PKey::private_key_from_pem(key_pem.as_bytes()).unwrap();
    assert!(x509.public_key().unwrap().public_eq(&key));
}

#[test]
fn test_template_from_openssl_upstream() {
    let observed = openssl_upstream(
        "upstream.example.net",
        &["a.example.net", "b.example.net"],
        &["203.0.113.5"],
    );
    assert!(observed.public_key().is_err(), "RSA keys are not P-256");

    let authority = util::authority();
    let credential = authority.issue_for_template(&observed).unwrap();
    let cert = credential.certificate();

    assert_eq!(
        cert.dns_names(),
        ["a.example.net".to_string(), "b.example.net".to_string()]
    );
    assert_eq!(cert.ip_addresses(), ["203.0.113.5".parse::<IpAddr>().unwrap()]);
    assert_eq!(cert.common_name(), "a.example.net");
    assert_eq!(cert.subject().organization.as_deref(), Some("Certmint"));
}

#[test]
fn test_template_from_openssl_upstream_without_san() {
    let observed = openssl_upstream("legacy.example.net", &[], &[]);
    let credential = util::authority().issue_for_template(&observed).unwrap();
    assert_eq!(
        credential.certificate().dns_names(),
        ["legacy.example.net".to_string()]
    );
    assert!(credential.certificate().ip_addresses().is_empty());
}
