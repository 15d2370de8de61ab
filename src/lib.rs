//! # Certmint - On-Demand Certificates for TLS Interception
//!
//! Certmint is a small certificate authority for intercepting proxies. Given a
//! locally trusted root, it mints a leaf certificate for whatever hostname or
//! IP address a client asked for, or one that mirrors the names of the
//! certificate the real upstream presented. Everything is built with the
//! rustcrypto crates; openssl is only used to cross-check output in tests.
//!
//! ## Key Type
//!
//! Roots and leaves use **ECDSA P-256** keys, signed with `ecdsa-with-SHA256`.
//!
//! ## Key Features
//!
//! - **Bundled root**: A root certificate and key ship inside the crate and
//!   are loaded lazily on first use
//! - **Custom roots**: Generate a fresh root or load one from PEM
//! - **Name-driven leaves**: Hostnames become CN plus DNS SAN, IP literals
//!   become an IP SAN
//! - **Template-driven leaves**: Copy the DNS names and IP addresses of an
//!   observed upstream certificate
//! - **Ready-to-serve output**: Certificate and key as PEM, DER, or (with the
//!   `rustls` feature) `rustls-pki-types` values
//!
//! ## Quick Start
//!
//! ### Minting from the Bundled Root
//!
//! ```rust,no_run
//! use certmint::authority::CertAuthority;
//!
//! # fn main() -> Result<(), certmint::error::CertMintError> {
//! let authority = CertAuthority::bundled()?;
//!
//! let by_host = authority.issue_for_name("example.com")?;
//! let by_ip = authority.issue_for_name("192.0.2.10")?;
//!
//! println!("{}", by_host.to_pem_bundle());
//! println!("{:?}", by_ip.certificate().ip_addresses());
//! # Ok(())
//! # }
//! ```
//!
//! ### Using Your Own Root
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use certmint::{
//!     authority::CertAuthority,
//!     key::KeyPair,
//!     root::{RootCa, RootOptions},
//!     cert::params::DistinguishedName,
//!     serial::CounterSerial,
//! };
//!
//! # fn main() -> Result<(), certmint::error::CertMintError> {
//! let options = RootOptions::builder()
//!     .subject(
//!         DistinguishedName::builder()
//!             .common_name("Lab Interception Root".to_string())
//!             .organization("Lab".to_string())
//!             .build(),
//!     )
//!     .build();
//! let root = RootCa::generate_with(
//!     KeyPair::generate_ecdsa_p256(),
//!     &options,
//!     &CounterSerial::new(),
//! )?;
//!
//! // Install this in the client's trust store.
//! let (root_pem, _root_key_pem) = root.to_pem_pair()?;
//! println!("{root_pem}");
//!
//! let authority = CertAuthority::new(Arc::new(root));
//! let leaf_key = KeyPair::generate_ecdsa_p256();
//! let credential = authority.issue_for_name_with_key("internal.example", &leaf_key)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Mirroring an Upstream Certificate
//!
//! ```rust,no_run
//! use certmint::{authority::CertAuthority, cert::Certificate};
//!
//! # fn main() -> Result<(), certmint::error::CertMintError> {
//! # let upstream_der: Vec<u8> = Vec::new();
//! let observed = Certificate::from_der(&upstream_der)?;
//! let credential = CertAuthority::bundled()?.issue_for_template(&observed)?;
//! assert_eq!(credential.certificate().dns_names(), observed.dns_names());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every operation returns [`error::CertMintError`]. Failures are
//! deterministic, so there is nothing to retry:
//!
//! ```rust
//! use certmint::{root::RootCa, error::CertMintError};
//!
//! match RootCa::load("not a certificate", "not a key") {
//!     Ok(_) => println!("Root loaded"),
//!     Err(CertMintError::LoadError(msg)) => println!("Failed to load root: {}", msg),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`authority`]: Leaf issuance for names and observed certificates
//! - [`root`]: Root CA generation, loading, and the bundled root
//! - [`template`]: Templates for roots and leaves
//! - [`issuer`]: Signing templates into certificates
//! - [`credential`]: Certificate and key packaged for a TLS server
//! - [`cert`]: Parsed certificates, templates, and extensions
//! - [`key`]: P-256 key pairs and public keys
//! - [`address`]: IP literal parsing and classification
//! - [`serial`]: Serial number policies
//! - [`pem_utils`]: PEM encoding and decoding
//! - [`error`]: Error types
//! - [`tbs_certificate`]: Low-level to-be-signed certificate structure

pub mod address;
pub mod authority;
pub mod cert;
pub mod credential;
pub mod error;
pub mod issuer;
pub mod key;
pub mod pem_utils;
pub mod root;
pub mod serial;
pub mod tbs_certificate;
pub mod template;
