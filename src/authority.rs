//! On-demand issuance of interception leaf certificates.
//!
//! A [`CertAuthority`] wraps a shared [`RootCa`] and a serial policy. Every
//! call builds a fresh template from the root, signs it, and packages the
//! result as a [`TlsCredential`]. Calls share no mutable state apart from the
//! serial allocator, so one authority can serve many connections at once.
//!
//! ```rust,no_run
//! use certmint::authority::CertAuthority;
//!
//! # fn main() -> certmint::error::Result<()> {
//! let authority = CertAuthority::bundled()?;
//! let credential = authority.issue_for_name("example.com")?;
//! println!("{}", credential.cert_pem());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::address::classify;
use crate::cert::Certificate;
use crate::credential::{TlsCredential, assemble};
use crate::error::Result;
use crate::issuer::sign;
use crate::key::KeyPair;
use crate::root::{RootCa, RootMaterial};
use crate::serial::{RandomSerial, SerialAllocator};
use crate::template::{build_leaf_from_name, build_leaf_from_template};

/// Mints leaf certificates signed by one root.
#[derive(Clone)]
pub struct CertAuthority {
    root: Arc<RootCa>,
    serials: Arc<dyn SerialAllocator>,
}

impl fmt::Debug for CertAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertAuthority")
            .field("root", &self.root.certificate().common_name())
            .finish_non_exhaustive()
    }
}

impl CertAuthority {
    /// An authority over `root` with random serials.
    pub fn new(root: Arc<RootCa>) -> Self {
        Self {
            root,
            serials: Arc::new(RandomSerial),
        }
    }

    /// An authority over the root compiled into the crate.
    pub fn bundled() -> Result<Self> {
        Ok(Self::new(RootCa::bundled()?))
    }

    pub fn from_provider(provider: &dyn RootMaterial) -> Result<Self> {
        Ok(Self::new(provider.root()?))
    }

    /// Replaces the serial policy.
    pub fn with_serial_allocator(mut self, serials: impl SerialAllocator + 'static) -> Self {
        self.serials = Arc::new(serials);
        self
    }

    pub fn root(&self) -> &RootCa {
        &self.root
    }

    /// Issues a leaf for a hostname or IP literal, keyed with the root's key.
    ///
    /// An empty `name` yields a leaf with no subject alternative names.
    pub fn issue_for_name(&self, name: &str) -> Result<TlsCredential> {
        issue_name(&self.root, self.serials.as_ref(), name, self.root.key())
    }

    /// Like [`CertAuthority::issue_for_name`], but the leaf carries `key`'s
    /// public key instead of the root's.
    pub fn issue_for_name_with_key(&self, name: &str, key: &KeyPair) -> Result<TlsCredential> {
        issue_name(&self.root, self.serials.as_ref(), name, key)
    }

    /// Issues a leaf mirroring the names of a certificate observed upstream.
    pub fn issue_for_template(&self, observed: &Certificate) -> Result<TlsCredential> {
        issue_template(&self.root, self.serials.as_ref(), observed, self.root.key())
    }

    pub fn issue_for_template_with_key(
        &self,
        observed: &Certificate,
        key: &KeyPair,
    ) -> Result<TlsCredential> {
        issue_template(&self.root, self.serials.as_ref(), observed, key)
    }
}

/// Issues a leaf for `name` under `root`, or under the bundled root when
/// `root` is `None`.
pub fn issue_for_name(root: Option<&RootCa>, name: &str) -> Result<TlsCredential> {
    match root {
        Some(root) => issue_name(root, &RandomSerial, name, root.key()),
        None => {
            let bundled = RootCa::bundled()?;
            issue_name(&bundled, &RandomSerial, name, bundled.key())
        }
    }
}

/// Issues a leaf shaped after `observed` under `root`, or under the bundled
/// root when `root` is `None`.
pub fn issue_for_template(root: Option<&RootCa>, observed: &Certificate) -> Result<TlsCredential> {
    match root {
        Some(root) => issue_template(root, &RandomSerial, observed, root.key()),
        None => {
            let bundled = RootCa::bundled()?;
            issue_template(&bundled, &RandomSerial, observed, bundled.key())
        }
    }
}

fn issue_name(
    root: &RootCa,
    serials: &dyn SerialAllocator,
    name: &str,
    key: &KeyPair,
) -> Result<TlsCredential> {
    let identity = (!name.is_empty()).then_some(name);
    let serial = serials.next_serial();
    let template = build_leaf_from_name(root, identity, serial)?;
    let cert = sign(template, root.certificate(), root.key(), &key.public_key())?;
    debug!(
        identity = name,
        class = %classify(name),
        serial = %serial,
        "issued leaf certificate"
    );
    assemble(&cert, key)
}

fn issue_template(
    root: &RootCa,
    serials: &dyn SerialAllocator,
    observed: &Certificate,
    key: &KeyPair,
) -> Result<TlsCredential> {
    let serial = serials.next_serial();
    let template = build_leaf_from_template(root, observed, serial)?;
    let cert = sign(template, root.certificate(), root.key(), &key.public_key())?;
    debug!(
        observed = observed.common_name(),
        dns_names = cert.dns_names().len(),
        ip_addresses = cert.ip_addresses().len(),
        serial = %serial,
        "issued leaf certificate from template"
    );
    assemble(&cert, key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::extensions::{ExtendedKeyUsageOption, KeyUsages};
    use crate::error::CertMintError;
    use crate::serial::CounterSerial;

    fn authority() -> CertAuthority {
        CertAuthority::new(Arc::new(
            RootCa::generate(KeyPair::generate_ecdsa_p256()).unwrap(),
        ))
    }

    #[test]
    fn test_hostname_leaf() {
        let authority = authority();
        let credential = authority.issue_for_name("example.com").unwrap();
        let cert = credential.certificate();

        assert_eq!(cert.common_name(), "example.com");
        assert_eq!(cert.dns_names(), ["example.com".to_string()]);
        assert!(cert.ip_addresses().is_empty());
        assert!(!cert.is_ca());
        assert!(cert.key_usage().contains(KeyUsages::DigitalSignature));
        assert!(cert.key_usage().contains(KeyUsages::KeyEncipherment));
        assert_eq!(
            cert.extended_key_usage(),
            [ExtendedKeyUsageOption::ServerAuth, ExtendedKeyUsageOption::ClientAuth]
        );
        assert_eq!(cert.issuer(), authority.root().subject());
        assert!(
            cert.verify_signed_by(&authority.root().key().public_key())
                .is_ok()
        );
    }

    #[test]
    fn test_leaf_uses_root_key_by_default() {
        let authority = authority();
        let credential = authority.issue_for_name("example.com").unwrap();
        assert_eq!(
            credential.certificate().public_key().unwrap(),
            authority.root().key().public_key()
        );
    }

    #[test]
    fn test_leaf_with_own_key() {
        let authority = authority();
        let key = KeyPair::generate_ecdsa_p256();
        let credential = authority.issue_for_name_with_key("example.com", &key).unwrap();
        assert_eq!(credential.certificate().public_key().unwrap(), key.public_key());
        assert_eq!(credential.key().public_key(), key.public_key());
    }

    #[test]
    fn test_template_leaf_with_own_key() {
        let authority = authority();
        let observed = authority.issue_for_name("mirror.example").unwrap();
        let key = KeyPair::generate_ecdsa_p256();
        let credential = authority
            .issue_for_template_with_key(observed.certificate(), &key)
            .unwrap();
        assert_eq!(credential.certificate().public_key().unwrap(), key.public_key());
        assert_eq!(credential.certificate().common_name(), "mirror.example");
        assert!(
            credential
                .certificate()
                .verify_signed_by(&authority.root().key().public_key())
                .is_ok()
        );
    }

    #[test]
    fn test_empty_name_has_no_san() {
        let credential = authority().issue_for_name("").unwrap();
        assert!(credential.certificate().dns_names().is_empty());
        assert!(credential.certificate().ip_addresses().is_empty());
    }

    #[test]
    fn test_serial_policy_is_used() {
        let authority = authority().with_serial_allocator(CounterSerial::starting_at(500));
        let first = authority.issue_for_name("a.example").unwrap();
        let second = authority.issue_for_name("b.example").unwrap();
        assert_eq!(first.certificate().serial().unwrap(), 500);
        assert_eq!(second.certificate().serial().unwrap(), 501);
    }

    #[test]
    fn test_template_mirrors_observed_names() {
        let authority = authority();
        let observed = authority
            .issue_for_name_with_key("upstream.example", &KeyPair::generate_ecdsa_p256())
            .unwrap();
        let mirrored = authority
            .issue_for_template(observed.certificate())
            .unwrap();
        assert_eq!(mirrored.certificate().common_name(), "upstream.example");
        assert_eq!(
            mirrored.certificate().dns_names(),
            ["upstream.example".to_string()]
        );
    }

    #[test]
    fn test_free_functions_fall_back_to_bundled_root() {
        let credential = issue_for_name(None, "10.0.0.1").unwrap();
        let bundled = RootCa::bundled().unwrap();
        assert_eq!(credential.certificate().issuer(), bundled.subject());
        assert_eq!(
            credential.certificate().ip_addresses(),
            ["10.0.0.1".parse::<std::net::IpAddr>().unwrap()]
        );

        let mirrored = issue_for_template(None, credential.certificate()).unwrap();
        assert!(
            mirrored
                .certificate()
                .verify_signed_by(&bundled.key().public_key())
                .is_ok()
        );
    }

    #[test]
    fn test_non_ascii_name_is_invalid_input() {
        assert!(matches!(
            authority().issue_for_name("bücher.example"),
            Err(CertMintError::InvalidInput(_))
        ));
    }
}
