//! A leaf certificate and its private key, packaged for a TLS server.

use crate::cert::Certificate;
use crate::error::{CertMintError, Result};
use crate::key::KeyPair;
use crate::pem_utils::{
    decode_certificate, decode_private_key, encode_certificate, encode_private_key,
};

#[cfg(feature = "rustls")]
use rustls_pki_types::{CertificateDer, PrivateKeyDer, PrivateSec1KeyDer};

/// A certificate paired with the private key for its public key.
///
/// Holds both the parsed values and their PEM text, so it can be handed to a
/// TLS stack that wants either form.
#[derive(Debug, Clone)]
pub struct TlsCredential {
    certificate: Certificate,
    key: KeyPair,
    cert_pem: String,
    key_pem: String,
}

/// Packages `cert` and `key` the way a TLS server would load them.
///
/// Both are PEM-encoded, decoded again, and the certificate's public key is
/// compared with the key's. A mismatch or any encoding failure is an
/// `AssemblyError`.
pub fn assemble(cert: &Certificate, key: &KeyPair) -> Result<TlsCredential> {
    assemble_pair(cert, key).map_err(|err| match err {
        CertMintError::AssemblyError(msg) => CertMintError::AssemblyError(msg),
        other => CertMintError::AssemblyError(other.to_string()),
    })
}

fn assemble_pair(cert: &Certificate, key: &KeyPair) -> Result<TlsCredential> {
    let cert_pem = encode_certificate(cert);
    let key_pem = encode_private_key(key)?;

    let certificate = decode_certificate(&cert_pem)?;
    let key = decode_private_key(&key_pem)?;

    if certificate.public_key()? != key.public_key() {
        return Err(CertMintError::AssemblyError(
            "private key does not match the certificate public key".to_string(),
        ));
    }

    Ok(TlsCredential {
        certificate,
        key,
        cert_pem,
        key_pem,
    })
}

impl TlsCredential {
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn key(&self) -> &KeyPair {
        &self.key
    }

    /// The certificate as a `CERTIFICATE` PEM block.
    pub fn cert_pem(&self) -> &str {
        &self.cert_pem
    }

    /// The key as an `EC PRIVATE KEY` PEM block.
    pub fn key_pem(&self) -> &str {
        &self.key_pem
    }

    /// Certificate block followed by key block, the single-file layout many
    /// proxies accept.
    pub fn to_pem_bundle(&self) -> String {
        format!("{}{}", self.cert_pem, self.key_pem)
    }

    pub fn cert_der(&self) -> &[u8] {
        self.certificate.as_der()
    }

    #[cfg(feature = "rustls")]
    pub fn rustls_certificate(&self) -> CertificateDer<'static> {
        CertificateDer::from(self.certificate.as_der().to_vec())
    }

    #[cfg(feature = "rustls")]
    pub fn rustls_private_key(&self) -> Result<PrivateKeyDer<'static>> {
        Ok(PrivateKeyDer::Sec1(PrivateSec1KeyDer::from(
            self.key.to_sec1_der()?,
        )))
    }
}
