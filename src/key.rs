use std::fmt;

use p256::SecretKey;
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{DerSignature, Signature, SigningKey, VerifyingKey};
use pkcs8::{DecodePrivateKey, DecodePublicKey};
use sha1::{Digest, Sha1};
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::error::{CertMintError, Result};

/// An ECDSA P-256 private key together with its public half.
///
/// Key pairs are never mutated once created. Root and leaf certificates share
/// this one type.
#[derive(Clone)]
pub struct KeyPair {
    secret: SecretKey,
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("verifying_key", &self.verifying_key)
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Generate an ECDSA P-256 key pair.
    pub fn generate_ecdsa_p256() -> Self {
        let mut rng = rand_core::OsRng;
        Self::from_secret(SecretKey::random(&mut rng))
    }

    fn from_secret(secret: SecretKey) -> Self {
        let signing_key = SigningKey::from(&secret);
        let verifying_key = *signing_key.verifying_key();
        Self {
            secret,
            signing_key,
            verifying_key,
        }
    }

    /// Import a key from SEC1 `ECPrivateKey` DER, the body of an
    /// `EC PRIVATE KEY` PEM block.
    pub fn from_sec1_der(der: &[u8]) -> Result<Self> {
        SecretKey::from_sec1_der(der)
            .map(Self::from_secret)
            .map_err(|e| CertMintError::DecodingError(format!("invalid SEC1 EC key: {e}")))
    }

    /// Import a key from PKCS#8 `PrivateKeyInfo` DER.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        SecretKey::from_pkcs8_der(der)
            .map(Self::from_secret)
            .map_err(|e| CertMintError::DecodingError(format!("invalid PKCS#8 EC key: {e}")))
    }

    /// Export the key as SEC1 `ECPrivateKey` DER.
    pub fn to_sec1_der(&self) -> Result<Vec<u8>> {
        self.secret
            .to_sec1_der()
            .map(|der| der.to_vec())
            .map_err(|e| CertMintError::EncodingError(e.to_string()))
    }

    /// Import a key from an `EC PRIVATE KEY` or `PRIVATE KEY` PEM block.
    pub fn from_pem(input: impl AsRef<[u8]>) -> Result<Self> {
        crate::pem_utils::decode_private_key(input)
    }

    /// Export the key as an `EC PRIVATE KEY` PEM block.
    pub fn to_pem(&self) -> Result<String> {
        crate::pem_utils::encode_private_key(self)
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.verifying_key)
    }

    /// Sign `data` with ECDSA over SHA-256, returning the DER-encoded
    /// `Ecdsa-Sig-Value` that X.509 expects in `signatureValue`.
    pub fn sign_data(&self, data: &[u8]) -> Vec<u8> {
        let signature: DerSignature = self.signing_key.sign(data);
        signature.as_bytes().to_vec()
    }
}

/// The public half of a [`KeyPair`], or the key found in a certificate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    /// Read a P-256 key out of a `SubjectPublicKeyInfo`.
    ///
    /// Fails for any other algorithm or curve.
    pub fn from_x509spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        let der = der::Encode::to_der(spki)?;
        VerifyingKey::from_public_key_der(&der)
            .map(PublicKey)
            .map_err(|e| CertMintError::DecodingError(format!("unsupported public key: {e}")))
    }

    pub fn to_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        SubjectPublicKeyInfoOwned::from_key(self.0)
            .map_err(|e| CertMintError::EncodingError(e.to_string()))
    }

    /// SHA-1 over the uncompressed EC point (RFC 5280 section 4.2.1.2, method 1).
    pub fn key_identifier(&self) -> Vec<u8> {
        let point = self.0.to_encoded_point(false);
        Sha1::digest(point.as_bytes()).to_vec()
    }

    /// Verify a DER-encoded ECDSA/SHA-256 signature over `data`.
    pub fn verify(&self, data: &[u8], der_signature: &[u8]) -> Result<()> {
        let signature = Signature::from_der(der_signature)
            .map_err(|e| CertMintError::SigningError(format!("malformed signature: {e}")))?;
        self.0
            .verify(data, &signature)
            .map_err(|e| CertMintError::SigningError(format!("signature check failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sec1_der_roundtrip_keeps_public_key() {
        let key = KeyPair::generate_ecdsa_p256();
        let der = key.to_sec1_der().unwrap();
        let imported = KeyPair::from_sec1_der(&der).unwrap();
        assert_eq!(key.public_key(), imported.public_key());
    }

    #[test]
    fn test_signature_verifies_only_for_signed_data() {
        let key = KeyPair::generate_ecdsa_p256();
        let signature = key.sign_data(b"to be signed");
        let public = key.public_key();
        assert!(public.verify(b"to be signed", &signature).is_ok());
        assert!(matches!(
            public.verify(b"something else", &signature),
            Err(CertMintError::SigningError(_))
        ));
    }

    #[test]
    fn test_spki_roundtrip() {
        let public = KeyPair::generate_ecdsa_p256().public_key();
        let spki = public.to_spki().unwrap();
        assert_eq!(PublicKey::from_x509spki(&spki).unwrap(), public);
    }

    #[test]
    fn test_key_identifier_is_sha1_sized() {
        let public = KeyPair::generate_ecdsa_p256().public_key();
        assert_eq!(public.key_identifier().len(), 20);
    }

    #[test]
    fn test_garbage_key_rejected() {
        assert!(matches!(
            KeyPair::from_sec1_der(&[0x30, 0x03, 0x02, 0x01, 0x01]),
            Err(CertMintError::DecodingError(_))
        ));
    }
}
