//! Errors returned by every certmint operation.

use thiserror::Error;

/// Represents errors that can occur while minting certificates.
///
/// Every failure is deterministic for a given input, so callers should not
/// retry on any of these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CertMintError {
    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding, including a missing PEM block.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error while producing or checking a certificate signature.
    #[error("Signing error: {0}")]
    SigningError(String),

    /// The private key does not belong to the certificate.
    #[error("Key pair assembly error: {0}")]
    AssemblyError(String),

    /// Root CA material could not be loaded.
    #[error("Failed to load root CA: {0}")]
    LoadError(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CertMintError>;

impl From<der::Error> for CertMintError {
    /// Converts a `der::Error` into a `CertMintError`.
    fn from(err: der::Error) -> Self {
        CertMintError::DecodingError(err.to_string())
    }
}

impl From<pem::PemError> for CertMintError {
    fn from(err: pem::PemError) -> Self {
        CertMintError::DecodingError(err.to_string())
    }
}

impl CertMintError {
    /// Re-labels any error as a signing failure, keeping its message.
    pub(crate) fn into_signing(self) -> Self {
        match self {
            CertMintError::SigningError(msg) => CertMintError::SigningError(msg),
            other => CertMintError::SigningError(other.to_string()),
        }
    }

    /// Re-labels any error as a root loading failure, keeping its message.
    pub(crate) fn into_load(self) -> Self {
        match self {
            CertMintError::LoadError(msg) => CertMintError::LoadError(msg),
            other => CertMintError::LoadError(other.to_string()),
        }
    }
}
