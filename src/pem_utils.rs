use crate::cert::Certificate;
use crate::error::{CertMintError, Result};
use crate::key::KeyPair;

pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";
pub const EC_PRIVATE_KEY_LABEL: &str = "EC PRIVATE KEY";
pub const PKCS8_PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(&pem, pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF))
}

/// Convert the first PEM block of `input` to DER, checking its label.
///
/// Input without any PEM block is an error.
pub fn pem_to_der(input: impl AsRef<[u8]>, label: &str) -> Result<Vec<u8>> {
    let (found, der) = first_block(input.as_ref())?;
    if found != label {
        return Err(CertMintError::DecodingError(format!(
            "expected a {label} PEM block, found {found}"
        )));
    }
    Ok(der)
}

fn first_block(input: &[u8]) -> Result<(String, Vec<u8>)> {
    let pem = pem::parse(input)?;
    Ok((pem.tag().to_string(), pem.into_contents()))
}

/// PEM-encode a certificate as a `CERTIFICATE` block.
pub fn encode_certificate(cert: &Certificate) -> String {
    der_to_pem(cert.as_der(), CERTIFICATE_LABEL)
}

/// PEM-encode a private key as a SEC1 `EC PRIVATE KEY` block.
pub fn encode_private_key(key: &KeyPair) -> Result<String> {
    let der = key.to_sec1_der()?;
    Ok(der_to_pem(&der, EC_PRIVATE_KEY_LABEL))
}

/// Decode the first PEM block of `input` as a private key.
///
/// SEC1 `EC PRIVATE KEY` and PKCS#8 `PRIVATE KEY` blocks are accepted.
pub fn decode_private_key(input: impl AsRef<[u8]>) -> Result<KeyPair> {
    let (label, der) = first_block(input.as_ref())?;
    match label.as_str() {
        EC_PRIVATE_KEY_LABEL => KeyPair::from_sec1_der(&der),
        PKCS8_PRIVATE_KEY_LABEL => KeyPair::from_pkcs8_der(&der),
        other => Err(CertMintError::DecodingError(format!(
            "expected a private key PEM block, found {other}"
        ))),
    }
}

/// Decode the first PEM block of `input` as a certificate.
pub fn decode_certificate(input: impl AsRef<[u8]>) -> Result<Certificate> {
    let der = pem_to_der(input, CERTIFICATE_LABEL)?;
    Certificate::from_der(&der)
}
