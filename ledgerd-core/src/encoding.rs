//! Byte/text encoding helpers used by the credential store container and
//! certificate handling.

use crate::error::{LedgerdError, LedgerdResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha2::{Digest, Sha256};

/// Convert a byte slice to a capitalized hex string.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

/// Decode a hex string. Accepts any hex form (capitalized, lowercase, mixed).
pub fn from_hex(encoded: &str) -> LedgerdResult<Vec<u8>> {
    hex::decode(encoded).map_err(|e| LedgerdError::InvalidInput {
        field: "hex".to_string(),
        message: e.to_string(),
    })
}

pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn from_base64(encoded: &str) -> LedgerdResult<Vec<u8>> {
    STANDARD.decode(encoded).map_err(|e| LedgerdError::InvalidInput {
        field: "base64".to_string(),
        message: e.to_string(),
    })
}

/// SHA-256 digest rendered as colon-separated capitalized hex, the format
/// used for certificate fingerprints.
pub fn sha256_fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest
        .iter()
        .map(|byte| format!("{:02X}", byte))
        .collect::<Vec<_>>()
        .join(":")
}
