//! Consent token formatting, parsing, and hashing.

use std::fmt;

use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::Zeroize;

/// Consent token identifier prefix.
pub const CONSENT_TOKEN_PREFIX: &str = "qc";

/// Number of secret bytes encoded in a token.
pub const CONSENT_TOKEN_SECRET_BYTES: usize = 32;

const CONSENT_TOKEN_SECRET_HEX_CHARS: usize = CONSENT_TOKEN_SECRET_BYTES * 2;

/// Secret material of a consent token before it is formatted for delivery.
#[derive(Clone)]
pub struct ConsentTokenSecret {
    bytes: [u8; CONSENT_TOKEN_SECRET_BYTES],
}

impl ConsentTokenSecret {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; CONSENT_TOKEN_SECRET_BYTES]) -> Self {
        Self { bytes }
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; CONSENT_TOKEN_SECRET_BYTES] {
        &self.bytes
    }
}

impl fmt::Debug for ConsentTokenSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConsentTokenSecret(**redacted**)")?;
        Ok(())
    }
}

impl Drop for ConsentTokenSecret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

#[derive(Debug, Error)]
pub enum ConsentTokenError {
    #[error("consent token format is invalid")]
    InvalidFormat,
}

#[must_use]
pub fn generate_consent_token_secret() -> ConsentTokenSecret {
    let mut secret = [0_u8; CONSENT_TOKEN_SECRET_BYTES];

    OsRng.fill_bytes(&mut secret);

    ConsentTokenSecret::from_bytes(secret)
}

/// Format a secret as the raw token handed to the external party.
#[must_use]
pub fn format_consent_token(secret: &ConsentTokenSecret) -> String {
    format!(
        "{CONSENT_TOKEN_PREFIX}_{}",
        encode_secret_hex(secret.as_bytes())
    )
}

/// Validate the shape of a presented token before any storage lookup.
pub fn validate_consent_token(token: &str) -> Result<(), ConsentTokenError> {
    let (prefix, secret_hex) = token
        .split_once('_')
        .ok_or(ConsentTokenError::InvalidFormat)?;

    if prefix != CONSENT_TOKEN_PREFIX {
        return Err(ConsentTokenError::InvalidFormat);
    }

    if secret_hex.len() != CONSENT_TOKEN_SECRET_HEX_CHARS {
        return Err(ConsentTokenError::InvalidFormat);
    }

    if !secret_hex.bytes().all(|byte| byte.is_ascii_hexdigit()) {
        return Err(ConsentTokenError::InvalidFormat);
    }

    Ok(())
}

/// One-way storage hash of a raw token.
///
/// This is what locates the candidate row; resolution additionally requires
/// the constant-time equality check against the stored raw value.
#[must_use]
pub fn hash_consent_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Constant-time string equality.
///
/// Both inputs are padded to a common length before comparison so neither
/// content nor length mismatches short-circuit.
#[must_use]
pub fn constant_time_token_eq(a: &str, b: &str) -> bool {
    let max_len = a.len().max(b.len());

    let mut a_padded = vec![0_u8; max_len];
    let mut b_padded = vec![0_u8; max_len];

    for (slot, byte) in a_padded.iter_mut().zip(a.bytes()) {
        *slot = byte;
    }

    for (slot, byte) in b_padded.iter_mut().zip(b.bytes()) {
        *slot = byte;
    }

    let lengths_equal = a.len().ct_eq(&b.len());
    let contents_equal = a_padded.ct_eq(&b_padded);

    bool::from(lengths_equal & contents_equal)
}

fn encode_secret_hex(secret: &[u8; CONSENT_TOKEN_SECRET_BYTES]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    let mut encoded = String::with_capacity(CONSENT_TOKEN_SECRET_HEX_CHARS);

    for byte in secret {
        encoded.push(HEX[(byte >> 4) as usize] as char);
        encoded.push(HEX[(byte & 0x0f) as usize] as char);
    }

    encoded
}
