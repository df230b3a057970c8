//! Signing secret material and its storage encoding.

use std::fmt;

use rand::{RngCore, rngs::OsRng};
use zeroize::Zeroize;

/// Number of bytes in a signing secret.
pub const SIGNING_SECRET_BYTES: usize = 32;

const SIGNING_SECRET_HEX_CHARS: usize = SIGNING_SECRET_BYTES * 2;

/// Raw signing-secret material for one `(tenant, version)` pair.
///
/// Zeroed on drop; `Debug` never prints the bytes.
#[derive(Clone)]
pub struct SigningSecret {
    bytes: [u8; SIGNING_SECRET_BYTES],
}

impl SigningSecret {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; SIGNING_SECRET_BYTES]) -> Self {
        Self { bytes }
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SIGNING_SECRET_BYTES] {
        &self.bytes
    }

    /// Encode for storage.
    #[must_use]
    pub fn to_hex(&self) -> String {
        encode_hex(&self.bytes)
    }

    /// Decode from the stored representation.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        decode_hex(hex).map(Self::from_bytes)
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(**redacted**)")?;
        Ok(())
    }
}

impl Drop for SigningSecret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

/// Draw fresh secret material from the OS entropy source.
#[must_use]
pub fn generate_signing_secret() -> SigningSecret {
    let mut bytes = [0_u8; SIGNING_SECRET_BYTES];

    OsRng.fill_bytes(&mut bytes);

    SigningSecret::from_bytes(bytes)
}

fn encode_hex(bytes: &[u8; SIGNING_SECRET_BYTES]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    let mut encoded = String::with_capacity(SIGNING_SECRET_HEX_CHARS);

    for byte in bytes {
        encoded.push(HEX[(byte >> 4) as usize] as char);
        encoded.push(HEX[(byte & 0x0f) as usize] as char);
    }

    encoded
}

fn decode_hex(hex: &str) -> Option<[u8; SIGNING_SECRET_BYTES]> {
    if hex.len() != SIGNING_SECRET_HEX_CHARS {
        return None;
    }

    let mut bytes = [0_u8; SIGNING_SECRET_BYTES];
    let hex_bytes = hex.as_bytes();

    for (index, byte) in bytes.iter_mut().enumerate() {
        let hi = decode_hex_nibble(*hex_bytes.get(index * 2)?)?;
        let lo = decode_hex_nibble(*hex_bytes.get((index * 2) + 1)?)?;

        *byte = (hi << 4) | lo;
    }

    Some(bytes)
}

fn decode_hex_nibble(value: u8) -> Option<u8> {
    match value {
        b'0'..=b'9' => Some(value - b'0'),
        b'a'..=b'f' => Some(value - b'a' + 10),
        b'A'..=b'F' => Some(value - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let secret = SigningSecret::from_bytes([0xAB; SIGNING_SECRET_BYTES]);
        let decoded = SigningSecret::from_hex(&secret.to_hex()).expect("hex should decode");

        assert_eq!(decoded.as_bytes(), secret.as_bytes());
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        assert!(SigningSecret::from_hex("abcd").is_none());
    }

    #[test]
    fn from_hex_rejects_non_hex_input() {
        let input = "zz".repeat(SIGNING_SECRET_BYTES);

        assert!(SigningSecret::from_hex(&input).is_none());
    }

    #[test]
    fn generated_secrets_differ() {
        let a = generate_signing_secret();
        let b = generate_signing_secret();

        assert_ne!(a.as_bytes(), b.as_bytes(), "entropy source must not repeat");
    }

    #[test]
    fn debug_redacts_material() {
        let secret = SigningSecret::from_bytes([0x01; SIGNING_SECRET_BYTES]);

        assert_eq!(format!("{secret:?}"), "SigningSecret(**redacted**)");
    }
}
