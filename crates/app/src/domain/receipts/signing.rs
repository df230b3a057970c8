//! Receipt signing and tamper evidence.
//!
//! Two independent artifacts protect a receipt:
//!
//! - the **verification token**, an HMAC-SHA-256 over the receipt's identity
//!   under a versioned tenant secret, checked server-side on lookup; and
//! - the **content hash**, a SHA-256 digest over a structured snapshot of the
//!   printed document, whose short form lets a human compare the paper copy
//!   against the online record by eye.
//!
//! The two are not bound to each other; one proves the server issued the
//! document, the other that its visible content is unchanged.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use jiff::civil::Date;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::settings::secrets::SigningSecret;

type HmacSha256 = Hmac<Sha256>;

/// Derive the verification token for a receipt's identity.
#[must_use]
pub fn verification_token(
    secret: &SigningSecret,
    serial: &str,
    amount: u64,
    issue_date: Date,
) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));

    mac.update(hmac_input(serial, amount, issue_date).as_bytes());

    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

/// Check a presented token against the receipt's identity in constant time.
#[must_use]
pub fn verify_token(
    secret: &SigningSecret,
    serial: &str,
    amount: u64,
    issue_date: Date,
    presented: &str,
) -> bool {
    let Ok(presented_bytes) = URL_SAFE_NO_PAD.decode(presented) else {
        return false;
    };

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));

    mac.update(hmac_input(serial, amount, issue_date).as_bytes());

    mac.verify_slice(&presented_bytes).is_ok()
}

fn hmac_input(serial: &str, amount: u64, issue_date: Date) -> String {
    format!("{serial}|{amount}|{issue_date}")
}

/// Structured content the tamper-evidence hash is computed over.
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptSnapshot {
    pub serial: String,
    pub quote_uuid: Uuid,
    pub total: u64,
    pub issue_date: Date,

    /// Masked customer identity; the hash must not leak the full name.
    pub customer: String,

    pub consent_uuid: Uuid,
    pub lines: Vec<SnapshotLine>,
}

/// One line of the hashed snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotLine {
    pub description: String,
    pub quantity: i64,
    pub unit_price: u64,
    pub line_total: u64,
}

/// Hex digest of the snapshot plus its short human-comparable form.
#[must_use]
pub fn content_hash(snapshot: &ReceiptSnapshot) -> (String, String) {
    let encoded = serde_json::to_string(snapshot).unwrap_or_default();
    let digest = Sha256::digest(encoded.as_bytes());

    let hash_full = format!("{digest:x}");
    let hash_short = short_form(&digest);

    (hash_full, hash_short)
}

/// Re-encode the leading digest bytes as `XXXX-XXXX` for visual comparison.
fn short_form(digest: &[u8]) -> String {
    match digest {
        [a, b, c, d, ..] => format!("{a:02X}{b:02X}-{c:02X}{d:02X}"),
        _ => String::new(),
    }
}

/// Mask a customer identity down to its first character.
#[must_use]
pub fn mask_customer_name(name: &str) -> String {
    match name.chars().next() {
        Some(first) => format!("{first}***"),
        None => "***".to_string(),
    }
}

/// Public lookup URL carrying the serial and token.
#[must_use]
pub fn verify_url(base: &str, serial: &str, token: &str) -> String {
    format!("{}/verify?serial={serial}&token={token}", base.trim_end_matches('/'))
}

/// Delimited payload embedded in the printed QR code.
#[must_use]
pub fn qr_payload(
    serial: &str,
    amount: u64,
    issue_date: Date,
    secret_version: i32,
    token: &str,
) -> String {
    format!("{serial}|{amount}|{issue_date}|{secret_version}|{token}")
}
