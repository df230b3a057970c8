//! Receipt Records

use jiff::{Timestamp, civil::Date};

use crate::{
    domain::{consent::records::ConsentUuid, quotes::records::QuoteUuid},
    uuids::TypedUuid,
};

/// Receipt UUID
pub type ReceiptUuid = TypedUuid<ReceiptRecord>;

/// Receipt lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Issued,
    Revoked,
}

impl ReceiptStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Issued => "issued",
            Self::Revoked => "revoked",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "issued" => Some(Self::Issued),
            "revoked" => Some(Self::Revoked),
            _ => None,
        }
    }
}

/// Receipt Record
///
/// At most one exists per quote; re-issuing supersedes the derived fields in
/// place while the serial stays fixed.
#[derive(Debug, Clone)]
pub struct ReceiptRecord {
    pub uuid: ReceiptUuid,
    pub quote_uuid: QuoteUuid,
    pub consent_uuid: ConsentUuid,

    /// Sequence-generated serial, unique per tenant.
    pub serial: String,

    /// Receipted amount in minor currency units.
    pub amount: u64,

    pub issue_date: Date,

    /// Tamper-evidence content digest, hex-encoded.
    pub hash_full: String,

    /// Human-comparable short form of `hash_full` for the printed document.
    pub hash_short: String,

    /// HMAC over the receipt's identity, for third-party verification.
    pub verification_token: String,

    /// Signing-secret version the token was derived under.
    pub secret_version: i32,

    pub status: ReceiptStatus,

    /// End of the retention window; verification fails past this date.
    pub expires_at: Date,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Receipt Verification UUID
pub type ReceiptVerificationUuid = TypedUuid<ReceiptVerificationRecord>;

/// One appended audit row per verification attempt.
#[derive(Debug, Clone)]
pub struct ReceiptVerificationRecord {
    pub uuid: ReceiptVerificationUuid,
    pub receipt_uuid: Option<ReceiptUuid>,
    pub serial: String,
    pub outcome: String,
    pub failure_reason: Option<String>,
    pub requester_ip: String,
    pub checked_at: Timestamp,
}

/// Result of a verification request.
///
/// Expected outcomes, not errors: every variant is recorded in the audit
/// log, and only storage failures surface as service errors.
#[derive(Debug, Clone)]
pub enum VerificationOutcome {
    /// Signature valid, retention window open.
    Valid(Box<ReceiptRecord>),

    /// No receipt carries the presented serial.
    NotFound,

    /// The tenant has no signing secret configured at all.
    SecretMissing,

    /// The version the receipt was signed under is no longer configured.
    SecretVersionMissing,

    /// Signature mismatch; the only class that indicates a forged or wrong
    /// code.
    TokenInvalid,

    /// The receipt was administratively revoked.
    RecordRevoked,

    /// An otherwise-valid signature past the retention window.
    RecordExpired,
}

impl VerificationOutcome {
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Stable identifier recorded in the audit log.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Valid(_) => "valid",
            Self::NotFound => "not_found",
            Self::SecretMissing => "secret_missing",
            Self::SecretVersionMissing => "secret_version_missing",
            Self::TokenInvalid => "token_invalid",
            Self::RecordRevoked => "record_revoked",
            Self::RecordExpired => "record_expired",
        }
    }

    /// Failure classification, absent for valid outcomes.
    #[must_use]
    pub const fn failure_reason(&self) -> Option<&'static str> {
        match self {
            Self::Valid(_) => None,
            _ => Some(self.code()),
        }
    }

    /// Whether the failure is an operator problem rather than a bad code.
    #[must_use]
    pub const fn is_configuration_failure(&self) -> bool {
        matches!(self, Self::SecretMissing | Self::SecretVersionMissing)
    }
}
