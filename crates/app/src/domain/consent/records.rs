//! Consent Records

use jiff::Timestamp;

use crate::{
    domain::{quotes::records::QuoteUuid, tenants::records::TenantUuid},
    uuids::TypedUuid,
};

/// Consent Token UUID
pub type ConsentTokenUuid = TypedUuid<ConsentTokenRecord>;

/// Consent token lifecycle states.
///
/// `Active` is the only live state; the other three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentTokenStatus {
    Active,
    Consumed,
    Revoked,
    Expired,
}

impl ConsentTokenStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Consumed => "consumed",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "consumed" => Some(Self::Consumed),
            "revoked" => Some(Self::Revoked),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// Consent Token Record
///
/// The raw token value never appears here; callers receive it exactly once
/// at issuance.
#[derive(Debug, Clone)]
pub struct ConsentTokenRecord {
    pub uuid: ConsentTokenUuid,
    pub tenant_uuid: TenantUuid,
    pub quote_uuid: QuoteUuid,
    pub status: ConsentTokenStatus,
    pub expires_at: Timestamp,
    pub consumed_at: Option<Timestamp>,
    pub consent_uuid: Option<ConsentUuid>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ConsentTokenRecord {
    /// Whether the stored expiry lies in the past as of `now`.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at < now
    }
}

/// The two decisions an external party can take on a quote.
///
/// A closed set: every transition in the consent flow is driven by this
/// variant, never by comparing request strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentDecision {
    Accept,
    Reject,
}

impl ConsentDecision {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "accept" => Some(Self::Accept),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

/// How a consent decision reached the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentMethod {
    /// Via a consent-token link, without authentication.
    Token,

    /// Recorded directly by an authenticated staff member.
    Staff,
}

impl ConsentMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::Staff => "staff",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "token" => Some(Self::Token),
            "staff" => Some(Self::Staff),
            _ => None,
        }
    }
}

/// Consent UUID
pub type ConsentUuid = TypedUuid<ConsentRecord>;

/// Immutable record of one accept/reject event.
#[derive(Debug, Clone)]
pub struct ConsentRecord {
    pub uuid: ConsentUuid,
    pub quote_uuid: QuoteUuid,
    pub token_uuid: Option<ConsentTokenUuid>,
    pub decision: ConsentDecision,
    pub method: ConsentMethod,
    pub requester_ip: String,
    pub evidence_ref: Option<String>,
    pub decided_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_status_round_trips() {
        for status in [
            ConsentTokenStatus::Active,
            ConsentTokenStatus::Consumed,
            ConsentTokenStatus::Revoked,
            ConsentTokenStatus::Expired,
        ] {
            assert_eq!(ConsentTokenStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn only_active_is_non_terminal() {
        assert!(!ConsentTokenStatus::Active.is_terminal());
        assert!(ConsentTokenStatus::Consumed.is_terminal());
        assert!(ConsentTokenStatus::Revoked.is_terminal());
        assert!(ConsentTokenStatus::Expired.is_terminal());
    }

    #[test]
    fn decision_parses_closed_set_only() {
        assert_eq!(ConsentDecision::parse("accept"), Some(ConsentDecision::Accept));
        assert_eq!(ConsentDecision::parse("reject"), Some(ConsentDecision::Reject));
        assert_eq!(ConsentDecision::parse("maybe"), None);
    }
}
