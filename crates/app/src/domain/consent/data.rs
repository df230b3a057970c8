//! Consent Data

use crate::domain::{
    consent::records::{
        ConsentDecision, ConsentMethod, ConsentTokenRecord, ConsentTokenUuid, ConsentUuid,
    },
    quotes::records::QuoteUuid,
};

/// A freshly issued (or reused) consent token.
///
/// `token` is the raw value for the delivery channel; storage keeps only its
/// hash plus the value used for the secondary equality check.
#[derive(Debug, Clone)]
pub struct IssuedConsentToken {
    pub token: String,
    pub record: ConsentTokenRecord,
}

/// New Consent Data
#[derive(Debug, Clone)]
pub(crate) struct NewConsent {
    pub(crate) uuid: ConsentUuid,
    pub(crate) quote_uuid: QuoteUuid,
    pub(crate) token_uuid: Option<ConsentTokenUuid>,
    pub(crate) decision: ConsentDecision,
    pub(crate) method: ConsentMethod,
    pub(crate) requester_ip: String,
    pub(crate) evidence_ref: Option<String>,
}
