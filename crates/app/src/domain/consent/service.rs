//! Consent service.

use async_trait::async_trait;
use jiff::{Span, Timestamp};
use mockall::automock;
use sqlx::{Postgres, Transaction};
use tracing::info;

use crate::{
    database::Db,
    domain::{
        consent::{
            data::{IssuedConsentToken, NewConsent},
            errors::ConsentServiceError,
            records::{
                ConsentDecision, ConsentMethod, ConsentRecord, ConsentTokenRecord,
                ConsentTokenStatus, ConsentTokenUuid, ConsentUuid,
            },
            repositories::{CandidateToken, PgConsentTokensRepository, PgConsentsRepository},
            token::{
                constant_time_token_eq, format_consent_token, generate_consent_token_secret,
                hash_consent_token, validate_consent_token,
            },
        },
        quotes::{
            PgQuotesRepository,
            records::{QuoteStatus, QuoteUuid},
        },
        settings::PgSettingsRepository,
        tenants::records::TenantUuid,
    },
};

#[derive(Debug, Clone)]
pub struct PgConsentService {
    db: Db,
    tokens: PgConsentTokensRepository,
    consents: PgConsentsRepository,
    quotes: PgQuotesRepository,
    settings: PgSettingsRepository,
}

impl PgConsentService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            tokens: PgConsentTokensRepository::new(),
            consents: PgConsentsRepository::new(),
            quotes: PgQuotesRepository::new(),
            settings: PgSettingsRepository::new(),
        }
    }

    /// Resolve a presented raw token to its stored row.
    ///
    /// The hash lookup finds the candidate; the constant-time comparison
    /// against the stored raw value must also pass. Every failure mode maps
    /// to `NotFound` so callers learn nothing about which check failed.
    async fn resolve_candidate(&self, raw: &str) -> Result<CandidateToken, ConsentServiceError> {
        validate_consent_token(raw).map_err(|_| ConsentServiceError::NotFound)?;

        let candidate = self
            .tokens
            .find_by_hash(self.db.pool(), &hash_consent_token(raw))
            .await?
            .ok_or(ConsentServiceError::NotFound)?;

        if !constant_time_token_eq(raw, &candidate.token_value) {
            return Err(ConsentServiceError::NotFound);
        }

        Ok(candidate)
    }

    /// Issue a fresh token for the quote on the current transaction.
    async fn issue_on_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        quote: QuoteUuid,
    ) -> Result<IssuedConsentToken, ConsentServiceError> {
        let quote_record = self.quotes.get_quote(tx, quote).await.map_err(quote_error)?;

        if !quote_record.status.is_editable() {
            return Err(ConsentServiceError::QuoteNotPending);
        }

        let settings = self.settings.get_or_create_settings(tx).await?;

        let secret = generate_consent_token_secret();
        let raw = format_consent_token(&secret);

        let expires_at = Timestamp::now()
            .saturating_add(Span::new().hours(i64::from(settings.consent_validity_days) * 24))
            .expect("hours-only span never overflows timestamp arithmetic");

        let record = self
            .tokens
            .create_token(
                tx,
                ConsentTokenUuid::new(),
                quote,
                &hash_consent_token(&raw),
                &raw,
                expires_at,
            )
            .await?;

        Ok(IssuedConsentToken { token: raw, record })
    }

    /// Apply an external party's decision carried by a raw token.
    async fn decide_with_token(
        &self,
        raw: &str,
        decision: ConsentDecision,
        requester_ip: &str,
    ) -> Result<ConsentRecord, ConsentServiceError> {
        let candidate = self.resolve_candidate(raw).await?;
        let token = candidate.record;

        let mut tx = self.db.begin_tenant_transaction(token.tenant_uuid).await?;

        match token.status {
            ConsentTokenStatus::Active => {}
            ConsentTokenStatus::Expired => return Err(ConsentServiceError::TokenExpired),
            ConsentTokenStatus::Consumed | ConsentTokenStatus::Revoked => {
                return Err(ConsentServiceError::TokenNotActive);
            }
        }

        if token.is_expired(Timestamp::now()) {
            // First read to observe the expiry persists it.
            self.tokens.mark_expired(&mut tx, token.uuid).await?;
            tx.commit().await?;

            return Err(ConsentServiceError::TokenExpired);
        }

        let consent_uuid = ConsentUuid::new();

        let consent = self
            .consents
            .create_consent(
                &mut tx,
                NewConsent {
                    uuid: consent_uuid,
                    quote_uuid: token.quote_uuid,
                    token_uuid: Some(token.uuid),
                    decision,
                    method: ConsentMethod::Token,
                    requester_ip: requester_ip.to_string(),
                    evidence_ref: None,
                },
            )
            .await?;

        match decision {
            ConsentDecision::Accept => {
                let consumed = self.tokens.consume(&mut tx, token.uuid, consent_uuid).await?;

                // A concurrent accept won the compare-and-set; dropping the
                // transaction also discards the consent row written above.
                if consumed == 0 {
                    return Err(ConsentServiceError::TokenNotActive);
                }

                self.transition_quote(&mut tx, token.quote_uuid, QuoteStatus::Accepted)
                    .await?;
            }
            ConsentDecision::Reject => {
                self.tokens
                    .revoke_active_for_quote(&mut tx, token.quote_uuid)
                    .await?;

                self.transition_quote(&mut tx, token.quote_uuid, QuoteStatus::Rejected)
                    .await?;
            }
        }

        tx.commit().await?;

        info!(
            quote_uuid = %token.quote_uuid,
            decision = decision.as_str(),
            "recorded consent decision"
        );

        Ok(consent)
    }

    /// Move the quote to `next` unless it is already there.
    async fn transition_quote(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        quote: QuoteUuid,
        next: QuoteStatus,
    ) -> Result<(), ConsentServiceError> {
        let record = self.quotes.get_quote(tx, quote).await.map_err(quote_error)?;

        if record.status == next {
            return Ok(());
        }

        if record.status.can_transition(next) {
            self.quotes.set_status(tx, quote, next).await?;
        }

        Ok(())
    }
}

fn quote_error(error: sqlx::Error) -> ConsentServiceError {
    if matches!(error, sqlx::Error::RowNotFound) {
        return ConsentServiceError::QuoteNotFound;
    }

    error.into()
}

#[async_trait]
impl ConsentService for PgConsentService {
    #[tracing::instrument(
        name = "consent.service.issue_token",
        skip(self),
        fields(tenant_uuid = %tenant, quote_uuid = %quote),
        err
    )]
    async fn issue_token(
        &self,
        tenant: TenantUuid,
        quote: QuoteUuid,
    ) -> Result<IssuedConsentToken, ConsentServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        let issued = self.issue_on_tx(&mut tx, quote).await?;

        tx.commit().await?;

        Ok(issued)
    }

    async fn get_or_create_token(
        &self,
        tenant: TenantUuid,
        quote: QuoteUuid,
    ) -> Result<IssuedConsentToken, ConsentServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        if let Some(candidate) = self.tokens.find_active_for_quote(&mut tx, quote).await? {
            if candidate.record.is_expired(Timestamp::now()) {
                self.tokens.mark_expired(&mut tx, candidate.record.uuid).await?;
            } else {
                tx.commit().await?;

                return Ok(IssuedConsentToken {
                    token: candidate.token_value,
                    record: candidate.record,
                });
            }
        }

        let issued = self.issue_on_tx(&mut tx, quote).await?;

        tx.commit().await?;

        Ok(issued)
    }

    async fn lookup(&self, raw_token: &str) -> Result<ConsentTokenRecord, ConsentServiceError> {
        let candidate = self.resolve_candidate(raw_token).await?;
        let token = candidate.record;

        match token.status {
            ConsentTokenStatus::Active => {}
            ConsentTokenStatus::Expired => return Err(ConsentServiceError::TokenExpired),
            ConsentTokenStatus::Consumed | ConsentTokenStatus::Revoked => {
                return Err(ConsentServiceError::TokenNotActive);
            }
        }

        if token.is_expired(Timestamp::now()) {
            let mut tx = self.db.begin_tenant_transaction(token.tenant_uuid).await?;

            self.tokens.mark_expired(&mut tx, token.uuid).await?;

            tx.commit().await?;

            return Err(ConsentServiceError::TokenExpired);
        }

        Ok(token)
    }

    async fn accept(
        &self,
        raw_token: &str,
        requester_ip: &str,
    ) -> Result<ConsentRecord, ConsentServiceError> {
        self.decide_with_token(raw_token, ConsentDecision::Accept, requester_ip)
            .await
    }

    async fn reject(
        &self,
        raw_token: &str,
        requester_ip: &str,
    ) -> Result<ConsentRecord, ConsentServiceError> {
        self.decide_with_token(raw_token, ConsentDecision::Reject, requester_ip)
            .await
    }

    #[tracing::instrument(
        name = "consent.service.record_staff_decision",
        skip(self),
        fields(tenant_uuid = %tenant, quote_uuid = %quote, decision = decision.as_str()),
        err
    )]
    async fn record_staff_decision(
        &self,
        tenant: TenantUuid,
        quote: QuoteUuid,
        decision: ConsentDecision,
        requester_ip: &str,
    ) -> Result<ConsentRecord, ConsentServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        self.quotes.get_quote(&mut tx, quote).await.map_err(quote_error)?;

        let consent = self
            .consents
            .create_consent(
                &mut tx,
                NewConsent {
                    uuid: ConsentUuid::new(),
                    quote_uuid: quote,
                    token_uuid: None,
                    decision,
                    method: ConsentMethod::Staff,
                    requester_ip: requester_ip.to_string(),
                    evidence_ref: None,
                },
            )
            .await?;

        match decision {
            ConsentDecision::Accept => {
                self.transition_quote(&mut tx, quote, QuoteStatus::Accepted)
                    .await?;
            }
            ConsentDecision::Reject => {
                self.tokens.revoke_active_for_quote(&mut tx, quote).await?;

                self.transition_quote(&mut tx, quote, QuoteStatus::Rejected)
                    .await?;
            }
        }

        tx.commit().await?;

        Ok(consent)
    }
}

#[automock]
#[async_trait]
/// Consent token lifecycle and decision recording.
pub trait ConsentService: Send + Sync {
    /// Issue a new single-use token for the quote.
    async fn issue_token(
        &self,
        tenant: TenantUuid,
        quote: QuoteUuid,
    ) -> Result<IssuedConsentToken, ConsentServiceError>;

    /// Return the quote's live token, or issue one when none exists.
    ///
    /// Best-effort single-live-token: the lookup and the insert are not
    /// covered by a uniqueness constraint, so two concurrent callers can
    /// both observe "no active token" and each issue one. Consuming one of
    /// the resulting siblings does not revoke the other; an explicit reject
    /// or staff revocation clears them all.
    async fn get_or_create_token(
        &self,
        tenant: TenantUuid,
        quote: QuoteUuid,
    ) -> Result<IssuedConsentToken, ConsentServiceError>;

    /// Resolve a presented raw token to a live, unexpired record.
    ///
    /// The first lookup that observes a passed expiry persists the expired
    /// state before rejecting.
    async fn lookup(&self, raw_token: &str) -> Result<ConsentTokenRecord, ConsentServiceError>;

    /// Consume the token and accept its quote.
    async fn accept(
        &self,
        raw_token: &str,
        requester_ip: &str,
    ) -> Result<ConsentRecord, ConsentServiceError>;

    /// Reject the quote and revoke all of its active tokens.
    async fn reject(
        &self,
        raw_token: &str,
        requester_ip: &str,
    ) -> Result<ConsentRecord, ConsentServiceError>;

    /// Record an accept/reject taken directly by staff, without a token.
    async fn record_staff_decision(
        &self,
        tenant: TenantUuid,
        quote: QuoteUuid,
        decision: ConsentDecision,
        requester_ip: &str,
    ) -> Result<ConsentRecord, ConsentServiceError>;
}
