//! Receipts service.

use async_trait::async_trait;
use jiff::{Span, Timestamp, civil::Date, tz::TimeZone};
use mockall::automock;
use sqlx::{Postgres, Transaction};
use tracing::info;

use crate::{
    database::Db,
    domain::{
        consent::{PgConsentsRepository, records::ConsentUuid},
        customers::PgCustomersRepository,
        quotes::{
            PgQuoteItemsRepository, PgQuotesRepository,
            records::{QuoteRecord, QuoteStatus, QuoteUuid},
        },
        receipts::{
            errors::ReceiptsServiceError,
            records::{
                ReceiptRecord, ReceiptStatus, ReceiptUuid, ReceiptVerificationRecord,
                VerificationOutcome,
            },
            repository::{PgReceiptsRepository, ReceiptDraft},
            signing::{
                ReceiptSnapshot, SnapshotLine, content_hash, mask_customer_name,
                verification_token, verify_token,
            },
        },
        sequences::PgSequencesRepository,
        settings::{PgSettingsRepository, records::SigningSecretRecord},
        tenants::records::TenantUuid,
    },
};

#[derive(Debug, Clone)]
pub struct PgReceiptsService {
    db: Db,
    receipts: PgReceiptsRepository,
    quotes: PgQuotesRepository,
    quote_items: PgQuoteItemsRepository,
    customers: PgCustomersRepository,
    consents: PgConsentsRepository,
    settings: PgSettingsRepository,
    sequences: PgSequencesRepository,
}

impl PgReceiptsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            receipts: PgReceiptsRepository::new(),
            quotes: PgQuotesRepository::new(),
            quote_items: PgQuoteItemsRepository::new(),
            customers: PgCustomersRepository::new(),
            consents: PgConsentsRepository::new(),
            settings: PgSettingsRepository::new(),
            sequences: PgSequencesRepository::new(),
        }
    }

    /// Classify one verification request against a found receipt.
    fn classify(
        receipt: ReceiptRecord,
        secrets: &[SigningSecretRecord],
        presented_token: &str,
        today: Date,
    ) -> VerificationOutcome {
        if secrets.is_empty() {
            return VerificationOutcome::SecretMissing;
        }

        let Some(signer) = secrets
            .iter()
            .find(|record| record.version == receipt.secret_version)
        else {
            return VerificationOutcome::SecretVersionMissing;
        };

        // Signature first: a forged code learns nothing about revocation or
        // retention state.
        if !verify_token(
            &signer.secret,
            &receipt.serial,
            receipt.amount,
            receipt.issue_date,
            presented_token,
        ) {
            return VerificationOutcome::TokenInvalid;
        }

        if receipt.status == ReceiptStatus::Revoked {
            return VerificationOutcome::RecordRevoked;
        }

        if receipt.expires_at < today {
            return VerificationOutcome::RecordExpired;
        }

        VerificationOutcome::Valid(Box::new(receipt))
    }

    async fn snapshot_for(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        quote: &QuoteRecord,
        consent: ConsentUuid,
        serial: &str,
        issue_date: Date,
    ) -> Result<ReceiptSnapshot, ReceiptsServiceError> {
        let customer = self
            .customers
            .find_customer(tx, quote.customer_uuid)
            .await?
            .map_or_else(String::new, |record| record.name);

        let items = self.quote_items.list_items(tx, quote.uuid).await?;

        Ok(ReceiptSnapshot {
            serial: serial.to_string(),
            quote_uuid: quote.uuid.into_uuid(),
            total: quote.total,
            issue_date,
            customer: mask_customer_name(&customer),
            consent_uuid: consent.into_uuid(),
            lines: items
                .into_iter()
                .map(|item| SnapshotLine {
                    description: item.description,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    line_total: item.line_total,
                })
                .collect(),
        })
    }
}

fn today_utc() -> Date {
    Timestamp::now().to_zoned(TimeZone::UTC).date()
}

fn quote_error(error: sqlx::Error) -> ReceiptsServiceError {
    if matches!(error, sqlx::Error::RowNotFound) {
        return ReceiptsServiceError::QuoteNotFound;
    }

    error.into()
}

#[async_trait]
impl ReceiptsService for PgReceiptsService {
    #[tracing::instrument(
        name = "receipts.service.issue_receipt",
        skip(self),
        fields(
            tenant_uuid = %tenant,
            quote_uuid = %quote,
            serial = tracing::field::Empty,
            secret_version = tracing::field::Empty,
        ),
        err
    )]
    async fn issue_receipt(
        &self,
        tenant: TenantUuid,
        quote: QuoteUuid,
        consent: ConsentUuid,
    ) -> Result<ReceiptRecord, ReceiptsServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        let quote_record = self.quotes.get_quote(&mut tx, quote).await.map_err(quote_error)?;

        if quote_record.status != QuoteStatus::Accepted {
            return Err(ReceiptsServiceError::QuoteNotAccepted);
        }

        let consent_record = self
            .consents
            .find_consent(&mut tx, consent)
            .await?
            .ok_or(ReceiptsServiceError::ConsentNotFound)?;

        if consent_record.quote_uuid != quote {
            return Err(ReceiptsServiceError::ConsentNotFound);
        }

        let settings = self.settings.get_or_create_settings(&mut tx).await?;
        let secrets = self.settings.list_signing_secrets(&mut tx).await?;

        let signer = secrets.last().ok_or(ReceiptsServiceError::SecretMissing)?;

        let existing = self.receipts.find_by_quote(&mut tx, quote).await?;

        // Re-issuance keeps the serial; only the first issuance draws one.
        let serial = match &existing {
            Some(receipt) => receipt.serial.clone(),
            None => {
                let issue_year = i32::from(Timestamp::now().to_zoned(TimeZone::UTC).year());

                self.sequences
                    .next_document_number(&mut tx, issue_year, &settings.number_prefix)
                    .await?
                    .formatted
            }
        };

        let issue_date = today_utc();
        let expires_at =
            issue_date.saturating_add(Span::new().years(i64::from(settings.retention_years)));

        let token = verification_token(&signer.secret, &serial, quote_record.total, issue_date);

        let snapshot = self
            .snapshot_for(&mut tx, &quote_record, consent, &serial, issue_date)
            .await?;

        let (hash_full, hash_short) = content_hash(&snapshot);

        let draft = ReceiptDraft {
            uuid: existing
                .as_ref()
                .map_or_else(ReceiptUuid::new, |receipt| receipt.uuid),
            quote_uuid: quote,
            consent_uuid: consent,
            serial,
            amount: quote_record.total,
            issue_date,
            hash_full,
            hash_short,
            verification_token: token,
            secret_version: signer.version,
            expires_at,
        };

        let record = if existing.is_some() {
            self.receipts.update_receipt(&mut tx, &draft).await?
        } else {
            self.receipts.create_receipt(&mut tx, &draft).await?
        };

        tx.commit().await?;

        let span = tracing::Span::current();
        span.record("serial", tracing::field::display(&record.serial));
        span.record("secret_version", record.secret_version);

        info!(serial = %record.serial, "issued receipt");

        Ok(record)
    }

    async fn verify(
        &self,
        tenant: TenantUuid,
        serial: &str,
        token: &str,
        requester_ip: &str,
    ) -> Result<VerificationOutcome, ReceiptsServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        let found = self.receipts.find_by_serial(&mut tx, serial).await?;

        let receipt_uuid = found.as_ref().map(|receipt| receipt.uuid);

        let outcome = match found {
            None => VerificationOutcome::NotFound,
            Some(receipt) => {
                let secrets = self.settings.list_signing_secrets(&mut tx).await?;

                Self::classify(receipt, &secrets, token, today_utc())
            }
        };

        // Every attempt is recorded, successes included; the audit append
        // commits even for failure outcomes.
        self.receipts
            .create_verification(
                &mut tx,
                receipt_uuid,
                serial,
                outcome.code(),
                outcome.failure_reason(),
                requester_ip,
            )
            .await?;

        tx.commit().await?;

        Ok(outcome)
    }

    async fn revoke_receipt(
        &self,
        tenant: TenantUuid,
        receipt: ReceiptUuid,
    ) -> Result<(), ReceiptsServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        let rows_affected = self.receipts.revoke(&mut tx, receipt).await?;

        if rows_affected == 0 {
            return Err(ReceiptsServiceError::NotFound);
        }

        tx.commit().await?;

        Ok(())
    }

    async fn verification_log(
        &self,
        tenant: TenantUuid,
        receipt: ReceiptUuid,
    ) -> Result<Vec<ReceiptVerificationRecord>, ReceiptsServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        let log = self.receipts.list_verifications(&mut tx, receipt).await?;

        tx.commit().await?;

        Ok(log)
    }
}

#[automock]
#[async_trait]
/// Receipt issuance and third-party verification.
pub trait ReceiptsService: Send + Sync {
    /// Issue (or re-issue) the receipt for an accepted quote.
    ///
    /// A quote carries at most one receipt; issuing again supersedes every
    /// derived field under the then-current signing secret while the serial
    /// stays fixed.
    async fn issue_receipt(
        &self,
        tenant: TenantUuid,
        quote: QuoteUuid,
        consent: ConsentUuid,
    ) -> Result<ReceiptRecord, ReceiptsServiceError>;

    /// Verify a presented serial/token pair and append one audit row.
    ///
    /// All expected outcomes, including failures, return `Ok`; only storage
    /// problems are errors.
    async fn verify(
        &self,
        tenant: TenantUuid,
        serial: &str,
        token: &str,
        requester_ip: &str,
    ) -> Result<VerificationOutcome, ReceiptsServiceError>;

    /// Administratively revoke a receipt.
    async fn revoke_receipt(
        &self,
        tenant: TenantUuid,
        receipt: ReceiptUuid,
    ) -> Result<(), ReceiptsServiceError>;

    /// The append-only audit trail of one receipt.
    async fn verification_log(
        &self,
        tenant: TenantUuid,
        receipt: ReceiptUuid,
    ) -> Result<Vec<ReceiptVerificationRecord>, ReceiptsServiceError>;
}

#[cfg(test)]
mod tests {
    use sqlx::query;
    use testresult::TestResult;

    use crate::{
        domain::settings::SettingsService,
        test::{TestContext, helpers},
    };

    use super::*;

    const TEST_IP: &str = "198.51.100.2";

    async fn accepted_quote_with_consent(
        ctx: &TestContext,
    ) -> TestResult<(QuoteUuid, ConsentUuid, u64)> {
        let quote = helpers::create_simple_quote(ctx, ctx.tenant_uuid).await?;
        let consent = helpers::accept_quote(ctx, quote.uuid).await?;

        Ok((quote.uuid, consent.uuid, quote.total))
    }

    #[tokio::test]
    async fn issue_then_verify_round_trips() -> TestResult {
        let ctx = TestContext::new().await;

        let (quote, consent, total) = accepted_quote_with_consent(&ctx).await?;

        let receipt = ctx
            .receipts
            .issue_receipt(ctx.tenant_uuid, quote, consent)
            .await?;

        assert_eq!(receipt.amount, total);
        assert_eq!(receipt.secret_version, 1);

        let outcome = ctx
            .receipts
            .verify(
                ctx.tenant_uuid,
                &receipt.serial,
                &receipt.verification_token,
                TEST_IP,
            )
            .await?;

        let VerificationOutcome::Valid(verified) = outcome else {
            panic!("expected Valid, got {outcome:?}");
        };

        assert_eq!(verified.amount, receipt.amount);
        assert_eq!(verified.issue_date, receipt.issue_date);
        assert_eq!(verified.serial, receipt.serial);

        Ok(())
    }

    #[tokio::test]
    async fn rotation_keeps_old_receipts_verifiable() -> TestResult {
        let ctx = TestContext::new().await;

        let (quote, consent, _) = accepted_quote_with_consent(&ctx).await?;

        let receipt = ctx
            .receipts
            .issue_receipt(ctx.tenant_uuid, quote, consent)
            .await?;

        // Add a new secret version without removing the old one.
        ctx.settings.rotate_signing_secret(ctx.tenant_uuid).await?;

        let outcome = ctx
            .receipts
            .verify(
                ctx.tenant_uuid,
                &receipt.serial,
                &receipt.verification_token,
                TEST_IP,
            )
            .await?;

        assert!(
            outcome.is_valid(),
            "receipt signed under version 1 must verify after rotation, got {outcome:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn reissue_supersedes_in_place() -> TestResult {
        let ctx = TestContext::new().await;

        let (quote, consent, _) = accepted_quote_with_consent(&ctx).await?;

        let first = ctx
            .receipts
            .issue_receipt(ctx.tenant_uuid, quote, consent)
            .await?;

        ctx.settings.rotate_signing_secret(ctx.tenant_uuid).await?;

        let second = ctx
            .receipts
            .issue_receipt(ctx.tenant_uuid, quote, consent)
            .await?;

        assert_eq!(second.uuid, first.uuid, "same row, superseded fields");
        assert_eq!(second.serial, first.serial, "serial never changes");
        assert_eq!(second.secret_version, 2);
        assert_ne!(second.verification_token, first.verification_token);

        let receipt_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM receipts WHERE quote_uuid = $1")
                .bind(quote.into_uuid())
                .fetch_one(ctx.db.pool())
                .await?;

        assert_eq!(receipt_count, 1, "re-issuance must not add rows");

        // The superseded token verifies; the first one no longer does.
        let outcome = ctx
            .receipts
            .verify(
                ctx.tenant_uuid,
                &second.serial,
                &second.verification_token,
                TEST_IP,
            )
            .await?;
        assert!(outcome.is_valid(), "got {outcome:?}");

        let stale = ctx
            .receipts
            .verify(
                ctx.tenant_uuid,
                &first.serial,
                &first.verification_token,
                TEST_IP,
            )
            .await?;
        assert!(
            matches!(stale, VerificationOutcome::TokenInvalid),
            "expected TokenInvalid for the superseded token, got {stale:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn issuing_for_a_draft_quote_is_refused() -> TestResult {
        let ctx = TestContext::new().await;

        let quote = helpers::create_simple_quote(&ctx, ctx.tenant_uuid).await?;

        let result = ctx
            .receipts
            .issue_receipt(ctx.tenant_uuid, quote.uuid, ConsentUuid::new())
            .await;

        assert!(
            matches!(result, Err(ReceiptsServiceError::QuoteNotAccepted)),
            "expected QuoteNotAccepted, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn unknown_serial_verifies_as_not_found_and_is_logged() -> TestResult {
        let ctx = TestContext::new().await;

        let outcome = ctx
            .receipts
            .verify(ctx.tenant_uuid, "Q-2020-999999", "whatever", TEST_IP)
            .await?;

        assert!(
            matches!(outcome, VerificationOutcome::NotFound),
            "expected NotFound, got {outcome:?}"
        );

        let logged: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM receipt_verifications WHERE serial = 'Q-2020-999999'",
        )
        .fetch_one(ctx.db.pool())
        .await?;

        assert_eq!(logged, 1, "failed attempts must still be audited");

        Ok(())
    }

    #[tokio::test]
    async fn tampered_token_is_the_only_forgery_class() -> TestResult {
        let ctx = TestContext::new().await;

        let (quote, consent, _) = accepted_quote_with_consent(&ctx).await?;

        let receipt = ctx
            .receipts
            .issue_receipt(ctx.tenant_uuid, quote, consent)
            .await?;

        let outcome = ctx
            .receipts
            .verify(ctx.tenant_uuid, &receipt.serial, "Zm9yZ2VkLXRva2Vu", TEST_IP)
            .await?;

        assert!(
            matches!(outcome, VerificationOutcome::TokenInvalid),
            "expected TokenInvalid, got {outcome:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn missing_secret_version_is_a_configuration_outcome() -> TestResult {
        let ctx = TestContext::new().await;

        let (quote, consent, _) = accepted_quote_with_consent(&ctx).await?;

        let receipt = ctx
            .receipts
            .issue_receipt(ctx.tenant_uuid, quote, consent)
            .await?;

        // Rotate so another version exists, then drop the recorded one.
        ctx.settings.rotate_signing_secret(ctx.tenant_uuid).await?;

        query("DELETE FROM signing_secrets WHERE tenant_uuid = $1 AND version = 1")
            .bind(ctx.tenant_uuid.into_uuid())
            .execute(ctx.db.pool())
            .await?;

        let outcome = ctx
            .receipts
            .verify(
                ctx.tenant_uuid,
                &receipt.serial,
                &receipt.verification_token,
                TEST_IP,
            )
            .await?;

        assert!(
            matches!(outcome, VerificationOutcome::SecretVersionMissing),
            "expected SecretVersionMissing, got {outcome:?}"
        );
        assert!(outcome.is_configuration_failure());

        Ok(())
    }

    #[tokio::test]
    async fn no_secrets_at_all_reports_secret_missing() -> TestResult {
        let ctx = TestContext::new().await;

        let (quote, consent, _) = accepted_quote_with_consent(&ctx).await?;

        let receipt = ctx
            .receipts
            .issue_receipt(ctx.tenant_uuid, quote, consent)
            .await?;

        query("DELETE FROM signing_secrets WHERE tenant_uuid = $1")
            .bind(ctx.tenant_uuid.into_uuid())
            .execute(ctx.db.pool())
            .await?;

        let outcome = ctx
            .receipts
            .verify(
                ctx.tenant_uuid,
                &receipt.serial,
                &receipt.verification_token,
                TEST_IP,
            )
            .await?;

        assert!(
            matches!(outcome, VerificationOutcome::SecretMissing),
            "expected SecretMissing, got {outcome:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn retention_window_expiry_rejects_authentic_tokens() -> TestResult {
        let ctx = TestContext::new().await;

        let (quote, consent, _) = accepted_quote_with_consent(&ctx).await?;

        let receipt = ctx
            .receipts
            .issue_receipt(ctx.tenant_uuid, quote, consent)
            .await?;

        query("UPDATE receipts SET expires_at = current_date - 1 WHERE uuid = $1")
            .bind(receipt.uuid.into_uuid())
            .execute(ctx.db.pool())
            .await?;

        let authentic = ctx
            .receipts
            .verify(
                ctx.tenant_uuid,
                &receipt.serial,
                &receipt.verification_token,
                TEST_IP,
            )
            .await?;

        assert!(
            matches!(authentic, VerificationOutcome::RecordExpired),
            "expected RecordExpired, got {authentic:?}"
        );

        // A forged code against the same expired receipt still reads as a
        // forgery, not as expiry.
        let forged = ctx
            .receipts
            .verify(ctx.tenant_uuid, &receipt.serial, "Zm9yZ2VkLXRva2Vu", TEST_IP)
            .await?;

        assert!(
            matches!(forged, VerificationOutcome::TokenInvalid),
            "expected TokenInvalid, got {forged:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn revoked_receipt_reports_revocation() -> TestResult {
        let ctx = TestContext::new().await;

        let (quote, consent, _) = accepted_quote_with_consent(&ctx).await?;

        let receipt = ctx
            .receipts
            .issue_receipt(ctx.tenant_uuid, quote, consent)
            .await?;

        ctx.receipts
            .revoke_receipt(ctx.tenant_uuid, receipt.uuid)
            .await?;

        let outcome = ctx
            .receipts
            .verify(
                ctx.tenant_uuid,
                &receipt.serial,
                &receipt.verification_token,
                TEST_IP,
            )
            .await?;

        assert!(
            matches!(outcome, VerificationOutcome::RecordRevoked),
            "expected RecordRevoked, got {outcome:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn every_attempt_is_appended_to_the_audit_log() -> TestResult {
        let ctx = TestContext::new().await;

        let (quote, consent, _) = accepted_quote_with_consent(&ctx).await?;

        let receipt = ctx
            .receipts
            .issue_receipt(ctx.tenant_uuid, quote, consent)
            .await?;

        ctx.receipts
            .verify(
                ctx.tenant_uuid,
                &receipt.serial,
                &receipt.verification_token,
                TEST_IP,
            )
            .await?;

        ctx.receipts
            .verify(ctx.tenant_uuid, &receipt.serial, "bad-token", TEST_IP)
            .await?;

        let log = ctx
            .receipts
            .verification_log(ctx.tenant_uuid, receipt.uuid)
            .await?;

        assert_eq!(log.len(), 2);

        let first = log.first().expect("first attempt should be logged");
        let second = log.get(1).expect("second attempt should be logged");

        assert_eq!(first.outcome, "valid");
        assert_eq!(first.failure_reason, None);
        assert_eq!(second.outcome, "token_invalid");
        assert_eq!(second.failure_reason.as_deref(), Some("token_invalid"));
        assert_eq!(second.requester_ip, TEST_IP);

        Ok(())
    }

    #[tokio::test]
    async fn verification_is_tenant_scoped() -> TestResult {
        let ctx = TestContext::new().await;

        let (quote, consent, _) = accepted_quote_with_consent(&ctx).await?;

        let receipt = ctx
            .receipts
            .issue_receipt(ctx.tenant_uuid, quote, consent)
            .await?;

        let tenant_b = ctx.create_tenant("Tenant B").await;

        let outcome = ctx
            .receipts
            .verify(
                tenant_b,
                &receipt.serial,
                &receipt.verification_token,
                TEST_IP,
            )
            .await?;

        assert!(
            matches!(outcome, VerificationOutcome::NotFound),
            "expected NotFound across tenants, got {outcome:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn receipt_serial_continues_the_document_sequence() -> TestResult {
        let ctx = TestContext::new().await;

        let (quote, consent, _) = accepted_quote_with_consent(&ctx).await?;

        let receipt = ctx
            .receipts
            .issue_receipt(ctx.tenant_uuid, quote, consent)
            .await?;

        let year = i32::from(Timestamp::now().to_zoned(TimeZone::UTC).year());

        // The quote consumed 000001; its receipt draws the next number.
        assert_eq!(receipt.serial, format!("Q-{year}-000002"));

        Ok(())
    }
}
