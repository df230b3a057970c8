//! Consent Tokens Repository

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::domain::{
    consent::records::{ConsentTokenRecord, ConsentTokenStatus, ConsentTokenUuid, ConsentUuid},
    quotes::records::QuoteUuid,
    tenants::records::TenantUuid,
};

const CREATE_CONSENT_TOKEN_SQL: &str = include_str!("../sql/create_consent_token.sql");
const FIND_TOKEN_BY_HASH_SQL: &str = include_str!("../sql/find_token_by_hash.sql");
const FIND_ACTIVE_TOKEN_FOR_QUOTE_SQL: &str =
    include_str!("../sql/find_active_token_for_quote.sql");
const MARK_TOKEN_EXPIRED_SQL: &str = include_str!("../sql/mark_token_expired.sql");
const CONSUME_TOKEN_SQL: &str = include_str!("../sql/consume_token.sql");
const REVOKE_ACTIVE_TOKENS_FOR_QUOTE_SQL: &str =
    include_str!("../sql/revoke_active_tokens_for_quote.sql");

/// A token row together with its stored raw value.
///
/// The stored value exists solely for the constant-time secondary check and
/// for returning an existing token from `get_or_create`; it never leaves the
/// service layer otherwise.
#[derive(Debug, Clone)]
pub(crate) struct CandidateToken {
    pub(crate) record: ConsentTokenRecord,
    pub(crate) token_value: String,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PgConsentTokensRepository;

impl PgConsentTokensRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_token(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        uuid: ConsentTokenUuid,
        quote: QuoteUuid,
        token_hash: &str,
        token_value: &str,
        expires_at: Timestamp,
    ) -> Result<ConsentTokenRecord, sqlx::Error> {
        query_as::<Postgres, CandidateToken>(CREATE_CONSENT_TOKEN_SQL)
            .bind(uuid.into_uuid())
            .bind(quote.into_uuid())
            .bind(token_hash)
            .bind(token_value)
            .bind(SqlxTimestamp::from(expires_at))
            .fetch_one(&mut **tx)
            .await
            .map(|candidate| candidate.record)
    }

    /// Locate a candidate row by token hash.
    ///
    /// Runs against the pool: the presented token is the credential, so no
    /// tenant context exists yet when this is called.
    pub(crate) async fn find_by_hash(
        &self,
        pool: &PgPool,
        token_hash: &str,
    ) -> Result<Option<CandidateToken>, sqlx::Error> {
        query_as::<Postgres, CandidateToken>(FIND_TOKEN_BY_HASH_SQL)
            .bind(token_hash)
            .fetch_optional(pool)
            .await
    }

    pub(crate) async fn find_active_for_quote(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        quote: QuoteUuid,
    ) -> Result<Option<CandidateToken>, sqlx::Error> {
        query_as::<Postgres, CandidateToken>(FIND_ACTIVE_TOKEN_FOR_QUOTE_SQL)
            .bind(quote.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    /// Persist a lazily observed expiry. Only flips rows still active.
    pub(crate) async fn mark_expired(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        token: ConsentTokenUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(MARK_TOKEN_EXPIRED_SQL)
            .bind(token.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// Compare-and-set consume: succeeds for at most one caller per token.
    pub(crate) async fn consume(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        token: ConsentTokenUuid,
        consent: ConsentUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(CONSUME_TOKEN_SQL)
            .bind(token.into_uuid())
            .bind(consent.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// Revoke every still-active token of the quote, in case more than one
    /// exists.
    pub(crate) async fn revoke_active_for_quote(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        quote: QuoteUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(REVOKE_ACTIVE_TOKENS_FOR_QUOTE_SQL)
            .bind(quote.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

impl<'r> FromRow<'r, PgRow> for CandidateToken {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let status_raw: String = row.try_get("status")?;

        let status =
            ConsentTokenStatus::parse(&status_raw).ok_or_else(|| sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: format!("unknown consent token status {status_raw:?}").into(),
            })?;

        let record = ConsentTokenRecord {
            uuid: ConsentTokenUuid::from_uuid(row.try_get("uuid")?),
            tenant_uuid: TenantUuid::from_uuid(row.try_get("tenant_uuid")?),
            quote_uuid: QuoteUuid::from_uuid(row.try_get("quote_uuid")?),
            status,
            expires_at: row.try_get::<SqlxTimestamp, _>("expires_at")?.to_jiff(),
            consumed_at: row
                .try_get::<Option<SqlxTimestamp>, _>("consumed_at")?
                .map(SqlxTimestamp::to_jiff),
            consent_uuid: row
                .try_get::<Option<uuid::Uuid>, _>("consent_uuid")?
                .map(ConsentUuid::from_uuid),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        };

        Ok(Self {
            record,
            token_value: row.try_get("token_value")?,
        })
    }
}
