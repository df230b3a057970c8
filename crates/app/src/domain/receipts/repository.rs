//! Receipts Repository

use jiff::civil::Date;
use jiff_sqlx::{Date as SqlxDate, Timestamp as SqlxTimestamp};
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::domain::{
    consent::records::ConsentUuid,
    quotes::records::QuoteUuid,
    receipts::records::{
        ReceiptRecord, ReceiptStatus, ReceiptUuid, ReceiptVerificationRecord,
        ReceiptVerificationUuid,
    },
};

const CREATE_RECEIPT_SQL: &str = include_str!("sql/create_receipt.sql");
const UPDATE_RECEIPT_SQL: &str = include_str!("sql/update_receipt.sql");
const FIND_RECEIPT_BY_QUOTE_SQL: &str = include_str!("sql/find_receipt_by_quote.sql");
const FIND_RECEIPT_BY_SERIAL_SQL: &str = include_str!("sql/find_receipt_by_serial.sql");
const REVOKE_RECEIPT_SQL: &str = include_str!("sql/revoke_receipt.sql");
const CREATE_RECEIPT_VERIFICATION_SQL: &str = include_str!("sql/create_receipt_verification.sql");
const LIST_RECEIPT_VERIFICATIONS_SQL: &str = include_str!("sql/list_receipt_verifications.sql");

/// All derived fields of a receipt, ready to insert or supersede.
#[derive(Debug, Clone)]
pub(crate) struct ReceiptDraft {
    pub(crate) uuid: ReceiptUuid,
    pub(crate) quote_uuid: QuoteUuid,
    pub(crate) consent_uuid: ConsentUuid,
    pub(crate) serial: String,
    pub(crate) amount: u64,
    pub(crate) issue_date: Date,
    pub(crate) hash_full: String,
    pub(crate) hash_short: String,
    pub(crate) verification_token: String,
    pub(crate) secret_version: i32,
    pub(crate) expires_at: Date,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PgReceiptsRepository;

impl PgReceiptsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_receipt(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        draft: &ReceiptDraft,
    ) -> Result<ReceiptRecord, sqlx::Error> {
        query_as::<Postgres, ReceiptRecord>(CREATE_RECEIPT_SQL)
            .bind(draft.uuid.into_uuid())
            .bind(draft.quote_uuid.into_uuid())
            .bind(draft.consent_uuid.into_uuid())
            .bind(&draft.serial)
            .bind(amount_to_i64(draft.amount))
            .bind(SqlxDate::from(draft.issue_date))
            .bind(&draft.hash_full)
            .bind(&draft.hash_short)
            .bind(&draft.verification_token)
            .bind(draft.secret_version)
            .bind(SqlxDate::from(draft.expires_at))
            .fetch_one(&mut **tx)
            .await
    }

    /// Supersede the derived fields of the quote's existing receipt; the
    /// serial and row identity stay fixed.
    pub(crate) async fn update_receipt(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        draft: &ReceiptDraft,
    ) -> Result<ReceiptRecord, sqlx::Error> {
        query_as::<Postgres, ReceiptRecord>(UPDATE_RECEIPT_SQL)
            .bind(draft.quote_uuid.into_uuid())
            .bind(draft.consent_uuid.into_uuid())
            .bind(amount_to_i64(draft.amount))
            .bind(SqlxDate::from(draft.issue_date))
            .bind(&draft.hash_full)
            .bind(&draft.hash_short)
            .bind(&draft.verification_token)
            .bind(draft.secret_version)
            .bind(SqlxDate::from(draft.expires_at))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn find_by_quote(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        quote: QuoteUuid,
    ) -> Result<Option<ReceiptRecord>, sqlx::Error> {
        query_as::<Postgres, ReceiptRecord>(FIND_RECEIPT_BY_QUOTE_SQL)
            .bind(quote.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn find_by_serial(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        serial: &str,
    ) -> Result<Option<ReceiptRecord>, sqlx::Error> {
        query_as::<Postgres, ReceiptRecord>(FIND_RECEIPT_BY_SERIAL_SQL)
            .bind(serial)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn revoke(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        receipt: ReceiptUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(REVOKE_RECEIPT_SQL)
            .bind(receipt.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// Append one audit row; nothing ever updates or deletes these.
    pub(crate) async fn create_verification(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        receipt: Option<ReceiptUuid>,
        serial: &str,
        outcome: &str,
        failure_reason: Option<&str>,
        requester_ip: &str,
    ) -> Result<ReceiptVerificationRecord, sqlx::Error> {
        query_as::<Postgres, ReceiptVerificationRecord>(CREATE_RECEIPT_VERIFICATION_SQL)
            .bind(ReceiptVerificationUuid::new().into_uuid())
            .bind(receipt.map(ReceiptUuid::into_uuid))
            .bind(serial)
            .bind(outcome)
            .bind(failure_reason)
            .bind(requester_ip)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn list_verifications(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        receipt: ReceiptUuid,
    ) -> Result<Vec<ReceiptVerificationRecord>, sqlx::Error> {
        query_as::<Postgres, ReceiptVerificationRecord>(LIST_RECEIPT_VERIFICATIONS_SQL)
            .bind(receipt.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for ReceiptRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let amount = try_get_amount(row, "amount")?;

        let status_raw: String = row.try_get("status")?;

        let status =
            ReceiptStatus::parse(&status_raw).ok_or_else(|| sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: format!("unknown receipt status {status_raw:?}").into(),
            })?;

        Ok(Self {
            uuid: ReceiptUuid::from_uuid(row.try_get("uuid")?),
            quote_uuid: QuoteUuid::from_uuid(row.try_get("quote_uuid")?),
            consent_uuid: ConsentUuid::from_uuid(row.try_get("consent_uuid")?),
            serial: row.try_get("serial")?,
            amount,
            issue_date: row.try_get::<SqlxDate, _>("issue_date")?.to_jiff(),
            hash_full: row.try_get("hash_full")?,
            hash_short: row.try_get("hash_short")?,
            verification_token: row.try_get("verification_token")?,
            secret_version: row.try_get("secret_version")?,
            status,
            expires_at: row.try_get::<SqlxDate, _>("expires_at")?.to_jiff(),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for ReceiptVerificationRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: ReceiptVerificationUuid::from_uuid(row.try_get("uuid")?),
            receipt_uuid: row
                .try_get::<Option<uuid::Uuid>, _>("receipt_uuid")?
                .map(ReceiptUuid::from_uuid),
            serial: row.try_get("serial")?,
            outcome: row.try_get("outcome")?,
            failure_reason: row.try_get("failure_reason")?,
            requester_ip: row.try_get("requester_ip")?,
            checked_at: row.try_get::<SqlxTimestamp, _>("checked_at")?.to_jiff(),
        })
    }
}

fn try_get_amount(row: &PgRow, col: &str) -> Result<u64, sqlx::Error> {
    let amount_i64: i64 = row.try_get(col)?;

    u64::try_from(amount_i64).map_err(|e| sqlx::Error::ColumnDecode {
        index: col.to_string(),
        source: Box::new(e),
    })
}

fn amount_to_i64(amount: u64) -> i64 {
    i64::try_from(amount).unwrap_or(i64::MAX)
}
