//! Consents Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as};

use crate::domain::{
    consent::{
        data::NewConsent,
        records::{ConsentDecision, ConsentMethod, ConsentRecord, ConsentTokenUuid, ConsentUuid},
    },
    quotes::records::QuoteUuid,
};

const CREATE_CONSENT_SQL: &str = include_str!("../sql/create_consent.sql");
const FIND_CONSENT_SQL: &str = include_str!("../sql/find_consent.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgConsentsRepository;

impl PgConsentsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_consent(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        consent: NewConsent,
    ) -> Result<ConsentRecord, sqlx::Error> {
        query_as::<Postgres, ConsentRecord>(CREATE_CONSENT_SQL)
            .bind(consent.uuid.into_uuid())
            .bind(consent.quote_uuid.into_uuid())
            .bind(consent.token_uuid.map(ConsentTokenUuid::into_uuid))
            .bind(consent.decision.as_str())
            .bind(consent.method.as_str())
            .bind(consent.requester_ip)
            .bind(consent.evidence_ref)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn find_consent(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        consent: ConsentUuid,
    ) -> Result<Option<ConsentRecord>, sqlx::Error> {
        query_as::<Postgres, ConsentRecord>(FIND_CONSENT_SQL)
            .bind(consent.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for ConsentRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let decision_raw: String = row.try_get("decision")?;
        let method_raw: String = row.try_get("method")?;

        let decision =
            ConsentDecision::parse(&decision_raw).ok_or_else(|| sqlx::Error::ColumnDecode {
                index: "decision".to_string(),
                source: format!("unknown consent decision {decision_raw:?}").into(),
            })?;

        let method =
            ConsentMethod::parse(&method_raw).ok_or_else(|| sqlx::Error::ColumnDecode {
                index: "method".to_string(),
                source: format!("unknown consent method {method_raw:?}").into(),
            })?;

        Ok(Self {
            uuid: ConsentUuid::from_uuid(row.try_get("uuid")?),
            quote_uuid: QuoteUuid::from_uuid(row.try_get("quote_uuid")?),
            token_uuid: row
                .try_get::<Option<uuid::Uuid>, _>("token_uuid")?
                .map(ConsentTokenUuid::from_uuid),
            decision,
            method,
            requester_ip: row.try_get("requester_ip")?,
            evidence_ref: row.try_get("evidence_ref")?,
            decided_at: row.try_get::<SqlxTimestamp, _>("decided_at")?.to_jiff(),
        })
    }
}
