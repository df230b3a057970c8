//! Receipts service errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReceiptsServiceError {
    #[error("receipt not found")]
    NotFound,

    #[error("quote not found")]
    QuoteNotFound,

    /// Receipts exist only for accepted quotes.
    #[error("quote has not been accepted")]
    QuoteNotAccepted,

    #[error("consent record not found for quote")]
    ConsentNotFound,

    /// Operator-facing: issuance needs at least one signing secret.
    #[error("no signing secret configured for tenant")]
    SecretMissing,

    #[error("receipt already exists")]
    AlreadyExists,

    #[error("related resource not found")]
    InvalidReference,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for ReceiptsServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyExists,
            Some(ErrorKind::ForeignKeyViolation) => Self::InvalidReference,
            _ => Self::Sql(error),
        }
    }
}
