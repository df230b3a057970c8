//! Consent service errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsentServiceError {
    /// Unknown, malformed, or mismatching token; deliberately
    /// indistinguishable to the caller.
    #[error("consent token not found")]
    NotFound,

    /// The token's expiry has passed; the holder should request a fresh link.
    #[error("consent token expired")]
    TokenExpired,

    /// The token reached a terminal state before this request.
    #[error("consent token is no longer active")]
    TokenNotActive,

    #[error("quote not found")]
    QuoteNotFound,

    /// The quote is not in a state that allows issuing consent links.
    #[error("quote state does not allow consent")]
    QuoteNotPending,

    #[error("token already exists")]
    AlreadyExists,

    #[error("related resource not found")]
    InvalidReference,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for ConsentServiceError {
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
