//! Quotes service errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuotesServiceError {
    #[error("quote already exists")]
    AlreadyExists,

    #[error("quote not found")]
    NotFound,

    #[error("customer reference does not resolve")]
    CustomerNotFound,

    #[error("catalog item exists but cannot be quoted")]
    IneligibleCatalogItem,

    #[error("catalog item not found")]
    CatalogItemNotFound,

    #[error("quantity must be positive")]
    InvalidQuantity,

    #[error("no valid items in quote")]
    NoValidItems,

    #[error("quote state does not allow this change")]
    InvalidStatusTransition,

    #[error("related resource not found")]
    InvalidReference,

    #[error("missing required data")]
    MissingRequiredData,

    #[error("invalid data")]
    InvalidData,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for QuotesServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyExists,
            Some(ErrorKind::ForeignKeyViolation) => Self::InvalidReference,
            Some(ErrorKind::NotNullViolation) => Self::MissingRequiredData,
            Some(ErrorKind::CheckViolation) => Self::InvalidData,
            _ => Self::Sql(error),
        }
    }
}
