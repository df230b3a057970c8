//! Consent Tokens & Records

pub mod data;
pub mod errors;
pub mod records;
mod repositories;
pub mod service;
pub mod token;

pub(crate) use repositories::{PgConsentTokensRepository, PgConsentsRepository};

pub use errors::ConsentServiceError;
pub use service::*;
