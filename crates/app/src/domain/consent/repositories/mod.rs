//! Consent Repositories

mod consents;
mod tokens;

pub(crate) use consents::PgConsentsRepository;
pub(crate) use tokens::{CandidateToken, PgConsentTokensRepository};
