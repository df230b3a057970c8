//! Document Number Sequences

pub mod records;
mod repository;

pub(crate) use repository::PgSequencesRepository;

pub use records::DocumentNumber;
