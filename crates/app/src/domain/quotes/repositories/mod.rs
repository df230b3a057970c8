//! Quote Repositories

mod items;
mod quotes;

pub(crate) use items::PgQuoteItemsRepository;
pub(crate) use quotes::PgQuotesRepository;
