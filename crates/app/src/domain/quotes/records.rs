//! Quote Records

use jiff::Timestamp;

use crate::{
    domain::{catalog::records::CatalogItemUuid, customers::records::CustomerUuid},
    uuids::TypedUuid,
};

/// Fixed-point scale of item quantities: four fractional digits, so a stored
/// quantity of `15_000` means 1.5 units.
pub const QUANTITY_SCALE: i64 = 10_000;

/// Quote UUID
pub type QuoteUuid = TypedUuid<QuoteRecord>;

/// Quote lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStatus {
    Draft,
    Sent,
    Accepted,
    Rejected,
    Expired,
    Cancelled,
}

impl QuoteStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "sent" => Some(Self::Sent),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            "expired" => Some(Self::Expired),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether this state may move to `next`.
    ///
    /// Draft and Sent are the only live states; Accepted, Rejected, Expired
    /// and Cancelled are terminal.
    #[must_use]
    pub const fn can_transition(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Sent)
                | (
                    Self::Draft | Self::Sent,
                    Self::Accepted | Self::Rejected | Self::Expired | Self::Cancelled
                )
        )
    }

    /// Whether line items may still be changed.
    #[must_use]
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Draft | Self::Sent)
    }
}

/// Quote Record
#[derive(Debug, Clone)]
pub struct QuoteRecord {
    pub uuid: QuoteUuid,

    /// Sequence-generated document number, unique per tenant.
    pub quote_number: String,

    pub customer_uuid: CustomerUuid,
    pub status: QuoteStatus,

    /// Sum of the current items' line subtotals, in minor currency units.
    pub subtotal: u64,

    /// Sum of the current items' line taxes.
    pub tax_total: u64,

    /// Always `subtotal + tax_total`.
    pub total: u64,

    pub items: Vec<QuoteItemRecord>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

/// Quote Item UUID
pub type QuoteItemUuid = TypedUuid<QuoteItemRecord>;

/// One quoted line, frozen at creation time.
///
/// Every pricing field is a snapshot of the catalog entry as it was when the
/// line was written; later catalog edits never change historical quotes.
#[derive(Debug, Clone)]
pub struct QuoteItemRecord {
    pub uuid: QuoteItemUuid,
    pub catalog_item_uuid: CatalogItemUuid,
    pub description: String,
    pub unit: String,

    /// Fixed-point quantity with four fractional digits (15_000 = 1.5).
    pub quantity: i64,

    pub unit_price: u64,
    pub tax_rate_bps: i32,
    pub line_subtotal: u64,
    pub line_tax: u64,
    pub line_total: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Aggregate sums over a quote's current items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuoteTotals {
    pub subtotal: u64,
    pub tax_total: u64,
    pub total: u64,
}
