//! Line amount arithmetic.
//!
//! All amounts are integer minor currency units; quantities are fixed-point
//! with four fractional digits and tax rates are basis points. Rounding is
//! half-up to the nearest minor unit. Results saturate at `u64::MAX`, far
//! beyond any representable document total.

use crate::domain::quotes::records::QUANTITY_SCALE;

const BPS_SCALE: i128 = 10_000;

/// `round(quantity × unit_price)` with the quantity's fixed-point scale
/// divided back out.
pub(crate) fn line_subtotal(quantity: i64, unit_price: u64) -> u64 {
    round_half_up(
        i128::from(quantity) * i128::from(unit_price),
        i128::from(QUANTITY_SCALE),
    )
}

/// `round(line_subtotal × tax_rate)` for a rate in basis points.
pub(crate) fn line_tax(line_subtotal: u64, tax_rate_bps: i32) -> u64 {
    round_half_up(
        i128::from(line_subtotal) * i128::from(tax_rate_bps),
        BPS_SCALE,
    )
}

fn round_half_up(numerator: i128, denominator: i128) -> u64 {
    let rounded = (numerator + denominator / 2) / denominator;

    u64::try_from(rounded).unwrap_or(u64::MAX)
}
