//! Monetary types for 6-decimal amounts and quantities.
//!
//! Payments and position quantities cross the core's boundary as integers
//! with 6 decimals (`1_000_000` is one unit). [`Decimal`] is only used for
//! presentation and human-unit configuration.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Payment amount with 6 decimals.
pub type Amount = u128;

/// Position quantity with 6 decimals; one unit pays one unit of payment
/// on a winning settlement.
pub type Quantity = u128;

/// Number of decimals carried by [`Amount`] and [`Quantity`].
pub const AMOUNT_DECIMALS: u32 = 6;

/// Render a 6-decimal integer as a decimal in human units.
#[must_use]
pub fn to_display(amount: Amount) -> Decimal {
    // i128 holds every u128 amount below 2^127
    let mantissa = i128::try_from(amount).unwrap_or(i128::MAX);
    Decimal::try_from_i128_with_scale(mantissa, AMOUNT_DECIMALS)
        .unwrap_or(Decimal::MAX)
        .normalize()
}

/// Parse a human-unit decimal into a 6-decimal integer, truncating extra
/// precision. Returns `None` for negative or oversized values.
#[must_use]
pub fn from_display(value: Decimal) -> Option<Amount> {
    if value.is_sign_negative() && !value.is_zero() {
        return None;
    }
    let scaled = value.checked_mul(Decimal::from(10u64.pow(AMOUNT_DECIMALS)))?;
    scaled.trunc().to_u128()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn display_conversion_uses_six_decimals() {
        assert_eq!(to_display(1_500_000), dec!(1.5));
        assert_eq!(to_display(1), dec!(0.000001));
    }

    #[test]
    fn parsing_truncates_extra_precision() {
        assert_eq!(from_display(dec!(2.5)), Some(2_500_000));
        assert_eq!(from_display(dec!(0.0000019)), Some(1));
        assert_eq!(from_display(dec!(-1)), None);
    }
}
