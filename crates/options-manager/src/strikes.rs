//! Strike selection for new short positions.

use rust_decimal::Decimal;
use zdte_core::OptionRight;

/// PUT: `floor(price)`; CALL: `floor(price) + 1`.
#[must_use]
pub fn select_strike(right: OptionRight, underlying_price: Decimal) -> Decimal {
    let base = underlying_price.floor();
    match right {
        OptionRight::Put => base,
        OptionRight::Call => base + Decimal::ONE,
    }
}
