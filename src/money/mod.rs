//! Cent-exact money helpers shared by the planner and the reconciler.
//!
//! Every amount that crosses the planner or the reconciler is a [`Money`]
//! value normalised to two decimal places.

mod locale;

pub use locale::{format_currency, format_date, parse_currency, LocaleConfig};

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{LedgerError, Result};

pub type Money = Decimal;

/// Largest difference still treated as "the same amount" (one cent).
pub const TOLERANCE: Money = Decimal::from_parts(1, 0, 0, false, 2);

/// Round half away from zero to whole cents.
pub fn cents(amount: Money) -> Money {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Truncate toward negative infinity to whole cents.
pub fn floor_cents(amount: Money) -> Money {
    let mut floored = amount.round_dp_with_strategy(2, RoundingStrategy::ToNegativeInfinity);
    floored.rescale(2);
    floored
}

pub fn within_tolerance(a: Money, b: Money) -> bool {
    (a - b).abs() <= TOLERANCE
}

/// Sum to cents, saturating at the edges of the `Decimal` range. Use
/// [`checked_sum`] where an out-of-range total has to be reported.
pub fn sum<I>(amounts: I) -> Money
where
    I: IntoIterator<Item = Money>,
{
    cents(
        amounts
            .into_iter()
            .fold(Decimal::ZERO, |acc, amount| acc.saturating_add(amount)),
    )
}

pub fn checked_sum<I>(amounts: I) -> Result<Money>
where
    I: IntoIterator<Item = Money>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, checked_add)
        .map(cents)
}

pub fn checked_add(a: Money, b: Money) -> Result<Money> {
    a.checked_add(b)
        .ok_or_else(|| LedgerError::InvalidAmount(format!("{a} + {b}")))
}

pub fn checked_sub(a: Money, b: Money) -> Result<Money> {
    a.checked_sub(b)
        .ok_or_else(|| LedgerError::InvalidAmount(format!("{a} - {b}")))
}
