//! Monetary amounts and discount arithmetic.
//!
//! Amounts are integer minor units (cents). Keeping the arithmetic in
//! integers makes conservation checks (stock against sale lines, credit-note
//! balances against their redemption ledger) exact.

use core::iter::Sum;
use core::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Monetary amount in minor currency units (e.g. cents).
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Whole currency units: `Money::from_major(270)` is 270.00.
    pub fn from_major(units: i64) -> Self {
        Self(units.saturating_mul(100))
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Percentage of this amount, expressed in basis points (10.00% = 1000).
    ///
    /// Rounds half-up on the half-cent.
    pub fn percentage(self, basis_points: u32) -> Money {
        let scaled = self.0 as i128 * basis_points as i128;
        Money(((scaled + 5_000) / 10_000) as i64)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

/// Line subtotal: quantity × unit price.
///
/// Every write path recomputes line amounts through this one function
/// instead of repeating the arithmetic at each call site.
pub fn line_subtotal(quantity: i64, unit_price: Money) -> Money {
    Money::from_cents(quantity.saturating_mul(unit_price.cents()))
}

/// Discount applied to a subtotal.
///
/// Modeled as an enum so a ticket or sale carries exactly one discount kind:
/// percentage-of-subtotal and fixed amount can never be set simultaneously.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Discount {
    /// Percentage of the subtotal, in basis points (10.00% = 1000).
    Percentage(u32),
    /// Fixed amount taken off the subtotal.
    Fixed(Money),
}

impl Discount {
    /// Discount amount for the given subtotal.
    pub fn amount_on(self, subtotal: Money) -> DomainResult<Money> {
        match self {
            Discount::Percentage(bps) => {
                if bps > 10_000 {
                    return Err(DomainError::validation(
                        "discount percentage cannot exceed 100%",
                    ));
                }
                Ok(subtotal.percentage(bps))
            }
            Discount::Fixed(amount) => {
                if amount.is_negative() {
                    return Err(DomainError::validation("fixed discount cannot be negative"));
                }
                if amount > subtotal {
                    return Err(DomainError::validation(
                        "fixed discount cannot exceed the subtotal",
                    ));
                }
                Ok(amount)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn display_renders_minor_units() {
        assert_eq!(Money::from_cents(27_000).to_string(), "270.00");
        assert_eq!(Money::from_cents(105).to_string(), "1.05");
        assert_eq!(Money::from_cents(-9).to_string(), "-0.09");
    }

    #[test]
    fn ten_percent_of_three_hundred_is_thirty() {
        let subtotal = Money::from_major(300);
        let amount = Discount::Percentage(1_000).amount_on(subtotal).unwrap();
        assert_eq!(amount, Money::from_major(30));
    }

    #[test]
    fn percentage_rounds_half_up() {
        // 10.01 at 5% = 0.5005 -> 0.50; 10.10 at 5% = 0.505 -> 0.51
        assert_eq!(Money::from_cents(1_001).percentage(500), Money::from_cents(50));
        assert_eq!(Money::from_cents(1_010).percentage(500), Money::from_cents(51));
    }

    #[test]
    fn fixed_discount_larger_than_subtotal_is_rejected() {
        let err = Discount::Fixed(Money::from_major(500))
            .amount_on(Money::from_major(100))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn percentage_above_one_hundred_is_rejected() {
        let err = Discount::Percentage(10_001)
            .amount_on(Money::from_major(100))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn line_subtotal_multiplies_quantity_and_price() {
        assert_eq!(line_subtotal(3, Money::from_major(100)), Money::from_major(300));
    }

    proptest! {
        #[test]
        fn percentage_discount_stays_within_the_subtotal(
            cents in 0i64..100_000_000,
            bps in 0u32..=10_000,
        ) {
            let subtotal = Money::from_cents(cents);
            let amount = Discount::Percentage(bps).amount_on(subtotal).unwrap();
            prop_assert!(amount >= Money::ZERO);
            prop_assert!(amount <= subtotal);
        }

        #[test]
        fn money_sum_matches_cents_sum(amounts in proptest::collection::vec(0i64..1_000_000, 0..16)) {
            let total: Money = amounts.iter().map(|&c| Money::from_cents(c)).sum();
            prop_assert_eq!(total.cents(), amounts.iter().sum::<i64>());
        }
    }
}
