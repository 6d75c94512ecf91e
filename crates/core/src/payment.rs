//! Payment methods and tender validation.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::money::Money;

/// Accepted payment methods.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Debit,
    Credit,
    Transfer,
    Mixed,
}

/// Cash/card breakdown of a mixed payment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixedSplit {
    pub cash: Money,
    pub card: Money,
}

/// Payment designation for a transaction: a method plus, for mixed
/// payments, the cash/card split.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTender {
    pub method: PaymentMethod,
    pub split: Option<MixedSplit>,
}

impl PaymentTender {
    pub fn new(method: PaymentMethod) -> Self {
        Self {
            method,
            split: None,
        }
    }

    pub fn mixed(cash: Money, card: Money) -> Self {
        Self {
            method: PaymentMethod::Mixed,
            split: Some(MixedSplit { cash, card }),
        }
    }

    /// Validate the tender against the amount due.
    pub fn ensure_covers(&self, total: Money) -> DomainResult<()> {
        match (self.method, self.split) {
            (PaymentMethod::Mixed, None) => Err(DomainError::validation(
                "mixed payment requires a cash/card split",
            )),
            (PaymentMethod::Mixed, Some(split)) => {
                if split.cash.is_negative() || split.card.is_negative() {
                    return Err(DomainError::validation(
                        "mixed payment amounts cannot be negative",
                    ));
                }
                if split.cash + split.card != total {
                    return Err(DomainError::validation(format!(
                        "mixed payment amounts must sum to {total}"
                    )));
                }
                Ok(())
            }
            (_, Some(_)) => Err(DomainError::validation(
                "only mixed payments carry a cash/card split",
            )),
            (_, None) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_split_summing_to_total_is_accepted() {
        let tender = PaymentTender::mixed(Money::from_major(200), Money::from_major(300));
        assert!(tender.ensure_covers(Money::from_major(500)).is_ok());
    }

    #[test]
    fn mixed_split_not_summing_to_total_is_rejected() {
        let tender = PaymentTender::mixed(Money::from_major(200), Money::from_major(250));
        let err = tender.ensure_covers(Money::from_major(500)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn mixed_without_split_is_rejected() {
        let tender = PaymentTender::new(PaymentMethod::Mixed);
        assert!(tender.ensure_covers(Money::from_major(100)).is_err());
    }

    #[test]
    fn split_on_a_plain_method_is_rejected() {
        let tender = PaymentTender {
            method: PaymentMethod::Cash,
            split: Some(MixedSplit {
                cash: Money::from_major(50),
                card: Money::from_major(50),
            }),
        };
        assert!(tender.ensure_covers(Money::from_major(100)).is_err());
    }

    #[test]
    fn plain_methods_need_no_split() {
        for method in [
            PaymentMethod::Cash,
            PaymentMethod::Debit,
            PaymentMethod::Credit,
            PaymentMethod::Transfer,
        ] {
            assert!(PaymentTender::new(method).ensure_covers(Money::from_major(10)).is_ok());
        }
    }
}
