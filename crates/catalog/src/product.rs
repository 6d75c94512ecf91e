use serde::{Deserialize, Serialize};

use mostrador_core::{DomainError, DomainResult, Money, ProductId};

/// Stock level relative to the minimum-stock threshold.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockLevel {
    Low,
    Medium,
    High,
}

/// Catalog product: the unit of stock the register sells.
///
/// Stock is an integer on-hand quantity and never goes negative through a
/// core operation; decrements fail closed via [`Product::stock_after`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// Human-facing numeric code, unique in the catalog.
    pub code: u64,
    pub description: String,
    pub cost_price: Money,
    pub sale_price: Money,
    pub stock: i64,
    /// Threshold at or below which the product is flagged for restocking.
    pub min_stock: i64,
    pub active: bool,
}

impl Product {
    pub fn new(
        id: ProductId,
        code: u64,
        description: impl Into<String>,
        cost_price: Money,
        sale_price: Money,
        stock: i64,
        min_stock: i64,
    ) -> DomainResult<Self> {
        if stock < 0 {
            return Err(DomainError::validation("stock cannot be negative"));
        }
        if min_stock < 0 {
            return Err(DomainError::validation("minimum stock cannot be negative"));
        }
        if cost_price.is_negative() || sale_price.is_negative() {
            return Err(DomainError::validation("prices cannot be negative"));
        }
        Ok(Self {
            id,
            code,
            description: description.into(),
            cost_price,
            sale_price,
            stock,
            min_stock,
            active: true,
        })
    }

    /// Stock after applying a signed movement.
    ///
    /// Fails closed with `InsufficientStock` when a decrement would take the
    /// level below zero; nothing is written on failure.
    pub fn stock_after(&self, delta: i64) -> DomainResult<i64> {
        let next = self.stock + delta;
        if next < 0 {
            return Err(DomainError::insufficient_stock(self.id, -delta, self.stock));
        }
        Ok(next)
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }

    pub fn stock_level(&self) -> StockLevel {
        if self.stock <= self.min_stock {
            StockLevel::Low
        } else if self.stock <= self.min_stock * 2 {
            StockLevel::Medium
        } else {
            StockLevel::High
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64, min_stock: i64) -> Product {
        Product::new(
            ProductId::new(),
            100,
            "brake pad set",
            Money::from_major(60),
            Money::from_major(100),
            stock,
            min_stock,
        )
        .unwrap()
    }

    #[test]
    fn decrement_below_zero_fails_closed() {
        let p = product(2, 0);
        let err = p.stock_after(-5).unwrap_err();
        match err {
            DomainError::InsufficientStock {
                product_id,
                requested,
                available,
            } => {
                assert_eq!(product_id, p.id);
                assert_eq!(requested, 5);
                assert_eq!(available, 2);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        // Nothing was written.
        assert_eq!(p.stock, 2);
    }

    #[test]
    fn increments_and_exact_drain_are_allowed() {
        let p = product(2, 0);
        assert_eq!(p.stock_after(3).unwrap(), 5);
        assert_eq!(p.stock_after(-2).unwrap(), 0);
    }

    #[test]
    fn stock_levels_follow_the_minimum_threshold() {
        let mut p = product(5, 5);
        assert!(p.is_low_stock());
        assert_eq!(p.stock_level(), StockLevel::Low);

        p.stock = 8;
        assert_eq!(p.stock_level(), StockLevel::Medium);

        p.stock = 11;
        assert_eq!(p.stock_level(), StockLevel::High);
        assert!(!p.is_low_stock());
    }

    #[test]
    fn negative_seed_values_are_rejected() {
        assert!(
            Product::new(
                ProductId::new(),
                1,
                "oil filter",
                Money::from_major(5),
                Money::from_major(9),
                -1,
                0,
            )
            .is_err()
        );
    }
}
