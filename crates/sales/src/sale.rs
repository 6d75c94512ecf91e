use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use mostrador_core::{
    CustomerId, Discount, DomainError, DomainResult, Money, OperatorId, PaymentTender, ProductId,
    SaleId, line_subtotal,
};

/// Sale status lifecycle. Discriminants match the stored wire values.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Voided = 0,
    Pending = 1,
    Paid = 2,
}

/// Input line for building a sale: the subtotal is always recomputed from
/// quantity and unit price, never taken from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
}

/// Committed sale line with a logical-delete flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
    pub active: bool,
}

/// The immutable financial record of a completed transaction.
///
/// The total is fixed at creation; there are no in-place edits, only a full
/// void that restores stock and flips the status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    id: SaleId,
    /// Sequential human-readable code, unique across sales.
    code: u64,
    customer_id: Option<CustomerId>,
    operator_id: OperatorId,
    created_at: DateTime<Utc>,
    subtotal: Money,
    discount: Option<Discount>,
    discount_amount: Money,
    total: Money,
    tender: PaymentTender,
    status: SaleStatus,
    lines: Vec<SaleLine>,
    note: Option<String>,
}

impl Sale {
    /// Build a validated sale record.
    ///
    /// All checks happen here, before any caller-side mutation: line set and
    /// quantities, discount arithmetic, and the tender against the computed
    /// total (mixed splits must sum exactly).
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        id: SaleId,
        code: u64,
        customer_id: Option<CustomerId>,
        operator_id: OperatorId,
        items: &[SaleItem],
        discount: Option<Discount>,
        tender: PaymentTender,
        note: Option<String>,
        status: SaleStatus,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if items.is_empty() {
            return Err(DomainError::validation("sale requires at least one line"));
        }

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            if item.quantity <= 0 {
                return Err(DomainError::validation("line quantity must be positive"));
            }
            if item.unit_price.is_negative() {
                return Err(DomainError::validation("unit price cannot be negative"));
            }
            lines.push(SaleLine {
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
                subtotal: line_subtotal(item.quantity, item.unit_price),
                active: true,
            });
        }

        let subtotal: Money = lines.iter().map(|l| l.subtotal).sum();
        let discount_amount = match discount {
            Some(d) => d.amount_on(subtotal)?,
            None => Money::ZERO,
        };
        let total = subtotal - discount_amount;
        tender.ensure_covers(total)?;

        Ok(Self {
            id,
            code,
            customer_id,
            operator_id,
            created_at,
            subtotal,
            discount,
            discount_amount,
            total,
            tender,
            status,
            lines,
            note,
        })
    }

    pub fn id(&self) -> SaleId {
        self.id
    }

    pub fn code(&self) -> u64 {
        self.code
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    pub fn operator_id(&self) -> OperatorId {
        self.operator_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub fn discount(&self) -> Option<Discount> {
        self.discount
    }

    pub fn discount_amount(&self) -> Money {
        self.discount_amount
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn tender(&self) -> &PaymentTender {
        &self.tender
    }

    pub fn status(&self) -> SaleStatus {
        self.status
    }

    pub fn lines(&self) -> &[SaleLine] {
        &self.lines
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn active_lines(&self) -> impl Iterator<Item = &SaleLine> {
        self.lines.iter().filter(|l| l.active)
    }

    /// Product/quantity pairs to restore when the sale is voided.
    pub fn restock_lines(&self) -> Vec<(ProductId, i64)> {
        self.active_lines()
            .map(|l| (l.product_id, l.quantity))
            .collect()
    }

    pub fn ensure_voidable(&self) -> DomainResult<()> {
        if self.status == SaleStatus::Voided {
            return Err(DomainError::invalid_state("sale is already voided"));
        }
        Ok(())
    }

    /// Flip to voided. Irreversible; callers restore stock first.
    pub fn mark_voided(&mut self) {
        self.status = SaleStatus::Voided;
    }

    /// Return-eligibility check.
    ///
    /// A sale accepts a return only when it is not voided, has no open
    /// (pending or approved) return against it, and is still inside the
    /// return window measured from its creation instant.
    pub fn ensure_returnable(
        &self,
        now: DateTime<Utc>,
        has_open_return: bool,
        window_days: i64,
    ) -> DomainResult<()> {
        if self.status == SaleStatus::Voided {
            return Err(DomainError::invalid_state("sale is voided"));
        }
        if has_open_return {
            return Err(DomainError::invalid_state(
                "sale already has an open return",
            ));
        }
        if now.signed_duration_since(self.created_at) > Duration::days(window_days) {
            return Err(DomainError::invalid_state(format!(
                "return window of {window_days} days has closed"
            )));
        }
        Ok(())
    }

    pub fn is_returnable(&self, now: DateTime<Utc>, has_open_return: bool, window_days: i64) -> bool {
        self.ensure_returnable(now, has_open_return, window_days)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mostrador_core::PaymentMethod;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, h, 0, 0).unwrap()
    }

    fn one_item(price: Money) -> Vec<SaleItem> {
        vec![SaleItem {
            product_id: ProductId::new(),
            quantity: 3,
            unit_price: price,
        }]
    }

    fn paid_sale(items: &[SaleItem], discount: Option<Discount>, tender: PaymentTender) -> DomainResult<Sale> {
        Sale::create(
            SaleId::new(),
            1000,
            None,
            OperatorId::new(),
            items,
            discount,
            tender,
            None,
            SaleStatus::Paid,
            at(12),
        )
    }

    #[test]
    fn totals_are_recomputed_from_lines_and_discount() {
        let sale = paid_sale(
            &one_item(Money::from_major(100)),
            Some(Discount::Percentage(1_000)),
            PaymentTender::new(PaymentMethod::Cash),
        )
        .unwrap();

        assert_eq!(sale.subtotal(), Money::from_major(300));
        assert_eq!(sale.discount_amount(), Money::from_major(30));
        assert_eq!(sale.total(), Money::from_major(270));
        assert_eq!(sale.lines()[0].subtotal, Money::from_major(300));
    }

    #[test]
    fn mixed_split_must_sum_to_the_total() {
        let items = one_item(Money::from_cents(16_667)); // subtotal 500.01
        let err = paid_sale(
            &items,
            Some(Discount::Fixed(Money::from_cents(1))),
            PaymentTender::mixed(Money::from_major(200), Money::from_major(250)),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let sale = paid_sale(
            &items,
            Some(Discount::Fixed(Money::from_cents(1))),
            PaymentTender::mixed(Money::from_major(200), Money::from_major(300)),
        )
        .unwrap();
        assert_eq!(sale.total(), Money::from_major(500));
    }

    #[test]
    fn empty_or_nonpositive_lines_are_rejected() {
        assert!(paid_sale(&[], None, PaymentTender::new(PaymentMethod::Cash)).is_err());

        let items = vec![SaleItem {
            product_id: ProductId::new(),
            quantity: 0,
            unit_price: Money::from_major(10),
        }];
        assert!(paid_sale(&items, None, PaymentTender::new(PaymentMethod::Cash)).is_err());
    }

    #[test]
    fn voiding_twice_fails_with_invalid_state() {
        let mut sale = paid_sale(
            &one_item(Money::from_major(10)),
            None,
            PaymentTender::new(PaymentMethod::Debit),
        )
        .unwrap();

        sale.ensure_voidable().unwrap();
        sale.mark_voided();
        let err = sale.ensure_voidable().unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn return_window_boundary_is_strict() {
        let sale = paid_sale(
            &one_item(Money::from_major(10)),
            None,
            PaymentTender::new(PaymentMethod::Cash),
        )
        .unwrap();
        let created = sale.created_at();

        // 29 days in: eligible.
        assert!(sale.is_returnable(created + Duration::days(29), false, 30));
        // Exactly 30 days: still inside the window.
        assert!(sale.is_returnable(created + Duration::days(30), false, 30));
        // 30 days and one second: closed.
        let late = created + Duration::days(30) + Duration::seconds(1);
        assert!(!sale.is_returnable(late, false, 30));
    }

    #[test]
    fn voided_or_disputed_sales_are_not_returnable() {
        let mut sale = paid_sale(
            &one_item(Money::from_major(10)),
            None,
            PaymentTender::new(PaymentMethod::Cash),
        )
        .unwrap();
        let now = sale.created_at();

        assert!(!sale.is_returnable(now, true, 30));

        sale.mark_voided();
        assert!(!sale.is_returnable(now, false, 30));
    }

    #[test]
    fn restock_lines_skip_inactive_entries() {
        let mut sale = paid_sale(
            &[
                SaleItem {
                    product_id: ProductId::new(),
                    quantity: 2,
                    unit_price: Money::from_major(5),
                },
                SaleItem {
                    product_id: ProductId::new(),
                    quantity: 1,
                    unit_price: Money::from_major(7),
                },
            ],
            None,
            PaymentTender::new(PaymentMethod::Cash),
        )
        .unwrap();

        sale.lines[1].active = false;
        assert_eq!(sale.restock_lines().len(), 1);
        assert_eq!(sale.restock_lines()[0].1, 2);
    }
}
