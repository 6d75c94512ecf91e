use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mostrador_catalog::Product;
use mostrador_core::{
    CustomerId, Discount, DomainError, DomainResult, Money, OperatorId, PaymentTender, ProductId,
    SaleId, TicketId, line_subtotal,
};

/// Ticket status lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Pending,
    Finalized,
    Cancelled,
}

/// Ticket line with a description snapshot and a soft-delete flag.
///
/// The product reference may go stale after the snapshot is taken; the
/// description and unit price captured here are what the ticket sells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketLine {
    pub product_id: ProductId,
    pub description: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
    pub active: bool,
}

/// A held/draft cart, not yet a financial record.
///
/// Mutable through the methods below until finalized or cancelled. The
/// stock check at line-add time is a soft check only; finalization
/// re-validates every line against current stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    id: TicketId,
    code: u64,
    operator_id: OperatorId,
    customer_id: Option<CustomerId>,
    status: TicketStatus,
    lines: Vec<TicketLine>,
    discount: Option<Discount>,
    subtotal: Money,
    discount_amount: Money,
    total: Money,
    tender: Option<PaymentTender>,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    finalized_at: Option<DateTime<Utc>>,
    sale_id: Option<SaleId>,
}

impl Ticket {
    pub fn new(
        id: TicketId,
        code: u64,
        operator_id: OperatorId,
        customer_id: Option<CustomerId>,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            code,
            operator_id,
            customer_id,
            status: TicketStatus::Pending,
            lines: Vec::new(),
            discount: None,
            subtotal: Money::ZERO,
            discount_amount: Money::ZERO,
            total: Money::ZERO,
            tender: None,
            note,
            created_at: now,
            updated_at: now,
            finalized_at: None,
            sale_id: None,
        }
    }

    pub fn id(&self) -> TicketId {
        self.id
    }

    pub fn code(&self) -> u64 {
        self.code
    }

    pub fn display_code(&self) -> String {
        format!("TKT-{:06}", self.code)
    }

    pub fn operator_id(&self) -> OperatorId {
        self.operator_id
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    pub fn status(&self) -> TicketStatus {
        self.status
    }

    pub fn lines(&self) -> &[TicketLine] {
        &self.lines
    }

    pub fn active_lines(&self) -> impl Iterator<Item = &TicketLine> {
        self.lines.iter().filter(|l| l.active)
    }

    pub fn discount(&self) -> Option<Discount> {
        self.discount
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub fn discount_amount(&self) -> Money {
        self.discount_amount
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn tender(&self) -> Option<&PaymentTender> {
        self.tender.as_ref()
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn finalized_at(&self) -> Option<DateTime<Utc>> {
        self.finalized_at
    }

    pub fn sale_id(&self) -> Option<SaleId> {
        self.sale_id
    }

    fn ensure_pending(&self) -> DomainResult<()> {
        if self.status != TicketStatus::Pending {
            return Err(DomainError::invalid_state("ticket is not pending"));
        }
        Ok(())
    }

    /// Add a line for `quantity` units of `product`.
    ///
    /// The stock check here is a soft check against the stock seen at add
    /// time; stock can change before finalization, which re-validates.
    pub fn add_line(
        &mut self,
        product: &Product,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.ensure_pending()?;
        if quantity <= 0 {
            return Err(DomainError::validation("line quantity must be positive"));
        }
        if !product.active {
            return Err(DomainError::validation("product is inactive"));
        }
        if product.stock < quantity {
            return Err(DomainError::insufficient_stock(
                product.id,
                quantity,
                product.stock,
            ));
        }

        self.lines.push(TicketLine {
            product_id: product.id,
            description: product.description.clone(),
            quantity,
            unit_price: product.sale_price,
            subtotal: line_subtotal(quantity, product.sale_price),
            active: true,
        });
        self.recompute()?;
        self.updated_at = now;
        Ok(())
    }

    /// Soft-delete the first active line for `product_id`.
    pub fn remove_line(&mut self, product_id: ProductId, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_pending()?;
        let idx = self
            .lines
            .iter()
            .position(|l| l.active && l.product_id == product_id)
            .ok_or(DomainError::NotFound)?;

        self.lines[idx].active = false;
        // Reinstate the line if the smaller subtotal invalidates the discount.
        if let Err(err) = self.recompute() {
            self.lines[idx].active = true;
            return Err(err);
        }
        self.updated_at = now;
        Ok(())
    }

    /// Set or clear the discount. The enum carries exactly one kind, so
    /// setting a percentage replaces any fixed amount and vice versa.
    pub fn set_discount(
        &mut self,
        discount: Option<Discount>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.ensure_pending()?;
        if let Some(d) = discount {
            d.amount_on(self.subtotal)?;
        }
        self.discount = discount;
        self.recompute()?;
        self.updated_at = now;
        Ok(())
    }

    pub fn set_customer(
        &mut self,
        customer_id: Option<CustomerId>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.ensure_pending()?;
        self.customer_id = customer_id;
        self.updated_at = now;
        Ok(())
    }

    fn recompute(&mut self) -> DomainResult<()> {
        self.subtotal = self.active_lines().map(|l| l.subtotal).sum();
        self.discount_amount = match self.discount {
            Some(d) => d.amount_on(self.subtotal)?,
            None => Money::ZERO,
        };
        self.total = self.subtotal - self.discount_amount;
        Ok(())
    }

    /// Cancel the ticket. No stock effect: nothing was ever reserved.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status == TicketStatus::Finalized {
            return Err(DomainError::invalid_state(
                "cannot cancel a finalized ticket",
            ));
        }
        self.status = TicketStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }

    /// Pre-flight for finalization: pending status, a non-empty active line
    /// set, and a tender that covers the total.
    pub fn ensure_finalizable(&self, tender: &PaymentTender) -> DomainResult<()> {
        if self.status != TicketStatus::Pending {
            return Err(DomainError::invalid_state(
                "only pending tickets can be finalized",
            ));
        }
        if self.active_lines().next().is_none() {
            return Err(DomainError::validation("ticket has no active lines"));
        }
        tender.ensure_covers(self.total)
    }

    /// Flip to finalized and link the sale. Called by the engine after the
    /// sale has been committed and stock decremented.
    pub fn mark_finalized(&mut self, sale_id: SaleId, tender: PaymentTender, now: DateTime<Utc>) {
        self.status = TicketStatus::Finalized;
        self.tender = Some(tender);
        self.sale_id = Some(sale_id);
        self.finalized_at = Some(now);
        self.updated_at = now;
    }
}
