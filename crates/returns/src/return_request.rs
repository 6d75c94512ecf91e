use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mostrador_core::{
    DomainError, DomainResult, Money, OperatorId, ProductId, ReturnRequestId, SaleId,
    line_subtotal,
};
use mostrador_sales::Sale;

/// Reason codes for a return (closed set).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnReason {
    Defective,
    SaleError,
    CustomerRequest,
    Warranty,
    Other,
}

/// Linear state machine: pending, then approved or rejected, then
/// processed. Rejected and processed are terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnStatus {
    Pending,
    Approved,
    Rejected,
    Processed,
}

/// Requested return line as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnItem {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Optional item-specific reason.
    pub reason: Option<String>,
}

/// Validated return line with snapshots taken at request time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnLine {
    pub product_id: ProductId,
    pub description: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
    pub reason: Option<String>,
}

/// A return request against a prior sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRequest {
    id: ReturnRequestId,
    code: u64,
    sale_id: SaleId,
    requested_by: OperatorId,
    approved_by: Option<OperatorId>,
    requested_at: DateTime<Utc>,
    decided_at: Option<DateTime<Utc>>,
    processed_at: Option<DateTime<Utc>>,
    reason: ReturnReason,
    reason_detail: String,
    total: Money,
    status: ReturnStatus,
    approval_notes: String,
    lines: Vec<ReturnLine>,
}

impl ReturnRequest {
    /// Build a validated request against `sale`.
    ///
    /// Quantities are checked per product against the sale's active lines
    /// (items for the same product are summed first, so repeated entries
    /// cannot slip past the cap). Unit prices are snapshotted from the sale;
    /// descriptions come from `descriptions`, falling back to the product id
    /// for products that have since disappeared from the catalog.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        id: ReturnRequestId,
        code: u64,
        sale: &Sale,
        requested_by: OperatorId,
        reason: ReturnReason,
        reason_detail: impl Into<String>,
        items: &[ReturnItem],
        descriptions: &HashMap<ProductId, String>,
        requested_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if items.is_empty() {
            return Err(DomainError::validation(
                "return requires at least one line",
            ));
        }

        let mut requested: HashMap<ProductId, i64> = HashMap::new();
        for item in items {
            if item.quantity <= 0 {
                return Err(DomainError::validation(
                    "return quantity must be positive",
                ));
            }
            *requested.entry(item.product_id).or_insert(0) += item.quantity;
        }

        for (&product_id, &quantity) in &requested {
            let sold: i64 = sale
                .active_lines()
                .filter(|l| l.product_id == product_id)
                .map(|l| l.quantity)
                .sum();
            if sold == 0 {
                return Err(DomainError::validation(format!(
                    "product {product_id} is not part of sale #{}",
                    sale.code()
                )));
            }
            if quantity > sold {
                return Err(DomainError::validation(format!(
                    "return quantity {quantity} exceeds sold quantity {sold} for product {product_id}"
                )));
            }
        }

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let unit_price = sale
                .active_lines()
                .find(|l| l.product_id == item.product_id)
                .map(|l| l.unit_price)
                .ok_or(DomainError::NotFound)?;
            let description = descriptions
                .get(&item.product_id)
                .cloned()
                .unwrap_or_else(|| item.product_id.to_string());
            lines.push(ReturnLine {
                product_id: item.product_id,
                description,
                quantity: item.quantity,
                unit_price,
                subtotal: line_subtotal(item.quantity, unit_price),
                reason: item.reason.clone(),
            });
        }

        let total = lines.iter().map(|l| l.subtotal).sum();

        Ok(Self {
            id,
            code,
            sale_id: sale.id(),
            requested_by,
            approved_by: None,
            requested_at,
            decided_at: None,
            processed_at: None,
            reason,
            reason_detail: reason_detail.into(),
            total,
            status: ReturnStatus::Pending,
            approval_notes: String::new(),
            lines,
        })
    }

    pub fn id(&self) -> ReturnRequestId {
        self.id
    }

    pub fn code(&self) -> u64 {
        self.code
    }

    pub fn display_code(&self) -> String {
        format!("DEV-{:06}", self.code)
    }

    pub fn sale_id(&self) -> SaleId {
        self.sale_id
    }

    pub fn requested_by(&self) -> OperatorId {
        self.requested_by
    }

    pub fn approved_by(&self) -> Option<OperatorId> {
        self.approved_by
    }

    pub fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }

    pub fn decided_at(&self) -> Option<DateTime<Utc>> {
        self.decided_at
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    pub fn reason(&self) -> ReturnReason {
        self.reason
    }

    pub fn reason_detail(&self) -> &str {
        &self.reason_detail
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn status(&self) -> ReturnStatus {
        self.status
    }

    pub fn approval_notes(&self) -> &str {
        &self.approval_notes
    }

    pub fn lines(&self) -> &[ReturnLine] {
        &self.lines
    }

    /// True while the request blocks further returns against its sale.
    pub fn is_open(&self) -> bool {
        matches!(self.status, ReturnStatus::Pending | ReturnStatus::Approved)
    }

    /// One-way approval gate; the approver identity and notes are recorded.
    pub fn approve(
        &mut self,
        approver: OperatorId,
        notes: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if self.status != ReturnStatus::Pending {
            return Err(DomainError::invalid_state(
                "only pending returns can be approved",
            ));
        }
        self.status = ReturnStatus::Approved;
        self.approved_by = Some(approver);
        self.approval_notes = notes.into();
        self.decided_at = Some(now);
        Ok(())
    }

    pub fn reject(
        &mut self,
        approver: OperatorId,
        notes: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if self.status != ReturnStatus::Pending {
            return Err(DomainError::invalid_state(
                "only pending returns can be rejected",
            ));
        }
        self.status = ReturnStatus::Rejected;
        self.approved_by = Some(approver);
        self.approval_notes = notes.into();
        self.decided_at = Some(now);
        Ok(())
    }

    pub fn ensure_processable(&self) -> DomainResult<()> {
        if self.status != ReturnStatus::Approved {
            return Err(DomainError::invalid_state(
                "only approved returns can be processed",
            ));
        }
        Ok(())
    }

    /// Flip to processed. Called by the engine after stock restoration and
    /// credit-note issuance have been committed.
    pub fn mark_processed(&mut self, now: DateTime<Utc>) {
        self.status = ReturnStatus::Processed;
        self.processed_at = Some(now);
    }

    /// Product/quantity pairs to restore on processing.
    pub fn restock_lines(&self) -> Vec<(ProductId, i64)> {
        self.lines
            .iter()
            .map(|l| (l.product_id, l.quantity))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mostrador_core::{PaymentMethod, PaymentTender};
    use mostrador_sales::{SaleItem, SaleStatus};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    fn sale_with(product_id: ProductId, quantity: i64, price: Money) -> Sale {
        Sale::create(
            mostrador_core::SaleId::new(),
            1001,
            None,
            OperatorId::new(),
            &[SaleItem {
                product_id,
                quantity,
                unit_price: price,
            }],
            None,
            PaymentTender::new(PaymentMethod::Cash),
            None,
            SaleStatus::Paid,
            now(),
        )
        .unwrap()
    }

    fn request_for(sale: &Sale, product_id: ProductId, quantity: i64) -> DomainResult<ReturnRequest> {
        let mut descriptions = HashMap::new();
        descriptions.insert(product_id, "fuel pump".to_string());
        ReturnRequest::create(
            ReturnRequestId::new(),
            1,
            sale,
            OperatorId::new(),
            ReturnReason::Defective,
            "does not prime",
            &[ReturnItem {
                product_id,
                quantity,
                reason: None,
            }],
            &descriptions,
            now(),
        )
    }

    #[test]
    fn total_is_the_sum_of_snapshotted_lines() {
        let product_id = ProductId::new();
        let sale = sale_with(product_id, 3, Money::from_major(40));
        let request = request_for(&sale, product_id, 2).unwrap();

        assert_eq!(request.total(), Money::from_major(80));
        assert_eq!(request.lines()[0].description, "fuel pump");
        assert_eq!(request.lines()[0].unit_price, Money::from_major(40));
        assert_eq!(request.status(), ReturnStatus::Pending);
        assert_eq!(request.display_code(), "DEV-000001");
    }

    #[test]
    fn quantity_above_sold_is_rejected() {
        let product_id = ProductId::new();
        let sale = sale_with(product_id, 2, Money::from_major(40));
        let err = request_for(&sale, product_id, 3).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn repeated_items_cannot_exceed_the_cap_in_aggregate() {
        let product_id = ProductId::new();
        let sale = sale_with(product_id, 3, Money::from_major(10));
        let items = vec![
            ReturnItem {
                product_id,
                quantity: 2,
                reason: None,
            },
            ReturnItem {
                product_id,
                quantity: 2,
                reason: None,
            },
        ];
        let err = ReturnRequest::create(
            ReturnRequestId::new(),
            2,
            &sale,
            OperatorId::new(),
            ReturnReason::Other,
            "split boxes",
            &items,
            &HashMap::new(),
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn foreign_product_is_rejected() {
        let sale = sale_with(ProductId::new(), 2, Money::from_major(40));
        let err = request_for(&sale, ProductId::new(), 1).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn approval_is_a_one_way_gate() {
        let product_id = ProductId::new();
        let sale = sale_with(product_id, 2, Money::from_major(40));
        let mut request = request_for(&sale, product_id, 1).unwrap();
        let approver = OperatorId::new();

        request.approve(approver, "ok to take back", now()).unwrap();
        assert_eq!(request.status(), ReturnStatus::Approved);
        assert_eq!(request.approved_by(), Some(approver));
        assert!(request.decided_at().is_some());

        assert!(request.approve(approver, "again", now()).is_err());
        assert!(request.reject(approver, "too late", now()).is_err());
    }

    #[test]
    fn processing_requires_approval_first() {
        let product_id = ProductId::new();
        let sale = sale_with(product_id, 2, Money::from_major(40));
        let mut request = request_for(&sale, product_id, 1).unwrap();

        assert!(request.ensure_processable().is_err());
        request.approve(OperatorId::new(), "", now()).unwrap();
        request.ensure_processable().unwrap();

        request.mark_processed(now());
        assert_eq!(request.status(), ReturnStatus::Processed);
        assert!(!request.is_open());
        assert!(request.ensure_processable().is_err());
    }

    #[test]
    fn rejected_requests_are_terminal_and_not_open() {
        let product_id = ProductId::new();
        let sale = sale_with(product_id, 2, Money::from_major(40));
        let mut request = request_for(&sale, product_id, 1).unwrap();

        request.reject(OperatorId::new(), "damage by customer", now()).unwrap();
        assert_eq!(request.status(), ReturnStatus::Rejected);
        assert!(!request.is_open());
        assert!(request.ensure_processable().is_err());
    }

    #[test]
    fn missing_description_falls_back_to_the_product_id() {
        let product_id = ProductId::new();
        let sale = sale_with(product_id, 1, Money::from_major(5));
        let request = ReturnRequest::create(
            ReturnRequestId::new(),
            3,
            &sale,
            OperatorId::new(),
            ReturnReason::Warranty,
            "",
            &[ReturnItem {
                product_id,
                quantity: 1,
                reason: Some("seized".to_string()),
            }],
            &HashMap::new(),
            now(),
        )
        .unwrap();

        assert_eq!(request.lines()[0].description, product_id.to_string());
        assert_eq!(request.lines()[0].reason.as_deref(), Some("seized"));
    }
}
