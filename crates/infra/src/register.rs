//! The cash-register transaction engine.
//!
//! `Register` is the single entry point for state-changing operations:
//! ticket lifecycle, checkout, voiding, the return workflow, credit-note
//! redemption, shift reconciliation, and manual stock adjustments.
//!
//! Every operation validates completely before mutating anything
//! (validate-then-commit, never commit-then-rollback), takes the exclusive
//! product-row lock for read-check-write stock sequences, and records an
//! audit entry on the way out. Audit writes are best-effort: a failed write
//! is logged and never aborts the committed operation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;

use mostrador_audit::{AuditAction, AuditEntry, AuditSink, ClientMeta};
use mostrador_auth::{CapabilityGate, capability};
use mostrador_core::{
    Clock, CreditNoteId, CustomerId, Discount, DomainError, DomainResult, Money, OperatorId,
    PaymentTender, ProductId, ReturnRequestId, SaleId, ShiftId, TicketId,
};
use mostrador_returns::{CreditNote, ReturnItem, ReturnReason, ReturnRequest};
use mostrador_sales::{Sale, SaleItem, SaleStatus};
use mostrador_shifts::{CashShift, ShiftBand, ShiftTotals, aggregate_sales, band_at};
use mostrador_tickets::Ticket;

use crate::config::RegisterConfig;
use crate::customers::CustomerDirectory;
use crate::sequence::SequenceAllocator;
use crate::store::{ReturnStore, SaleStore, ShiftStore, StockRepository, TicketStore};

/// Per-call context: the acting operator plus client metadata for the
/// audit trail.
#[derive(Debug, Clone)]
pub struct OpContext {
    pub operator: OperatorId,
    pub client: ClientMeta,
}

impl OpContext {
    pub fn for_operator(operator: OperatorId) -> Self {
        Self {
            operator,
            client: ClientMeta::default(),
        }
    }
}

/// One line of a direct checkout; the unit price is read from the catalog
/// at commit time.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Caller-supplied fields for a new cash-shift record.
#[derive(Debug, Clone)]
pub struct ShiftDraft {
    pub date: NaiveDate,
    pub band: ShiftBand,
    pub opening_float: Money,
    pub expenses: Money,
    pub expense_detail: String,
    pub actual_close: Money,
    pub notes: String,
}

/// The transaction engine over the shared persistent store.
pub struct Register {
    config: RegisterConfig,
    tz: chrono::FixedOffset,
    clock: Arc<dyn Clock>,
    products: Arc<dyn StockRepository>,
    customers: Arc<dyn CustomerDirectory>,
    gate: Arc<dyn CapabilityGate>,
    audit: Arc<dyn AuditSink>,
    tickets: TicketStore,
    sales: SaleStore,
    returns: ReturnStore,
    shifts: ShiftStore,
    ticket_codes: SequenceAllocator,
    sale_codes: SequenceAllocator,
    return_codes: SequenceAllocator,
    credit_note_codes: SequenceAllocator,
}

impl Register {
    pub fn new(
        config: RegisterConfig,
        clock: Arc<dyn Clock>,
        products: Arc<dyn StockRepository>,
        customers: Arc<dyn CustomerDirectory>,
        gate: Arc<dyn CapabilityGate>,
        audit: Arc<dyn AuditSink>,
    ) -> DomainResult<Self> {
        let tz = config.timezone()?;
        Ok(Self {
            ticket_codes: SequenceAllocator::starting_at(config.ticket_code_base),
            sale_codes: SequenceAllocator::starting_at(config.sale_code_base),
            return_codes: SequenceAllocator::starting_at(config.return_code_base),
            credit_note_codes: SequenceAllocator::starting_at(config.credit_note_code_base),
            config,
            tz,
            clock,
            products,
            customers,
            gate,
            audit,
            tickets: TicketStore::new(),
            sales: SaleStore::new(),
            returns: ReturnStore::new(),
            shifts: ShiftStore::new(),
        })
    }

    pub fn config(&self) -> &RegisterConfig {
        &self.config
    }

    pub fn tickets(&self) -> &TicketStore {
        &self.tickets
    }

    pub fn sales(&self) -> &SaleStore {
        &self.sales
    }

    pub fn returns(&self) -> &ReturnStore {
        &self.returns
    }

    pub fn shifts(&self) -> &ShiftStore {
        &self.shifts
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn local_today(&self) -> NaiveDate {
        self.now().with_timezone(&self.tz).date_naive()
    }

    /// Record an audit entry, best-effort.
    fn emit(&self, entry: AuditEntry) {
        if let Err(error) = self.audit.record(entry) {
            tracing::warn!(%error, "audit write failed; primary operation unaffected");
        }
    }

    // ── Tickets ──────────────────────────────────────────────────────────

    pub fn create_ticket(
        &self,
        ctx: &OpContext,
        customer_id: Option<CustomerId>,
        note: Option<String>,
    ) -> DomainResult<Ticket> {
        if let Some(customer_id) = customer_id {
            self.customers.resolve(customer_id)?;
        }

        let code = self.ticket_codes.next()?;
        let now = self.now();
        let ticket = Ticket::new(TicketId::new(), code, ctx.operator, customer_id, note, now);
        self.tickets.insert(ticket.clone())?;

        tracing::info!(code = ticket.code(), "ticket created");
        self.emit(
            AuditEntry::new(
                ctx.operator,
                AuditAction::TicketCreate,
                format!("ticket {} created", ticket.display_code()),
                now,
            )
            .with_client(ctx.client.clone()),
        );
        Ok(ticket)
    }

    pub fn add_ticket_line(
        &self,
        ticket_id: TicketId,
        product_id: ProductId,
        quantity: i64,
    ) -> DomainResult<Ticket> {
        let mut ticket = self.tickets.get(ticket_id)?;
        let product = self.products.get(product_id)?;
        ticket.add_line(&product, quantity, self.now())?;
        self.tickets.save(ticket.clone())?;
        Ok(ticket)
    }

    pub fn remove_ticket_line(
        &self,
        ticket_id: TicketId,
        product_id: ProductId,
    ) -> DomainResult<Ticket> {
        let mut ticket = self.tickets.get(ticket_id)?;
        ticket.remove_line(product_id, self.now())?;
        self.tickets.save(ticket.clone())?;
        Ok(ticket)
    }

    pub fn set_ticket_discount(
        &self,
        ticket_id: TicketId,
        discount: Option<Discount>,
    ) -> DomainResult<Ticket> {
        let mut ticket = self.tickets.get(ticket_id)?;
        ticket.set_discount(discount, self.now())?;
        self.tickets.save(ticket.clone())?;
        Ok(ticket)
    }

    /// Pending tickets held by the calling operator, for cart recovery.
    pub fn pending_tickets(&self, ctx: &OpContext) -> DomainResult<Vec<Ticket>> {
        self.tickets.pending_for(ctx.operator)
    }

    /// Cancel a ticket. No stock effect: nothing was ever reserved.
    pub fn cancel_ticket(&self, ctx: &OpContext, ticket_id: TicketId) -> DomainResult<()> {
        let mut ticket = self.tickets.get(ticket_id)?;
        let now = self.now();
        ticket.cancel(now)?;
        self.tickets.save(ticket.clone())?;

        tracing::info!(code = ticket.code(), "ticket cancelled");
        self.emit(
            AuditEntry::new(
                ctx.operator,
                AuditAction::TicketCancel,
                format!("ticket {} cancelled", ticket.display_code()),
                now,
            )
            .with_client(ctx.client.clone()),
        );
        Ok(())
    }

    /// Finalize a pending ticket into a paid sale.
    ///
    /// Ordering: pre-flight the ticket and tender, then commit the sale
    /// (stock re-validated and decremented under the row lock), then flip
    /// the ticket and link the sale. All fallible steps precede the first
    /// mutation.
    pub fn finalize_ticket(
        &self,
        ctx: &OpContext,
        ticket_id: TicketId,
        tender: PaymentTender,
    ) -> DomainResult<Sale> {
        let mut ticket = self.tickets.get(ticket_id)?;
        ticket.ensure_finalizable(&tender)?;

        let items: Vec<SaleItem> = ticket
            .active_lines()
            .map(|l| SaleItem {
                product_id: l.product_id,
                quantity: l.quantity,
                unit_price: l.unit_price,
            })
            .collect();
        let sale = self.commit_sale(
            ctx,
            ticket.customer_id(),
            &items,
            ticket.discount(),
            tender,
            ticket.note().map(str::to_string),
        )?;

        let now = self.now();
        ticket.mark_finalized(sale.id(), tender, now);
        self.tickets.save(ticket.clone())?;

        tracing::info!(
            ticket = ticket.code(),
            sale = sale.code(),
            total = %sale.total(),
            "ticket finalized"
        );
        self.emit(
            AuditEntry::new(
                ctx.operator,
                AuditAction::TicketFinalize,
                format!(
                    "ticket {} finalized into sale #{}",
                    ticket.display_code(),
                    sale.code()
                ),
                now,
            )
            .with_sale(sale.id())
            .with_payload(json!({
                "ticket_code": ticket.code(),
                "sale_code": sale.code(),
                "total": sale.total().cents(),
            }))
            .with_client(ctx.client.clone()),
        );
        Ok(sale)
    }

    // ── Sales ────────────────────────────────────────────────────────────

    /// Direct one-shot checkout, semantically equivalent to finalizing a
    /// ticket: validate stock for every line, decrement on success, assign
    /// a sequential code, persist the immutable record.
    pub fn checkout(
        &self,
        ctx: &OpContext,
        customer_id: Option<CustomerId>,
        lines: &[CheckoutLine],
        discount: Option<Discount>,
        tender: PaymentTender,
        note: Option<String>,
    ) -> DomainResult<Sale> {
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let product = self.products.get(line.product_id)?;
            items.push(SaleItem {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: product.sale_price,
            });
        }
        self.commit_sale(ctx, customer_id, &items, discount, tender, note)
    }

    /// Shared commit path for checkout and ticket finalization.
    fn commit_sale(
        &self,
        ctx: &OpContext,
        customer_id: Option<CustomerId>,
        items: &[SaleItem],
        discount: Option<Discount>,
        tender: PaymentTender,
        note: Option<String>,
    ) -> DomainResult<Sale> {
        if let Some(customer_id) = customer_id {
            self.customers.resolve(customer_id)?;
        }

        let code = self.sale_codes.next()?;
        let now = self.now();
        let sale = Sale::create(
            SaleId::new(),
            code,
            customer_id,
            ctx.operator,
            items,
            discount,
            tender,
            note,
            SaleStatus::Paid,
            now,
        )?;

        // Quantities are summed per product so repeated lines check against
        // the combined requirement; every row is validated before the first
        // decrement.
        let mut required: HashMap<ProductId, i64> = HashMap::new();
        for item in items {
            *required.entry(item.product_id).or_insert(0) += item.quantity;
        }
        let ids: Vec<ProductId> = required.keys().copied().collect();
        self.products.with_rows_for_update(&ids, &mut |rows| {
            for (&product_id, &quantity) in &required {
                let product = rows.product(product_id)?;
                if product.stock < quantity {
                    return Err(DomainError::insufficient_stock(
                        product_id,
                        quantity,
                        product.stock,
                    ));
                }
            }
            for (&product_id, &quantity) in &required {
                rows.adjust(product_id, -quantity)?;
            }
            Ok(())
        })?;

        self.sales.insert(sale.clone())?;

        tracing::info!(code = sale.code(), total = %sale.total(), "sale committed");
        self.emit(
            AuditEntry::new(
                ctx.operator,
                AuditAction::SaleCreate,
                format!("sale #{} committed for {}", sale.code(), sale.total()),
                now,
            )
            .with_sale(sale.id())
            .with_payload(json!({
                "code": sale.code(),
                "total": sale.total().cents(),
                "method": sale.tender().method,
            }))
            .with_client(ctx.client.clone()),
        );
        Ok(sale)
    }

    /// Void a sale, restoring stock for every active line. Irreversible.
    pub fn void_sale(&self, ctx: &OpContext, sale_id: SaleId) -> DomainResult<()> {
        let mut sale = self.sales.get(sale_id)?;
        sale.ensure_voidable()?;

        let mut restored: HashMap<ProductId, i64> = HashMap::new();
        for (product_id, quantity) in sale.restock_lines() {
            *restored.entry(product_id).or_insert(0) += quantity;
        }
        // Products deleted from the catalog since the sale cannot be
        // restocked; their lines are skipped.
        let ids: Vec<ProductId> = restored
            .keys()
            .copied()
            .filter(|id| self.products.get(*id).is_ok())
            .collect();
        if !ids.is_empty() {
            self.products.with_rows_for_update(&ids, &mut |rows| {
                for &id in &ids {
                    if let Some(&quantity) = restored.get(&id) {
                        rows.adjust(id, quantity)?;
                    }
                }
                Ok(())
            })?;
        }

        sale.mark_voided();
        self.sales.save(sale.clone())?;

        let now = self.now();
        tracing::info!(code = sale.code(), "sale voided");
        self.emit(
            AuditEntry::new(
                ctx.operator,
                AuditAction::SaleVoid,
                format!("sale #{} voided", sale.code()),
                now,
            )
            .with_sale(sale.id())
            .with_client(ctx.client.clone()),
        );
        Ok(())
    }

    /// Whether the sale currently accepts a return request.
    pub fn sale_returnable(&self, sale_id: SaleId) -> DomainResult<bool> {
        let sale = self.sales.get(sale_id)?;
        let has_open = self.returns.has_open_return_for(sale_id)?;
        Ok(sale.is_returnable(self.now(), has_open, self.config.return_window_days))
    }

    // ── Returns ──────────────────────────────────────────────────────────

    pub fn create_return(
        &self,
        ctx: &OpContext,
        sale_id: SaleId,
        reason: ReturnReason,
        reason_detail: &str,
        items: &[ReturnItem],
    ) -> DomainResult<ReturnRequest> {
        let sale = self.sales.get(sale_id)?;
        let has_open = self.returns.has_open_return_for(sale_id)?;
        let now = self.now();
        sale.ensure_returnable(now, has_open, self.config.return_window_days)?;

        let mut descriptions = HashMap::new();
        for item in items {
            if let Ok(product) = self.products.get(item.product_id) {
                descriptions.insert(item.product_id, product.description);
            }
        }

        let code = self.return_codes.next()?;
        let request = ReturnRequest::create(
            ReturnRequestId::new(),
            code,
            &sale,
            ctx.operator,
            reason,
            reason_detail,
            items,
            &descriptions,
            now,
        )?;
        self.returns.insert_request(request.clone())?;

        tracing::info!(code = request.code(), sale = sale.code(), "return requested");
        self.emit(
            AuditEntry::new(
                ctx.operator,
                AuditAction::ReturnCreate,
                format!(
                    "return {} created against sale #{}",
                    request.display_code(),
                    sale.code()
                ),
                now,
            )
            .with_sale(sale_id)
            .with_return(request.id())
            .with_payload(json!({ "total": request.total().cents() }))
            .with_client(ctx.client.clone()),
        );
        Ok(request)
    }

    pub fn approve_return(
        &self,
        ctx: &OpContext,
        return_id: ReturnRequestId,
        notes: &str,
    ) -> DomainResult<()> {
        if !self.gate.allows(ctx.operator, &capability::returns_approve()) {
            return Err(DomainError::Unauthorized);
        }
        let mut request = self.returns.get_request(return_id)?;
        let now = self.now();
        request.approve(ctx.operator, notes, now)?;
        self.returns.save_request(request.clone())?;

        tracing::info!(code = request.code(), "return approved");
        self.emit(
            AuditEntry::new(
                ctx.operator,
                AuditAction::ReturnApprove,
                format!("return {} approved", request.display_code()),
                now,
            )
            .with_sale(request.sale_id())
            .with_return(return_id)
            .with_client(ctx.client.clone()),
        );
        Ok(())
    }

    pub fn reject_return(
        &self,
        ctx: &OpContext,
        return_id: ReturnRequestId,
        notes: &str,
    ) -> DomainResult<()> {
        if !self.gate.allows(ctx.operator, &capability::returns_approve()) {
            return Err(DomainError::Unauthorized);
        }
        let mut request = self.returns.get_request(return_id)?;
        let now = self.now();
        request.reject(ctx.operator, notes, now)?;
        self.returns.save_request(request.clone())?;

        tracing::info!(code = request.code(), "return rejected");
        self.emit(
            AuditEntry::new(
                ctx.operator,
                AuditAction::ReturnReject,
                format!("return {} rejected", request.display_code()),
                now,
            )
            .with_sale(request.sale_id())
            .with_return(return_id)
            .with_client(ctx.client.clone()),
        );
        Ok(())
    }

    /// Process an approved return: restore stock for every line with a
    /// resolvable product and issue the credit note.
    pub fn process_return(
        &self,
        ctx: &OpContext,
        return_id: ReturnRequestId,
    ) -> DomainResult<CreditNote> {
        let mut request = self.returns.get_request(return_id)?;
        request.ensure_processable()?;

        let mut restored: HashMap<ProductId, i64> = HashMap::new();
        for (product_id, quantity) in request.restock_lines() {
            *restored.entry(product_id).or_insert(0) += quantity;
        }
        let ids: Vec<ProductId> = restored
            .keys()
            .copied()
            .filter(|id| self.products.get(*id).is_ok())
            .collect();
        if !ids.is_empty() {
            self.products.with_rows_for_update(&ids, &mut |rows| {
                for &id in &ids {
                    if let Some(&quantity) = restored.get(&id) {
                        rows.adjust(id, quantity)?;
                    }
                }
                Ok(())
            })?;
        }

        let now = self.now();
        let code = self.credit_note_codes.next()?;
        let expires_on =
            self.local_today() + chrono::Duration::days(self.config.credit_note_validity_days);
        let note = CreditNote::issue(
            CreditNoteId::new(),
            code,
            request.id(),
            request.sale_id(),
            request.total(),
            now,
            expires_on,
        );

        request.mark_processed(now);
        self.returns.save_request(request.clone())?;
        self.returns.insert_note(note.clone())?;

        tracing::info!(
            code = request.code(),
            credit_note = note.code(),
            amount = %note.amount(),
            "return processed"
        );
        self.emit(
            AuditEntry::new(
                ctx.operator,
                AuditAction::ReturnProcess,
                format!(
                    "return {} processed; credit note {} issued",
                    request.display_code(),
                    note.display_code()
                ),
                now,
            )
            .with_sale(request.sale_id())
            .with_return(return_id)
            .with_payload(json!({ "credit_note": note.code() }))
            .with_client(ctx.client.clone()),
        );
        self.emit(
            AuditEntry::new(
                ctx.operator,
                AuditAction::CreditNoteIssue,
                format!(
                    "credit note {} issued for {}",
                    note.display_code(),
                    note.amount()
                ),
                now,
            )
            .with_sale(request.sale_id())
            .with_return(return_id)
            .with_payload(json!({
                "code": note.code(),
                "amount": note.amount().cents(),
                "expires_on": note.expires_on(),
            }))
            .with_client(ctx.client.clone()),
        );
        Ok(note)
    }

    // ── Credit notes ─────────────────────────────────────────────────────

    /// Validity check with lazy expiry; the status flip, if any, is
    /// persisted.
    pub fn credit_note_current(&self, note_id: CreditNoteId) -> DomainResult<bool> {
        let mut note = self.returns.get_note(note_id)?;
        let current = note.is_current(self.local_today());
        self.returns.save_note(note)?;
        Ok(current)
    }

    /// Redeem part of a credit note's balance against an existing sale.
    pub fn apply_credit_note(
        &self,
        ctx: &OpContext,
        note_id: CreditNoteId,
        sale_id: SaleId,
        amount: Money,
    ) -> DomainResult<()> {
        self.sales.get(sale_id)?;
        let mut note = self.returns.get_note(note_id)?;
        let now = self.now();

        let outcome = note.apply(sale_id, amount, self.local_today(), now);
        // Persist even on failure: the validity check inside `apply` may
        // have lazily expired the note.
        self.returns.save_note(note.clone())?;
        let application = outcome?;
        self.returns.append_application(application)?;

        tracing::info!(
            code = note.code(),
            amount = %amount,
            balance = %note.balance(),
            "credit note applied"
        );
        self.emit(
            AuditEntry::new(
                ctx.operator,
                AuditAction::CreditNoteApply,
                format!(
                    "credit note {} applied for {} (balance {})",
                    note.display_code(),
                    amount,
                    note.balance()
                ),
                now,
            )
            .with_sale(sale_id)
            .with_payload(json!({
                "code": note.code(),
                "amount": amount.cents(),
                "balance": note.balance().cents(),
            }))
            .with_client(ctx.client.clone()),
        );
        Ok(())
    }

    // ── Shifts ───────────────────────────────────────────────────────────

    /// Band in effect at the injected clock's current local time.
    pub fn current_band(&self) -> ShiftBand {
        band_at(self.now(), self.tz)
    }

    fn aggregate_window(&self, date: NaiveDate, band: ShiftBand) -> DomainResult<ShiftTotals> {
        let (start, end) = band.window(date, self.tz)?;
        let sales = self.sales.paid_in_window(start, end)?;
        Ok(aggregate_sales(&sales))
    }

    /// Create the reconciliation record for a (date, band) slot and run the
    /// first aggregation pass.
    pub fn create_shift(&self, ctx: &OpContext, draft: ShiftDraft) -> DomainResult<CashShift> {
        if draft.opening_float.is_negative() {
            return Err(DomainError::validation("opening float cannot be negative"));
        }
        if draft.expenses.is_negative() {
            return Err(DomainError::validation("expenses cannot be negative"));
        }
        if draft.actual_close.is_negative() {
            return Err(DomainError::validation(
                "actual closing amount cannot be negative",
            ));
        }
        if self.shifts.find_by_slot(draft.date, draft.band)?.is_some() {
            return Err(DomainError::conflict(format!(
                "shift already recorded for {} {}",
                draft.date, draft.band
            )));
        }

        let totals = self.aggregate_window(draft.date, draft.band)?;
        let now = self.now();
        let mut shift = CashShift::create(
            ShiftId::new(),
            draft.date,
            draft.band,
            ctx.operator,
            draft.opening_float,
            draft.expenses,
            draft.expense_detail,
            draft.actual_close,
            draft.notes,
            now,
        );
        shift.apply_totals(totals);
        self.shifts.insert(shift.clone())?;

        tracing::info!(
            date = %shift.date,
            band = %shift.band,
            expected = %shift.expected_close,
            variance = %shift.variance,
            "shift recorded"
        );
        self.emit(
            AuditEntry::new(
                ctx.operator,
                AuditAction::ShiftCreate,
                format!("shift recorded for {} {}", shift.date, shift.band),
                now,
            )
            .with_payload(json!({
                "date": shift.date,
                "band": shift.band,
                "sale_count": shift.totals.sale_count,
                "expected_close": shift.expected_close.cents(),
                "variance": shift.variance.cents(),
            }))
            .with_client(ctx.client.clone()),
        );
        Ok(shift)
    }

    /// Re-run the aggregation for an existing shift. Idempotent: always
    /// overwrites the prior totals with a fresh query.
    pub fn recalculate_shift(&self, ctx: &OpContext, shift_id: ShiftId) -> DomainResult<CashShift> {
        let mut shift = self.shifts.get(shift_id)?;
        let totals = self.aggregate_window(shift.date, shift.band)?;
        shift.apply_totals(totals);
        self.shifts.save(shift.clone())?;

        let now = self.now();
        tracing::info!(date = %shift.date, band = %shift.band, "shift recalculated");
        self.emit(
            AuditEntry::new(
                ctx.operator,
                AuditAction::ShiftRecalculate,
                format!("shift recalculated for {} {}", shift.date, shift.band),
                now,
            )
            .with_payload(json!({
                "sale_count": shift.totals.sale_count,
                "expected_close": shift.expected_close.cents(),
                "variance": shift.variance.cents(),
            }))
            .with_client(ctx.client.clone()),
        );
        Ok(shift)
    }

    // ── Stock ────────────────────────────────────────────────────────────

    /// Privileged manual stock adjustment; never takes the level below
    /// zero. Returns the resulting stock.
    pub fn adjust_stock(
        &self,
        ctx: &OpContext,
        product_id: ProductId,
        delta: i64,
        reason: &str,
    ) -> DomainResult<i64> {
        if !self.gate.allows(ctx.operator, &capability::stock_adjust()) {
            return Err(DomainError::Unauthorized);
        }
        if delta == 0 {
            return Err(DomainError::validation("stock delta cannot be zero"));
        }

        let mut level = 0;
        self.products.with_rows_for_update(&[product_id], &mut |rows| {
            level = rows.adjust(product_id, delta)?;
            Ok(())
        })?;

        let product = self.products.get(product_id)?;
        if product.is_low_stock() {
            tracing::warn!(
                product = %product_id,
                stock = level,
                "stock at or below minimum after adjustment"
            );
        }

        let now = self.now();
        self.emit(
            AuditEntry::new(
                ctx.operator,
                AuditAction::StockAdjust,
                format!("stock adjusted by {delta} for {}", product.description),
                now,
            )
            .with_payload(json!({
                "product_id": product_id,
                "delta": delta,
                "reason": reason,
                "stock": level,
                "level": product.stock_level(),
            }))
            .with_client(ctx.client.clone()),
        );
        Ok(level)
    }
}
