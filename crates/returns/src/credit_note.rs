use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mostrador_core::{
    CreditNoteId, DomainError, DomainResult, Money, ReturnRequestId, SaleId,
};

/// Credit-note status lifecycle.
///
/// Expiry is lazy: the flip to `Expired` happens on a validity check, not
/// through a background sweep. `FullyUsed` is terminal once the balance
/// reaches zero.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditNoteStatus {
    Issued,
    PartiallyApplied,
    FullyUsed,
    Expired,
    Cancelled,
}

/// Immutable record of one partial redemption.
///
/// The ledger of applications for a note always reconciles with the note:
/// sum of applied amounts = face amount - available balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditNoteApplication {
    pub id: Uuid,
    pub credit_note_id: CreditNoteId,
    pub sale_id: SaleId,
    pub amount: Money,
    pub applied_at: DateTime<Utc>,
}

/// A redeemable store-credit balance issued from a processed return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditNote {
    id: CreditNoteId,
    code: u64,
    return_request_id: ReturnRequestId,
    sale_id: SaleId,
    /// Face amount, fixed at issuance.
    amount: Money,
    /// Available balance; monotonically non-increasing.
    balance: Money,
    issued_at: DateTime<Utc>,
    expires_on: NaiveDate,
    fully_used_at: Option<DateTime<Utc>>,
    status: CreditNoteStatus,
}

impl CreditNote {
    pub fn issue(
        id: CreditNoteId,
        code: u64,
        return_request_id: ReturnRequestId,
        sale_id: SaleId,
        amount: Money,
        issued_at: DateTime<Utc>,
        expires_on: NaiveDate,
    ) -> Self {
        Self {
            id,
            code,
            return_request_id,
            sale_id,
            amount,
            balance: amount,
            issued_at,
            expires_on,
            fully_used_at: None,
            status: CreditNoteStatus::Issued,
        }
    }

    pub fn id(&self) -> CreditNoteId {
        self.id
    }

    pub fn code(&self) -> u64 {
        self.code
    }

    pub fn display_code(&self) -> String {
        format!("NC-{:06}", self.code)
    }

    pub fn return_request_id(&self) -> ReturnRequestId {
        self.return_request_id
    }

    pub fn sale_id(&self) -> SaleId {
        self.sale_id
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_on(&self) -> NaiveDate {
        self.expires_on
    }

    pub fn fully_used_at(&self) -> Option<DateTime<Utc>> {
        self.fully_used_at
    }

    pub fn status(&self) -> CreditNoteStatus {
        self.status
    }

    /// Validity check with lazy expiry.
    ///
    /// Terminal statuses are never current. A note past its expiry date is
    /// flipped to `Expired` here; the caller persists the mutation. An
    /// unexpired note is current while it has balance left.
    pub fn is_current(&mut self, today: NaiveDate) -> bool {
        if matches!(
            self.status,
            CreditNoteStatus::Expired | CreditNoteStatus::Cancelled | CreditNoteStatus::FullyUsed
        ) {
            return false;
        }
        if today > self.expires_on {
            self.status = CreditNoteStatus::Expired;
            return false;
        }
        self.balance.is_positive()
    }

    /// Redeem `amount` against `sale_id`.
    ///
    /// Fails before any mutation: the note must be current and the amount
    /// positive and within the available balance. On success the balance
    /// drops, the status follows (partially applied, or fully used at zero
    /// with the redemption instant stamped), and the immutable application
    /// record is returned for the ledger.
    pub fn apply(
        &mut self,
        sale_id: SaleId,
        amount: Money,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> DomainResult<CreditNoteApplication> {
        if !amount.is_positive() {
            return Err(DomainError::validation("applied amount must be positive"));
        }
        if !self.is_current(today) {
            return Err(DomainError::invalid_state("credit note is not available"));
        }
        if amount > self.balance {
            return Err(DomainError::ExceedsBalance {
                requested: amount,
                available: self.balance,
            });
        }

        self.balance -= amount;
        if self.balance.is_zero() {
            self.status = CreditNoteStatus::FullyUsed;
            self.fully_used_at = Some(now);
        } else {
            self.status = CreditNoteStatus::PartiallyApplied;
        }

        Ok(CreditNoteApplication {
            id: Uuid::now_v7(),
            credit_note_id: self.id,
            sale_id,
            amount,
            applied_at: now,
        })
    }
}
