//! Returns domain module: post-sale reversal workflow.
//!
//! A return request moves through a linear state machine
//! (pending, then approved or rejected, then processed) and, once
//! processed, spawns a credit note whose balance is redeemed against
//! future sales through an append-only application ledger.

pub mod credit_note;
pub mod return_request;

pub use credit_note::{CreditNote, CreditNoteApplication, CreditNoteStatus};
pub use return_request::{ReturnItem, ReturnLine, ReturnReason, ReturnRequest, ReturnStatus};
