use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use mostrador_core::{AuditEntryId, OperatorId, ReturnRequestId, SaleId};

/// State-changing actions recorded in the audit trail (closed set).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    SaleCreate,
    SaleVoid,
    TicketCreate,
    TicketFinalize,
    TicketCancel,
    ReturnCreate,
    ReturnApprove,
    ReturnReject,
    ReturnProcess,
    CreditNoteIssue,
    CreditNoteApply,
    ShiftCreate,
    ShiftRecalculate,
    StockAdjust,
}

impl AuditAction {
    /// Stable action name identifier.
    pub fn kind(&self) -> &'static str {
        match self {
            AuditAction::SaleCreate => "sale.created",
            AuditAction::SaleVoid => "sale.voided",
            AuditAction::TicketCreate => "ticket.created",
            AuditAction::TicketFinalize => "ticket.finalized",
            AuditAction::TicketCancel => "ticket.cancelled",
            AuditAction::ReturnCreate => "return.created",
            AuditAction::ReturnApprove => "return.approved",
            AuditAction::ReturnReject => "return.rejected",
            AuditAction::ReturnProcess => "return.processed",
            AuditAction::CreditNoteIssue => "credit_note.issued",
            AuditAction::CreditNoteApply => "credit_note.applied",
            AuditAction::ShiftCreate => "shift.created",
            AuditAction::ShiftRecalculate => "shift.recalculated",
            AuditAction::StockAdjust => "stock.adjusted",
        }
    }
}

/// Requester network/client metadata captured with each entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMeta {
    pub ip: Option<IpAddr>,
    pub user_agent: Option<String>,
}

/// Append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub actor: OperatorId,
    pub action: AuditAction,
    pub sale_id: Option<SaleId>,
    pub return_id: Option<ReturnRequestId>,
    pub description: String,
    /// Open key-value payload for action-specific details.
    pub payload: JsonValue,
    pub client: ClientMeta,
    pub at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        actor: OperatorId,
        action: AuditAction,
        description: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditEntryId::new(),
            actor,
            action,
            sale_id: None,
            return_id: None,
            description: description.into(),
            payload: JsonValue::Null,
            client: ClientMeta::default(),
            at,
        }
    }

    pub fn with_sale(mut self, sale_id: SaleId) -> Self {
        self.sale_id = Some(sale_id);
        self
    }

    pub fn with_return(mut self, return_id: ReturnRequestId) -> Self {
        self.return_id = Some(return_id);
        self
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_client(mut self, client: ClientMeta) -> Self {
        self.client = client;
        self
    }
}
