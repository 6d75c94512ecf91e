use std::collections::HashMap;
use std::sync::RwLock;

use mostrador_core::{DomainError, DomainResult, OperatorId, TicketId};
use mostrador_tickets::{Ticket, TicketStatus};

/// In-memory ticket store.
#[derive(Debug, Default)]
pub struct TicketStore {
    rows: RwLock<HashMap<TicketId, Ticket>>,
}

impl TicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, ticket: Ticket) -> DomainResult<()> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| DomainError::conflict("ticket store lock poisoned"))?;
        if rows.contains_key(&ticket.id()) {
            return Err(DomainError::conflict("ticket already exists"));
        }
        rows.insert(ticket.id(), ticket);
        Ok(())
    }

    pub fn get(&self, id: TicketId) -> DomainResult<Ticket> {
        let rows = self
            .rows
            .read()
            .map_err(|_| DomainError::conflict("ticket store lock poisoned"))?;
        rows.get(&id).cloned().ok_or(DomainError::NotFound)
    }

    pub fn save(&self, ticket: Ticket) -> DomainResult<()> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| DomainError::conflict("ticket store lock poisoned"))?;
        if !rows.contains_key(&ticket.id()) {
            return Err(DomainError::NotFound);
        }
        rows.insert(ticket.id(), ticket);
        Ok(())
    }

    /// Pending tickets held by an operator, newest first.
    pub fn pending_for(&self, operator_id: OperatorId) -> DomainResult<Vec<Ticket>> {
        let rows = self
            .rows
            .read()
            .map_err(|_| DomainError::conflict("ticket store lock poisoned"))?;
        let mut pending: Vec<Ticket> = rows
            .values()
            .filter(|t| t.operator_id() == operator_id && t.status() == TicketStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|t| std::cmp::Reverse(t.created_at()));
        Ok(pending)
    }
}
