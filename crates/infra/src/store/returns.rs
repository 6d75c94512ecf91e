use std::collections::HashMap;
use std::sync::RwLock;

use mostrador_core::{CreditNoteId, DomainError, DomainResult, ReturnRequestId, SaleId};
use mostrador_returns::{CreditNote, CreditNoteApplication, ReturnRequest};

/// In-memory store for the return workflow: requests, credit notes, and
/// the append-only redemption ledger.
#[derive(Debug, Default)]
pub struct ReturnStore {
    requests: RwLock<HashMap<ReturnRequestId, ReturnRequest>>,
    notes: RwLock<HashMap<CreditNoteId, CreditNote>>,
    applications: RwLock<Vec<CreditNoteApplication>>,
}

impl ReturnStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_request(&self, request: ReturnRequest) -> DomainResult<()> {
        let mut requests = self
            .requests
            .write()
            .map_err(|_| DomainError::conflict("return store lock poisoned"))?;
        if requests.contains_key(&request.id()) {
            return Err(DomainError::conflict("return request already exists"));
        }
        requests.insert(request.id(), request);
        Ok(())
    }

    pub fn get_request(&self, id: ReturnRequestId) -> DomainResult<ReturnRequest> {
        let requests = self
            .requests
            .read()
            .map_err(|_| DomainError::conflict("return store lock poisoned"))?;
        requests.get(&id).cloned().ok_or(DomainError::NotFound)
    }

    pub fn save_request(&self, request: ReturnRequest) -> DomainResult<()> {
        let mut requests = self
            .requests
            .write()
            .map_err(|_| DomainError::conflict("return store lock poisoned"))?;
        if !requests.contains_key(&request.id()) {
            return Err(DomainError::NotFound);
        }
        requests.insert(request.id(), request);
        Ok(())
    }

    /// Whether any pending or approved return blocks `sale_id`.
    pub fn has_open_return_for(&self, sale_id: SaleId) -> DomainResult<bool> {
        let requests = self
            .requests
            .read()
            .map_err(|_| DomainError::conflict("return store lock poisoned"))?;
        Ok(requests
            .values()
            .any(|r| r.sale_id() == sale_id && r.is_open()))
    }

    pub fn insert_note(&self, note: CreditNote) -> DomainResult<()> {
        let mut notes = self
            .notes
            .write()
            .map_err(|_| DomainError::conflict("return store lock poisoned"))?;
        if notes.contains_key(&note.id()) {
            return Err(DomainError::conflict("credit note already exists"));
        }
        notes.insert(note.id(), note);
        Ok(())
    }

    pub fn get_note(&self, id: CreditNoteId) -> DomainResult<CreditNote> {
        let notes = self
            .notes
            .read()
            .map_err(|_| DomainError::conflict("return store lock poisoned"))?;
        notes.get(&id).cloned().ok_or(DomainError::NotFound)
    }

    pub fn save_note(&self, note: CreditNote) -> DomainResult<()> {
        let mut notes = self
            .notes
            .write()
            .map_err(|_| DomainError::conflict("return store lock poisoned"))?;
        if !notes.contains_key(&note.id()) {
            return Err(DomainError::NotFound);
        }
        notes.insert(note.id(), note);
        Ok(())
    }

    /// Credit note spawned by a processed return, if any.
    pub fn note_for_request(&self, id: ReturnRequestId) -> DomainResult<Option<CreditNote>> {
        let notes = self
            .notes
            .read()
            .map_err(|_| DomainError::conflict("return store lock poisoned"))?;
        Ok(notes.values().find(|n| n.return_request_id() == id).cloned())
    }

    /// Append to the redemption ledger.
    pub fn append_application(&self, application: CreditNoteApplication) -> DomainResult<()> {
        let mut applications = self
            .applications
            .write()
            .map_err(|_| DomainError::conflict("return store lock poisoned"))?;
        applications.push(application);
        Ok(())
    }

    pub fn applications_for(
        &self,
        note_id: CreditNoteId,
    ) -> DomainResult<Vec<CreditNoteApplication>> {
        let applications = self
            .applications
            .read()
            .map_err(|_| DomainError::conflict("return store lock poisoned"))?;
        Ok(applications
            .iter()
            .filter(|a| a.credit_note_id == note_id)
            .copied()
            .collect())
    }
}
