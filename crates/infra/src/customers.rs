//! Customer directory port (external collaborator).

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use mostrador_core::{CustomerId, DomainError, DomainResult};

/// Minimal customer projection the register attaches to tickets and sales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: CustomerId,
    pub name: String,
}

/// Resolves an optional customer reference.
///
/// "Customer not found" is the caller's error, not a register failure: the
/// register simply refuses to attach an unknown customer.
pub trait CustomerDirectory: Send + Sync {
    fn resolve(&self, id: CustomerId) -> DomainResult<CustomerRecord>;
}

/// In-memory directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCustomerDirectory {
    rows: RwLock<HashMap<CustomerId, CustomerRecord>>,
}

impl InMemoryCustomerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: CustomerRecord) -> DomainResult<()> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| DomainError::conflict("customer directory lock poisoned"))?;
        rows.insert(record.id, record);
        Ok(())
    }
}

impl CustomerDirectory for InMemoryCustomerDirectory {
    fn resolve(&self, id: CustomerId) -> DomainResult<CustomerRecord> {
        let rows = self
            .rows
            .read()
            .map_err(|_| DomainError::conflict("customer directory lock poisoned"))?;
        rows.get(&id).cloned().ok_or(DomainError::NotFound)
    }
}
