use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use mostrador_core::{DomainError, DomainResult, SaleId};
use mostrador_sales::{Sale, SaleStatus};

/// In-memory sale store.
#[derive(Debug, Default)]
pub struct SaleStore {
    rows: RwLock<HashMap<SaleId, Sale>>,
}

impl SaleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, sale: Sale) -> DomainResult<()> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| DomainError::conflict("sale store lock poisoned"))?;
        if rows.contains_key(&sale.id()) {
            return Err(DomainError::conflict("sale already exists"));
        }
        rows.insert(sale.id(), sale);
        Ok(())
    }

    pub fn get(&self, id: SaleId) -> DomainResult<Sale> {
        let rows = self
            .rows
            .read()
            .map_err(|_| DomainError::conflict("sale store lock poisoned"))?;
        rows.get(&id).cloned().ok_or(DomainError::NotFound)
    }

    pub fn save(&self, sale: Sale) -> DomainResult<()> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| DomainError::conflict("sale store lock poisoned"))?;
        if !rows.contains_key(&sale.id()) {
            return Err(DomainError::NotFound);
        }
        rows.insert(sale.id(), sale);
        Ok(())
    }

    /// Paid sales whose creation instant falls in `[start, end)`, ordered
    /// by creation time.
    ///
    /// This read is not isolated from concurrent sale creation; shift
    /// aggregation tolerates the race and simply re-aggregates later.
    pub fn paid_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<Sale>> {
        let rows = self
            .rows
            .read()
            .map_err(|_| DomainError::conflict("sale store lock poisoned"))?;
        let mut sales: Vec<Sale> = rows
            .values()
            .filter(|s| {
                s.status() == SaleStatus::Paid && s.created_at() >= start && s.created_at() < end
            })
            .cloned()
            .collect();
        sales.sort_by_key(|s| s.created_at());
        Ok(sales)
    }

    /// All sale codes, for uniqueness assertions in tests.
    pub fn codes(&self) -> DomainResult<Vec<u64>> {
        let rows = self
            .rows
            .read()
            .map_err(|_| DomainError::conflict("sale store lock poisoned"))?;
        Ok(rows.values().map(|s| s.code()).collect())
    }
}
