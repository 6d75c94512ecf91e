use std::collections::HashMap;
use std::sync::RwLock;

use chrono::NaiveDate;

use mostrador_core::{DomainError, DomainResult, ShiftId};
use mostrador_shifts::{CashShift, ShiftBand};

/// In-memory cash-shift store.
#[derive(Debug, Default)]
pub struct ShiftStore {
    rows: RwLock<HashMap<ShiftId, CashShift>>,
}

impl ShiftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a shift, enforcing the one-record-per-(date, band) rule.
    pub fn insert(&self, shift: CashShift) -> DomainResult<()> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| DomainError::conflict("shift store lock poisoned"))?;
        if rows.values().any(|s| s.slot() == shift.slot()) {
            return Err(DomainError::conflict(format!(
                "shift already recorded for {} {}",
                shift.date, shift.band
            )));
        }
        rows.insert(shift.id, shift);
        Ok(())
    }

    pub fn get(&self, id: ShiftId) -> DomainResult<CashShift> {
        let rows = self
            .rows
            .read()
            .map_err(|_| DomainError::conflict("shift store lock poisoned"))?;
        rows.get(&id).cloned().ok_or(DomainError::NotFound)
    }

    pub fn save(&self, shift: CashShift) -> DomainResult<()> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| DomainError::conflict("shift store lock poisoned"))?;
        if !rows.contains_key(&shift.id) {
            return Err(DomainError::NotFound);
        }
        rows.insert(shift.id, shift);
        Ok(())
    }

    pub fn find_by_slot(
        &self,
        date: NaiveDate,
        band: ShiftBand,
    ) -> DomainResult<Option<CashShift>> {
        let rows = self
            .rows
            .read()
            .map_err(|_| DomainError::conflict("shift store lock poisoned"))?;
        Ok(rows.values().find(|s| s.slot() == (date, band)).cloned())
    }
}
