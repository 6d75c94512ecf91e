use std::collections::HashMap;
use std::sync::RwLock;

use mostrador_catalog::Product;
use mostrador_core::{DomainError, DomainResult, ProductId};

/// Exclusive view over a set of product rows held under the store lock.
///
/// Reads and writes inside a [`StockRepository::with_rows_for_update`]
/// closure go through this trait, so a read-check-mutate sequence can never
/// interleave with another writer against the same rows.
pub trait StockRows {
    fn product(&self, id: ProductId) -> DomainResult<Product>;

    /// Apply a signed stock movement. Decrements fail closed on
    /// insufficient stock and nothing is written.
    fn adjust(&mut self, id: ProductId, delta: i64) -> DomainResult<i64>;
}

/// Stock/catalog repository port.
///
/// The register's sole channel for reading products and writing stock.
/// `with_rows_for_update` is the pessimistic-locking entry point: the
/// closure runs with exclusive access to the named rows for the whole
/// read-check-mutate sequence.
pub trait StockRepository: Send + Sync {
    fn get(&self, id: ProductId) -> DomainResult<Product>;

    fn upsert(&self, product: Product) -> DomainResult<()>;

    fn with_rows_for_update(
        &self,
        ids: &[ProductId],
        op: &mut dyn FnMut(&mut dyn StockRows) -> DomainResult<()>,
    ) -> DomainResult<()>;
}

/// In-memory catalog/stock store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    rows: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

struct LockedRows<'a> {
    rows: &'a mut HashMap<ProductId, Product>,
}

impl StockRows for LockedRows<'_> {
    fn product(&self, id: ProductId) -> DomainResult<Product> {
        self.rows.get(&id).cloned().ok_or(DomainError::NotFound)
    }

    fn adjust(&mut self, id: ProductId, delta: i64) -> DomainResult<i64> {
        let product = self.rows.get_mut(&id).ok_or(DomainError::NotFound)?;
        let next = product.stock_after(delta)?;
        product.stock = next;
        Ok(next)
    }
}

impl StockRepository for InMemoryProductStore {
    fn get(&self, id: ProductId) -> DomainResult<Product> {
        let rows = self
            .rows
            .read()
            .map_err(|_| DomainError::conflict("product store lock poisoned"))?;
        rows.get(&id).cloned().ok_or(DomainError::NotFound)
    }

    fn upsert(&self, product: Product) -> DomainResult<()> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| DomainError::conflict("product store lock poisoned"))?;
        rows.insert(product.id, product);
        Ok(())
    }

    fn with_rows_for_update(
        &self,
        ids: &[ProductId],
        op: &mut dyn FnMut(&mut dyn StockRows) -> DomainResult<()>,
    ) -> DomainResult<()> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| DomainError::conflict("product store lock poisoned"))?;
        for id in ids {
            if !rows.contains_key(id) {
                return Err(DomainError::NotFound);
            }
        }
        let mut view = LockedRows { rows: &mut *rows };
        op(&mut view)
    }
}
