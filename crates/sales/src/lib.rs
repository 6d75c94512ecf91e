//! Sales domain module.
//!
//! This crate contains business rules for completed sales, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod sale;

pub use sale::{Sale, SaleItem, SaleLine, SaleStatus};
