//! Ticket domain module.
//!
//! A ticket is a held/draft cart: mutable while pending, immutable once
//! finalized into a sale or cancelled. Pure domain logic only (no IO, no
//! HTTP, no storage).

pub mod ticket;

pub use ticket::{Ticket, TicketLine, TicketStatus};
