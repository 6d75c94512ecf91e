//! `mostrador-auth` — pure authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage. The register
//! core only ever asks one question here: does this operator hold a given
//! capability. Everything else (sessions, tokens, user management) lives
//! outside the system.

pub mod authorize;
pub mod gate;
pub mod permissions;
pub mod principal;

pub use authorize::{AuthzError, authorize};
pub use gate::{CapabilityGate, StaticCapabilityGate};
pub use permissions::{Permission, capability};
pub use principal::Principal;
