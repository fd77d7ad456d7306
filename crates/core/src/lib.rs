//! `tenantry-core`: identifiers and the domain error model shared by every
//! other crate in the workspace.
//!
//! No I/O, no HTTP, no storage.

pub mod error;
pub mod id;

pub use error::DomainError;
pub use id::{TenantId, UserId};
