//! `docflow-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! strongly-typed identifiers, the domain error model and the invariant guards
//! every payload constructor goes through.

pub mod error;
pub mod guard;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{CorrelationId, DocumentId, EventId};
