//! Append-only document event log boundary.
//!
//! This module defines the storage-facing abstraction for recording and
//! replaying per-document streams without making any storage assumptions.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventLog;
pub use r#trait::{EventLog, EventLogError};
