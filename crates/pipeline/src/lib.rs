//! Pure decision logic for the document workflow.
//!
//! Everything here is deterministic domain logic (no IO, no storage):
//! scoring extracted fields, choosing the next workflow step and folding an
//! event history into the current document state.

pub mod config;
pub mod policy;
pub mod read_model;
pub mod validation;

pub use config::{ProcessingPolicy, Thresholds};
pub use policy::{NextStep, PolicyEngine, decide_next_step};
pub use read_model::{DocumentState, apply_event};
pub use validation::{ValidationEngine, ValidationResult, min_confidence};
