use std::sync::Arc;

use thiserror::Error;

use docflow_core::DocumentId;
use docflow_events::EventEnvelope;

/// Event log operation error.
///
/// These are **infrastructure errors** (the backend could not serve the
/// request). A duplicate append is not an error: it is reported as `false`.
#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("event log unavailable: {0}")]
    Unavailable(String),
}

/// Append-only, document-partitioned event log.
///
/// The log is the **single source of truth**: read models are derived from
/// it and nothing else holds authoritative state.
///
/// ## Append Semantics
///
/// `append()`:
/// - records the envelope at the end of its document's stream
/// - is idempotent by `event_id`: a second append of the same identity
///   returns `Ok(false)` and changes nothing
/// - is atomic: a partially recorded envelope is never observable
///
/// ## Load Semantics
///
/// `load_stream()` / `replay()`:
/// - return the document's envelopes in append order
/// - return an empty vector for an unknown document (never an error)
/// - impose no ordering across documents
///
/// ## Implementation Requirements
///
/// Implementations must support concurrent appends to different documents
/// without interference. Durable backends should deduplicate through a
/// unique key on the event identity rather than an ever-growing in-memory set.
pub trait EventLog: Send + Sync {
    /// Append one envelope. `Ok(true)` if newly recorded, `Ok(false)` if an
    /// envelope with the same `event_id` already exists.
    fn append(&self, envelope: EventEnvelope) -> Result<bool, EventLogError>;

    /// Append several envelopes in order; one outcome per envelope.
    ///
    /// The default implementation appends one by one. Backends that can
    /// commit a batch atomically should override it.
    fn append_all(&self, envelopes: Vec<EventEnvelope>) -> Result<Vec<bool>, EventLogError> {
        envelopes.into_iter().map(|e| self.append(e)).collect()
    }

    /// Load the full stream of a document in append order.
    fn load_stream(&self, document_id: DocumentId) -> Result<Vec<EventEnvelope>, EventLogError>;

    /// The sequence a projection consumes. Same ordering contract as
    /// [`EventLog::load_stream`].
    fn replay(&self, document_id: DocumentId) -> Result<Vec<EventEnvelope>, EventLogError> {
        self.load_stream(document_id)
    }
}

impl<L> EventLog for Arc<L>
where
    L: EventLog + ?Sized,
{
    fn append(&self, envelope: EventEnvelope) -> Result<bool, EventLogError> {
        (**self).append(envelope)
    }

    fn append_all(&self, envelopes: Vec<EventEnvelope>) -> Result<Vec<bool>, EventLogError> {
        (**self).append_all(envelopes)
    }

    fn load_stream(&self, document_id: DocumentId) -> Result<Vec<EventEnvelope>, EventLogError> {
        (**self).load_stream(document_id)
    }

    fn replay(&self, document_id: DocumentId) -> Result<Vec<EventEnvelope>, EventLogError> {
        (**self).replay(document_id)
    }
}
