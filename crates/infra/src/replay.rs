//! Read-side helpers for rebuilding document state from the log.

use docflow_core::DocumentId;
use docflow_pipeline::DocumentState;

use crate::event_log::{EventLog, EventLogError};

/// Replay a document's stream and fold it from the empty initial state.
///
/// Each call builds its own state value, so any number of readers may run
/// this concurrently against the same log. An unknown document yields the
/// initial state.
pub fn load_state<L>(log: &L, document_id: DocumentId) -> Result<DocumentState, EventLogError>
where
    L: EventLog + ?Sized,
{
    let stream = log.replay(document_id)?;
    let state = DocumentState::replay(document_id, &stream);
    tracing::debug!(
        %document_id,
        events = stream.len(),
        finalized = state.finalized(),
        "document state replayed"
    );
    Ok(state)
}
