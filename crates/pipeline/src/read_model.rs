//! Document status read model.
//!
//! The state is a derived value: it is rebuilt by folding a document stream
//! from [`DocumentState::new`] and has no persistence of its own.

use std::collections::{BTreeMap, BTreeSet};

use docflow_core::{DocumentId, EventId};
use docflow_events::{DocumentEvent, EventEnvelope, EventType, Projection};

/// Materialized current state of one document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentState {
    document_id: DocumentId,
    processed_event_ids: BTreeSet<EventId>,
    finalized: bool,
    latest_stage: Option<EventType>,
    data_by_stage: BTreeMap<EventType, DocumentEvent>,
}

impl DocumentState {
    /// Empty initial state; also the state of a document with no history.
    pub fn new(document_id: DocumentId) -> Self {
        Self {
            document_id,
            processed_event_ids: BTreeSet::new(),
            finalized: false,
            latest_stage: None,
            data_by_stage: BTreeMap::new(),
        }
    }

    /// Fold a stream from the empty state.
    pub fn replay<'a, I>(document_id: DocumentId, envelopes: I) -> Self
    where
        I: IntoIterator<Item = &'a EventEnvelope>,
    {
        Self::new(document_id).fold(envelopes)
    }

    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    pub fn processed_event_ids(&self) -> &BTreeSet<EventId> {
        &self.processed_event_ids
    }

    pub fn finalized(&self) -> bool {
        self.finalized
    }

    pub fn latest_stage(&self) -> Option<EventType> {
        self.latest_stage
    }

    pub fn data_by_stage(&self) -> &BTreeMap<EventType, DocumentEvent> {
        &self.data_by_stage
    }

    /// Last payload recorded for `stage`, if any.
    pub fn stage(&self, stage: EventType) -> Option<&DocumentEvent> {
        self.data_by_stage.get(&stage)
    }
}

impl Projection for DocumentState {
    fn apply(mut self, envelope: &EventEnvelope) -> Self {
        if envelope.document_id() != self.document_id {
            return self;
        }
        if self.processed_event_ids.contains(&envelope.event_id()) {
            return self;
        }

        let event_type = envelope.event_type();
        // Terminal lock: once finalized only a redundant finalize is recorded.
        if self.finalized && event_type != EventType::DocumentFinalized {
            return self;
        }

        self.processed_event_ids.insert(envelope.event_id());
        self.latest_stage = Some(event_type);
        self.data_by_stage
            .insert(event_type, envelope.payload().clone());

        if event_type == EventType::DocumentFinalized {
            self.finalized = true;
        }
        self
    }
}

/// Free-function form of [`Projection::apply`] for [`DocumentState`].
pub fn apply_event(state: DocumentState, envelope: &EventEnvelope) -> DocumentState {
    state.apply(envelope)
}
