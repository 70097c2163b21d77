use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use docflow_core::{DocumentId, EventId};
use docflow_events::EventEnvelope;

use super::r#trait::{EventLog, EventLogError};

#[derive(Debug, Default)]
struct Streams {
    by_document: HashMap<DocumentId, Vec<EventEnvelope>>,
    seen: HashSet<EventId>,
}

impl Streams {
    fn push(&mut self, envelope: EventEnvelope) -> bool {
        if !self.seen.insert(envelope.event_id()) {
            tracing::debug!(
                event_id = %envelope.event_id(),
                document_id = %envelope.document_id(),
                "duplicate append ignored"
            );
            return false;
        }
        self.by_document
            .entry(envelope.document_id())
            .or_default()
            .push(envelope);
        true
    }
}

/// In-memory append-only event log.
///
/// Intended for tests/dev and as the reference backend. Every append takes
/// a single write lock, so a batch is committed atomically and readers only
/// ever observe whole envelopes. The set of seen identities grows for the
/// lifetime of the log.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    streams: RwLock<Streams>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct envelopes recorded across all documents.
    pub fn len(&self) -> Result<usize, EventLogError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| EventLogError::Unavailable("lock poisoned".to_string()))?;
        Ok(streams.seen.len())
    }

    pub fn is_empty(&self) -> Result<bool, EventLogError> {
        Ok(self.len()? == 0)
    }
}

impl EventLog for InMemoryEventLog {
    fn append(&self, envelope: EventEnvelope) -> Result<bool, EventLogError> {
        let mut streams = self
            .streams
            .write()
            .map_err(|_| EventLogError::Unavailable("lock poisoned".to_string()))?;
        Ok(streams.push(envelope))
    }

    fn append_all(&self, envelopes: Vec<EventEnvelope>) -> Result<Vec<bool>, EventLogError> {
        let mut streams = self
            .streams
            .write()
            .map_err(|_| EventLogError::Unavailable("lock poisoned".to_string()))?;
        Ok(envelopes.into_iter().map(|e| streams.push(e)).collect())
    }

    fn load_stream(&self, document_id: DocumentId) -> Result<Vec<EventEnvelope>, EventLogError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| EventLogError::Unavailable("lock poisoned".to_string()))?;
        Ok(streams
            .by_document
            .get(&document_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use docflow_core::CorrelationId;
    use docflow_events::{DocumentFinalized, EventType, ManualReviewRequested, QualityGate};

    use super::*;

    fn review(doc: DocumentId) -> EventEnvelope {
        EventEnvelope::record(
            doc,
            CorrelationId::new(),
            None,
            ManualReviewRequested {
                reason: "validation_or_confidence_policy".to_string(),
            },
        )
        .unwrap()
    }

    fn finalized(doc: DocumentId, cause: EventId) -> EventEnvelope {
        EventEnvelope::record(
            doc,
            CorrelationId::new(),
            Some(cause),
            DocumentFinalized {
                final_json_uri: "s3://final/doc.json".to_string(),
                finalized_by: "system".to_string(),
                quality_gate: QualityGate::Auto,
            },
        )
        .unwrap()
    }

    #[test]
    fn duplicate_append_is_reported_not_failed() {
        let log = InMemoryEventLog::new();
        let doc = DocumentId::new();
        let env = review(doc);

        assert!(log.append(env.clone()).unwrap());
        assert!(!log.append(env.clone()).unwrap());

        let stream = log.load_stream(doc).unwrap();
        assert_eq!(stream, vec![env]);
    }

    #[test]
    fn unknown_document_has_empty_stream() {
        let log = InMemoryEventLog::new();
        assert!(log.load_stream(DocumentId::new()).unwrap().is_empty());
        assert!(log.replay(DocumentId::new()).unwrap().is_empty());
        assert!(log.is_empty().unwrap());
    }

    #[test]
    fn streams_keep_append_order_and_stay_separate() {
        let log = InMemoryEventLog::new();
        let a = DocumentId::new();
        let b = DocumentId::new();
        let first = review(a);
        let other = review(b);
        let second = finalized(a, first.event_id());

        log.append(first.clone()).unwrap();
        log.append(other.clone()).unwrap();
        log.append(second.clone()).unwrap();

        let types: Vec<EventType> = log
            .replay(a)
            .unwrap()
            .iter()
            .map(EventEnvelope::event_type)
            .collect();
        assert_eq!(
            types,
            vec![EventType::ManualReviewRequested, EventType::DocumentFinalized]
        );
        assert_eq!(log.load_stream(b).unwrap(), vec![other]);
        assert_eq!(log.len().unwrap(), 3);
    }

    #[test]
    fn batch_append_reports_per_envelope_outcome() {
        let log = InMemoryEventLog::new();
        let doc = DocumentId::new();
        let env = review(doc);
        log.append(env.clone()).unwrap();

        let next = finalized(doc, env.event_id());
        let outcomes = log.append_all(vec![env, next.clone(), next]).unwrap();

        assert_eq!(outcomes, vec![false, true, false]);
        assert_eq!(log.load_stream(doc).unwrap().len(), 2);
    }

    #[test]
    fn concurrent_appends_across_documents_do_not_interfere() {
        let log = Arc::new(InMemoryEventLog::new());
        let docs: Vec<DocumentId> = (0..8).map(|_| DocumentId::new()).collect();

        let handles: Vec<_> = docs
            .iter()
            .copied()
            .map(|doc| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let env = review(doc);
                        assert!(log.append(env.clone()).unwrap());
                        assert!(!log.append(env).unwrap());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        for doc in docs {
            let stream = log.load_stream(doc).unwrap();
            assert_eq!(stream.len(), 50);
            assert!(stream.iter().all(|e| e.document_id() == doc));
        }
        assert_eq!(log.len().unwrap(), 400);
    }
}
