use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;

use docflow_core::{CorrelationId, DocumentId, DomainError, DomainResult, EventId, guard};

use crate::event::{DocumentEvent, Event, EventType};

/// Schema revision stamped on envelopes recorded by this crate.
pub const CURRENT_EVENT_VERSION: u32 = 1;

/// Envelope for one immutable fact about one document.
///
/// This is the unit appended to a document stream.
///
/// Notes:
/// - **Identity**: `event_id` is unique system-wide; logs deduplicate on it.
/// - **Causality**: `correlation_id` groups a workflow run, `causation_id`
///   points at the immediate predecessor (absent for the root of a run).
/// - `event_type` is derived from the payload variant, so the two can never
///   disagree.
///
/// On the wire the envelope uses the attribute names `eventId`, `eventType`,
/// `eventVersion`, `occurredAt`, `correlationId`, `causationId`, `documentId`
/// and `payload`.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    event_id: EventId,
    event_version: u32,
    occurred_at: DateTime<Utc>,
    correlation_id: CorrelationId,
    causation_id: Option<EventId>,
    document_id: DocumentId,
    payload: DocumentEvent,
}

impl EventEnvelope {
    /// Record a new fact now, with a fresh identity.
    pub fn record(
        document_id: DocumentId,
        correlation_id: CorrelationId,
        causation_id: Option<EventId>,
        payload: impl Into<DocumentEvent>,
    ) -> DomainResult<Self> {
        let payload = payload.into();
        let event_version = payload.version();
        Self::new(
            EventId::new(),
            event_version,
            Utc::now(),
            correlation_id,
            causation_id,
            document_id,
            payload,
        )
    }

    /// Assemble an envelope from explicit parts (replay, imports, tests).
    pub fn new(
        event_id: EventId,
        event_version: u32,
        occurred_at: DateTime<Utc>,
        correlation_id: CorrelationId,
        causation_id: Option<EventId>,
        document_id: DocumentId,
        payload: impl Into<DocumentEvent>,
    ) -> DomainResult<Self> {
        guard::positive(event_version, "eventVersion")?;
        let payload = payload.into();
        payload.validate()?;
        if causation_id == Some(event_id) {
            return Err(DomainError::invalid_payload(
                "causationId must not reference the event itself",
            ));
        }
        Ok(Self {
            event_id,
            event_version,
            occurred_at,
            correlation_id,
            causation_id,
            document_id,
            payload,
        })
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }

    pub fn event_version(&self) -> u32 {
        self.event_version
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    pub fn causation_id(&self) -> Option<EventId> {
        self.causation_id
    }

    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    pub fn payload(&self) -> &DocumentEvent {
        &self.payload
    }

    pub fn into_payload(self) -> DocumentEvent {
        self.payload
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireEnvelopeRef<'a> {
    event_id: EventId,
    event_type: EventType,
    event_version: u32,
    occurred_at: &'a DateTime<Utc>,
    correlation_id: CorrelationId,
    causation_id: Option<EventId>,
    document_id: DocumentId,
    payload: &'a DocumentEvent,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEnvelope {
    event_id: EventId,
    event_type: EventType,
    event_version: u32,
    occurred_at: String,
    correlation_id: CorrelationId,
    #[serde(default)]
    causation_id: Option<EventId>,
    document_id: DocumentId,
    payload: JsonValue,
}

impl TryFrom<WireEnvelope> for EventEnvelope {
    type Error = DomainError;

    fn try_from(wire: WireEnvelope) -> Result<Self, Self::Error> {
        let occurred_at = guard::parse_utc(&wire.occurred_at, "occurredAt")?;
        let payload = DocumentEvent::from_json(wire.event_type, wire.payload)?;
        EventEnvelope::new(
            wire.event_id,
            wire.event_version,
            occurred_at,
            wire.correlation_id,
            wire.causation_id,
            wire.document_id,
            payload,
        )
    }
}

impl Serialize for EventEnvelope {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        WireEnvelopeRef {
            event_id: self.event_id,
            event_type: self.event_type(),
            event_version: self.event_version,
            occurred_at: &self.occurred_at,
            correlation_id: self.correlation_id,
            causation_id: self.causation_id,
            document_id: self.document_id,
            payload: &self.payload,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EventEnvelope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = WireEnvelope::deserialize(deserializer)?;
        EventEnvelope::try_from(wire).map_err(serde::de::Error::custom)
    }
}
