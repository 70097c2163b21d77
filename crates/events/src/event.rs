use core::fmt;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value as JsonValue;

use docflow_core::{DomainError, DomainResult};

use crate::envelope::CURRENT_EVENT_VERSION;
use crate::payload::{
    AiExtractionCompleted, DocumentFinalized, DocumentIngested, ManualCorrectionApplied,
    ManualReviewRequested, OcrCompleted, ValidationCompleted,
};

/// A domain-agnostic event.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **versioned** (schema evolution)
/// - **self-checking** (a payload that breaks its invariants is never recorded)
pub trait Event: Clone + fmt::Debug + Send + Sync + 'static {
    /// Discriminator naming the payload variant.
    fn event_type(&self) -> EventType;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// Check every invariant of the payload.
    fn validate(&self) -> DomainResult<()>;
}

/// Discriminator for [`DocumentEvent`]. Serialized as the variant name
/// (e.g. `"DocumentIngested"`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventType {
    DocumentIngested,
    OcrCompleted,
    AiExtractionCompleted,
    ValidationCompleted,
    ManualReviewRequested,
    ManualCorrectionApplied,
    DocumentFinalized,
}

impl EventType {
    pub const fn as_str(self) -> &'static str {
        match self {
            EventType::DocumentIngested => "DocumentIngested",
            EventType::OcrCompleted => "OcrCompleted",
            EventType::AiExtractionCompleted => "AiExtractionCompleted",
            EventType::ValidationCompleted => "ValidationCompleted",
            EventType::ManualReviewRequested => "ManualReviewRequested",
            EventType::ManualCorrectionApplied => "ManualCorrectionApplied",
            EventType::DocumentFinalized => "DocumentFinalized",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of facts recorded about a document.
///
/// Serializes as the bare payload; the variant travels separately as the
/// envelope's `eventType`. Use [`DocumentEvent::from_json`] to go back.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentEvent {
    DocumentIngested(DocumentIngested),
    OcrCompleted(OcrCompleted),
    AiExtractionCompleted(AiExtractionCompleted),
    ValidationCompleted(ValidationCompleted),
    ManualReviewRequested(ManualReviewRequested),
    ManualCorrectionApplied(ManualCorrectionApplied),
    DocumentFinalized(DocumentFinalized),
}

impl DocumentEvent {
    /// Rebuild a payload from its JSON form, dispatching on `event_type`.
    ///
    /// The decoded payload is validated, so a malformed document never
    /// materializes as a `DocumentEvent`.
    pub fn from_json(event_type: EventType, payload: JsonValue) -> DomainResult<Self> {
        fn decode<T: serde::de::DeserializeOwned>(
            event_type: EventType,
            payload: JsonValue,
        ) -> DomainResult<T> {
            serde_json::from_value(payload).map_err(|e| {
                DomainError::invalid_payload(format!("{event_type} payload: {e}"))
            })
        }

        let event = match event_type {
            EventType::DocumentIngested => Self::DocumentIngested(decode(event_type, payload)?),
            EventType::OcrCompleted => Self::OcrCompleted(decode(event_type, payload)?),
            EventType::AiExtractionCompleted => {
                Self::AiExtractionCompleted(decode(event_type, payload)?)
            }
            EventType::ValidationCompleted => {
                Self::ValidationCompleted(decode(event_type, payload)?)
            }
            EventType::ManualReviewRequested => {
                Self::ManualReviewRequested(decode(event_type, payload)?)
            }
            EventType::ManualCorrectionApplied => {
                Self::ManualCorrectionApplied(decode(event_type, payload)?)
            }
            EventType::DocumentFinalized => Self::DocumentFinalized(decode(event_type, payload)?),
        };
        event.validate()?;
        Ok(event)
    }
}

impl Event for DocumentEvent {
    fn event_type(&self) -> EventType {
        match self {
            DocumentEvent::DocumentIngested(_) => EventType::DocumentIngested,
            DocumentEvent::OcrCompleted(_) => EventType::OcrCompleted,
            DocumentEvent::AiExtractionCompleted(_) => EventType::AiExtractionCompleted,
            DocumentEvent::ValidationCompleted(_) => EventType::ValidationCompleted,
            DocumentEvent::ManualReviewRequested(_) => EventType::ManualReviewRequested,
            DocumentEvent::ManualCorrectionApplied(_) => EventType::ManualCorrectionApplied,
            DocumentEvent::DocumentFinalized(_) => EventType::DocumentFinalized,
        }
    }

    fn version(&self) -> u32 {
        CURRENT_EVENT_VERSION
    }

    fn validate(&self) -> DomainResult<()> {
        match self {
            DocumentEvent::DocumentIngested(e) => e.validate(),
            DocumentEvent::OcrCompleted(e) => e.validate(),
            DocumentEvent::AiExtractionCompleted(e) => e.validate(),
            DocumentEvent::ValidationCompleted(e) => e.validate(),
            DocumentEvent::ManualReviewRequested(e) => e.validate(),
            DocumentEvent::ManualCorrectionApplied(e) => e.validate(),
            DocumentEvent::DocumentFinalized(e) => e.validate(),
        }
    }
}

impl Serialize for DocumentEvent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            DocumentEvent::DocumentIngested(e) => e.serialize(serializer),
            DocumentEvent::OcrCompleted(e) => e.serialize(serializer),
            DocumentEvent::AiExtractionCompleted(e) => e.serialize(serializer),
            DocumentEvent::ValidationCompleted(e) => e.serialize(serializer),
            DocumentEvent::ManualReviewRequested(e) => e.serialize(serializer),
            DocumentEvent::ManualCorrectionApplied(e) => e.serialize(serializer),
            DocumentEvent::DocumentFinalized(e) => e.serialize(serializer),
        }
    }
}

macro_rules! impl_from_payload {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for DocumentEvent {
                fn from(value: $variant) -> Self {
                    DocumentEvent::$variant(value)
                }
            }
        )*
    };
}

impl_from_payload!(
    DocumentIngested,
    OcrCompleted,
    AiExtractionCompleted,
    ValidationCompleted,
    ManualReviewRequested,
    ManualCorrectionApplied,
    DocumentFinalized,
);
