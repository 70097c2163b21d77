//! Document workflow events: payloads, the envelope that records them, and the
//! fold abstraction read models are built with.

pub mod envelope;
pub mod event;
pub mod payload;
pub mod projection;

pub use envelope::{CURRENT_EVENT_VERSION, EventEnvelope};
pub use event::{DocumentEvent, Event, EventType};
pub use payload::{
    AiExtractionCompleted, CorrectedField, DocumentFinalized, DocumentIngested, FieldCandidate,
    ManualCorrectionApplied, ManualReviewRequested, OcrCompleted, QualityGate,
    ValidationCompleted,
};
pub use projection::Projection;
