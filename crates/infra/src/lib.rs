//! Infrastructure layer: event log backends, configuration and the
//! pipeline orchestrator that ties the pure engines to a log.

pub mod config;
pub mod event_log;
pub mod orchestrator;
pub mod replay;


pub use config::PipelineConfig;
pub use event_log::{EventLog, EventLogError, InMemoryEventLog};
pub use orchestrator::{
    CorrectionApplied, DocumentPipelineService, ExtractionOutcome, ExtractionProcessed,
    PipelineError, RunOutcome,
};
pub use replay::load_state;
