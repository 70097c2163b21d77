//! Document pipeline orchestration (application-level coordination).
//!
//! The orchestrator turns workflow triggers into recorded facts. It consults
//! the pure engines, builds envelopes with the right causal links and appends
//! them to the injected [`EventLog`].
//!
//! ```text
//! ingest ──▶ DocumentIngested                          (new correlation scope)
//!
//! process_extraction ──▶ AiExtractionCompleted         (root of the sub-run)
//!                          └─▶ ValidationCompleted
//!                                ├─▶ ManualReviewRequested   (review required)
//!                                └─▶ DocumentFinalized{auto} (otherwise)
//!
//! apply_manual_correction ──▶ ManualCorrectionApplied
//!                               └─▶ DocumentFinalized{manual}
//! ```
//!
//! ## Retry is the caller's decision
//!
//! `process_extraction` records terminal per-call outcomes only. It never
//! runs the policy engine itself. A workflow driver that wants fallback
//! retries calls [`DocumentPipelineService::recommend_next_step`] and, on
//! [`NextStep::RetryWithFallbackModel`], invokes `process_extraction` again
//! with `attempt + 1`.
//!
//! ## Failure semantics
//!
//! Every envelope of a call is constructed before anything is appended, so a
//! construction error leaves the log untouched. Errors are surfaced to the
//! caller unmodified; there is no silent recovery and no automatic retry.
//! Invocations for one document are expected to be serialized by the caller.

use thiserror::Error;

use docflow_core::{CorrelationId, DocumentId, DomainError, EventId};
use docflow_events::{
    AiExtractionCompleted, CorrectedField, DocumentEvent, DocumentFinalized, DocumentIngested,
    EventEnvelope, FieldCandidate, ManualCorrectionApplied, ManualReviewRequested, OcrCompleted,
    QualityGate,
};
use docflow_pipeline::{
    DocumentState, NextStep, PolicyEngine, ValidationEngine, ValidationResult,
};

use crate::config::PipelineConfig;
use crate::event_log::{EventLog, EventLogError};
use crate::replay::load_state;

/// Reason recorded on `ManualReviewRequested` by automatic routing.
pub const REVIEW_REASON_VALIDATION_POLICY: &str = "validation_or_confidence_policy";

/// `finalizedBy` recorded on automatic finalization.
pub const SYSTEM_ACTOR: &str = "system";

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A payload or envelope could not be constructed. Nothing was appended.
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// The event log backend failed.
    #[error(transparent)]
    Log(#[from] EventLogError),
}

/// Outcome reported by an upstream extraction provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    pub provider: String,
    pub model: String,
    pub attempt: u32,
    pub fields: Vec<FieldCandidate>,
    /// Where the provider's raw output was stored. Derived from the storage
    /// prefix when absent.
    pub raw_output_uri: Option<String>,
    pub estimated_cost_usd: f64,
}

impl ExtractionOutcome {
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        attempt: u32,
        fields: Vec<FieldCandidate>,
        estimated_cost_usd: f64,
    ) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            attempt,
            fields,
            raw_output_uri: None,
            estimated_cost_usd,
        }
    }

    pub fn with_raw_output_uri(mut self, uri: impl Into<String>) -> Self {
        self.raw_output_uri = Some(uri.into());
        self
    }
}

/// How a `process_extraction` call ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    ManualReviewRequested,
    Finalized,
}

/// Everything recorded by one `process_extraction` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionProcessed {
    pub extraction_event_id: EventId,
    pub validation_event_id: EventId,
    pub terminal_event_id: EventId,
    pub validation: ValidationResult,
    pub outcome: RunOutcome,
}

/// Everything recorded by one `apply_manual_correction` call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CorrectionApplied {
    pub correction_event_id: EventId,
    pub finalized_event_id: EventId,
}

/// Stateful coordinator of the document workflow.
///
/// Holds no document state of its own: the log is the only authority. The
/// engines are immutable values built from the configuration.
#[derive(Debug)]
pub struct DocumentPipelineService<L> {
    log: L,
    config: PipelineConfig,
    validation: ValidationEngine,
    policy: PolicyEngine,
}

impl<L> DocumentPipelineService<L>
where
    L: EventLog,
{
    pub fn new(log: L, config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self::assemble(log, config))
    }

    pub fn with_defaults(log: L) -> Self {
        Self::assemble(log, PipelineConfig::default())
    }

    /// Engines are derived from `config` here only.
    fn assemble(log: L, config: PipelineConfig) -> Self {
        Self {
            validation: ValidationEngine::new(config.policy.thresholds()),
            policy: PolicyEngine::new(config.policy),
            log,
            config,
        }
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Record a new upload and open a correlation scope for its run.
    pub fn ingest(
        &self,
        document_id: DocumentId,
        file_name: &str,
        uploaded_by: &str,
    ) -> Result<CorrelationId, PipelineError> {
        let correlation_id = CorrelationId::new();
        let payload = DocumentIngested {
            source: self.config.source.clone(),
            file_name: file_name.to_string(),
            mime_type: self.config.mime_type.clone(),
            storage_uri: self.config.storage_uri(document_id, file_name),
            uploaded_by: uploaded_by.to_string(),
        };
        let envelope = EventEnvelope::record(document_id, correlation_id, None, payload)?;
        self.append_all(vec![envelope])?;

        tracing::info!(
            %document_id,
            %correlation_id,
            file_name,
            uploaded_by,
            "document ingested"
        );
        Ok(correlation_id)
    }

    /// Record a completed OCR pass. It is the root of its own sub-run.
    pub fn record_ocr(
        &self,
        document_id: DocumentId,
        correlation_id: CorrelationId,
        ocr: OcrCompleted,
    ) -> Result<EventId, PipelineError> {
        let envelope = EventEnvelope::record(document_id, correlation_id, None, ocr)?;
        let event_id = envelope.event_id();
        self.append_all(vec![envelope])?;

        tracing::info!(%document_id, %correlation_id, %event_id, "ocr recorded");
        Ok(event_id)
    }

    /// Record an extraction, validate it and record the terminal outcome of
    /// this call: manual review when validation asks for it, automatic
    /// finalization otherwise.
    pub fn process_extraction(
        &self,
        document_id: DocumentId,
        correlation_id: CorrelationId,
        extraction: ExtractionOutcome,
    ) -> Result<ExtractionProcessed, PipelineError> {
        let raw_output_uri = extraction.raw_output_uri.unwrap_or_else(|| {
            self.config.storage_uri(
                document_id,
                &format!("ai-output-attempt-{}.json", extraction.attempt),
            )
        });
        let payload = AiExtractionCompleted::new(
            extraction.provider,
            extraction.model,
            extraction.attempt,
            raw_output_uri,
            extraction.fields,
            extraction.estimated_cost_usd,
        )?;

        let validation = self.validation.validate(&payload.fields);
        let attempt = payload.attempt;

        let extraction_env = EventEnvelope::record(document_id, correlation_id, None, payload)?;
        let validation_env = EventEnvelope::record(
            document_id,
            correlation_id,
            Some(extraction_env.event_id()),
            validation.clone(),
        )?;

        let (terminal, outcome): (DocumentEvent, RunOutcome) = if validation.requires_manual_review
        {
            (
                ManualReviewRequested {
                    reason: REVIEW_REASON_VALIDATION_POLICY.to_string(),
                }
                .into(),
                RunOutcome::ManualReviewRequested,
            )
        } else {
            (
                DocumentFinalized {
                    final_json_uri: self.config.final_json_uri(document_id),
                    finalized_by: SYSTEM_ACTOR.to_string(),
                    quality_gate: QualityGate::Auto,
                }
                .into(),
                RunOutcome::Finalized,
            )
        };
        let terminal_env = EventEnvelope::record(
            document_id,
            correlation_id,
            Some(validation_env.event_id()),
            terminal,
        )?;

        let processed = ExtractionProcessed {
            extraction_event_id: extraction_env.event_id(),
            validation_event_id: validation_env.event_id(),
            terminal_event_id: terminal_env.event_id(),
            validation,
            outcome,
        };
        self.append_all(vec![extraction_env, validation_env, terminal_env])?;

        tracing::info!(
            %document_id,
            %correlation_id,
            attempt,
            score = processed.validation.score,
            failed_rules = ?processed.validation.failed_rules,
            outcome = ?processed.outcome,
            "extraction processed"
        );
        Ok(processed)
    }

    /// Record a human correction and finalize the document. Always terminal:
    /// there is no re-validation after a human correction.
    pub fn apply_manual_correction(
        &self,
        document_id: DocumentId,
        correlation_id: CorrelationId,
        reviewer: &str,
        corrected_fields: Vec<CorrectedField>,
        comment: &str,
    ) -> Result<CorrectionApplied, PipelineError> {
        let correction = ManualCorrectionApplied {
            reviewer: reviewer.to_string(),
            corrected_fields,
            comment: comment.to_string(),
        };
        let corrections = correction.corrected_fields.len();
        let correction_env = EventEnvelope::record(document_id, correlation_id, None, correction)?;
        let finalized_env = EventEnvelope::record(
            document_id,
            correlation_id,
            Some(correction_env.event_id()),
            DocumentFinalized {
                final_json_uri: self.config.final_json_uri(document_id),
                finalized_by: reviewer.to_string(),
                quality_gate: QualityGate::Manual,
            },
        )?;

        let applied = CorrectionApplied {
            correction_event_id: correction_env.event_id(),
            finalized_event_id: finalized_env.event_id(),
        };
        self.append_all(vec![correction_env, finalized_env])?;

        tracing::info!(
            %document_id,
            %correlation_id,
            reviewer,
            corrections,
            "manual correction applied"
        );
        Ok(applied)
    }

    /// Consult the policy engine about the latest extraction of a document.
    ///
    /// Read-only. Returns `None` when the document has no extraction with a
    /// matching validation yet.
    pub fn recommend_next_step(
        &self,
        document_id: DocumentId,
    ) -> Result<Option<NextStep>, PipelineError> {
        let stream = self.log.replay(document_id)?;

        let Some((extraction_id, extraction)) =
            stream.iter().rev().find_map(|e| match e.payload() {
                DocumentEvent::AiExtractionCompleted(x) => Some((e.event_id(), x)),
                _ => None,
            })
        else {
            return Ok(None);
        };

        let validation = stream.iter().find_map(|e| match e.payload() {
            DocumentEvent::ValidationCompleted(v) if e.causation_id() == Some(extraction_id) => {
                Some(v)
            }
            _ => None,
        });

        Ok(validation.map(|v| self.policy.decide(extraction, v)))
    }

    /// Current state of a document, folded from its full stream.
    pub fn load_state(&self, document_id: DocumentId) -> Result<DocumentState, PipelineError> {
        Ok(load_state(&self.log, document_id)?)
    }

    fn append_all(&self, envelopes: Vec<EventEnvelope>) -> Result<(), PipelineError> {
        let ids: Vec<(EventId, &'static str)> = envelopes
            .iter()
            .map(|e| (e.event_id(), e.event_type().as_str()))
            .collect();
        let outcomes = self.log.append_all(envelopes)?;
        for ((event_id, event_type), recorded) in ids.into_iter().zip(outcomes) {
            if recorded {
                tracing::debug!(%event_id, event_type, "event appended");
            } else {
                tracing::debug!(%event_id, event_type, "event already recorded");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log::InMemoryEventLog;
    use docflow_events::EventType;

    fn service() -> DocumentPipelineService<InMemoryEventLog> {
        DocumentPipelineService::with_defaults(InMemoryEventLog::new())
    }

    fn field(name: &str, value: &str, confidence: f64) -> FieldCandidate {
        FieldCandidate::new(name, value, confidence).unwrap()
    }

    #[test]
    fn ingest_records_defaults_from_config() {
        let svc = service();
        let doc = DocumentId::new();
        let corr = svc.ingest(doc, "invoice.pdf", "user@example.com").unwrap();

        let stream = svc.log().load_stream(doc).unwrap();
        assert_eq!(stream.len(), 1);
        assert_eq!(stream[0].correlation_id(), corr);
        assert_eq!(stream[0].causation_id(), None);
        match stream[0].payload() {
            DocumentEvent::DocumentIngested(e) => {
                assert_eq!(e.source, "api");
                assert_eq!(e.mime_type, "application/pdf");
                assert_eq!(e.storage_uri, format!("s3://documents/raw/{doc}/invoice.pdf"));
            }
            other => panic!("Expected DocumentIngested, got {other:?}"),
        }
    }

    #[test]
    fn each_ingest_opens_a_new_correlation_scope() {
        let svc = service();
        let doc = DocumentId::new();
        let first = svc.ingest(doc, "invoice.pdf", "user@example.com").unwrap();
        let second = svc.ingest(doc, "invoice.pdf", "user@example.com").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn invalid_extraction_appends_nothing() {
        let svc = service();
        let doc = DocumentId::new();
        let corr = CorrelationId::new();

        let err = svc
            .process_extraction(
                doc,
                corr,
                ExtractionOutcome::new("openai", "gpt-4.1", 0, vec![], 0.0),
            )
            .unwrap_err();
        assert!(matches!(err, PipelineError::Domain(DomainError::InvalidPayload(_))));

        let err = svc
            .process_extraction(
                doc,
                corr,
                ExtractionOutcome::new("openai", "gpt-4.1", 1, vec![], -1.0),
            )
            .unwrap_err();
        assert!(matches!(err, PipelineError::Domain(_)));
        assert!(svc.log().load_stream(doc).unwrap().is_empty());
    }

    #[test]
    fn blank_reviewer_is_rejected_before_append() {
        let svc = service();
        let doc = DocumentId::new();
        let res = svc.apply_manual_correction(doc, CorrelationId::new(), "", vec![], "");
        assert!(res.is_err());
        assert!(svc.log().load_stream(doc).unwrap().is_empty());
    }

    #[test]
    fn raw_output_uri_defaults_per_attempt() {
        let svc = service();
        let doc = DocumentId::new();
        svc.process_extraction(
            doc,
            CorrelationId::new(),
            ExtractionOutcome::new(
                "openai",
                "gpt-4.1",
                2,
                vec![field("invoice_number", "1", 0.9)],
                0.0,
            ),
        )
        .unwrap();

        let stream = svc.log().load_stream(doc).unwrap();
        match stream[0].payload() {
            DocumentEvent::AiExtractionCompleted(e) => assert_eq!(
                e.raw_output_uri,
                format!("s3://documents/raw/{doc}/ai-output-attempt-2.json")
            ),
            other => panic!("Expected AiExtractionCompleted, got {other:?}"),
        }
    }

    #[test]
    fn record_ocr_appends_root_event() {
        let svc = service();
        let doc = DocumentId::new();
        let corr = svc.ingest(doc, "invoice.pdf", "user@example.com").unwrap();
        let ocr = OcrCompleted::new("tesseract", "pl", 2, "s3://ocr/doc.txt", 0.93).unwrap();

        let id = svc.record_ocr(doc, corr, ocr).unwrap();

        let stream = svc.log().load_stream(doc).unwrap();
        assert_eq!(stream[1].event_id(), id);
        assert_eq!(stream[1].event_type(), EventType::OcrCompleted);
        assert_eq!(stream[1].causation_id(), None);
    }

    #[test]
    fn recommend_next_step_is_none_without_extraction() {
        let svc = service();
        let doc = DocumentId::new();
        svc.ingest(doc, "invoice.pdf", "user@example.com").unwrap();
        assert_eq!(svc.recommend_next_step(doc).unwrap(), None);
    }

    #[test]
    fn rejects_invalid_configuration() {
        let config = PipelineConfig {
            policy: docflow_pipeline::ProcessingPolicy {
                retry_threshold: 2.0,
                ..Default::default()
            },
            ..PipelineConfig::default()
        };
        assert!(DocumentPipelineService::new(InMemoryEventLog::new(), config).is_err());
    }

    #[test]
    fn extraction_cost_is_recorded_and_capped() {
        let svc = service();
        let doc = DocumentId::new();
        svc.process_extraction(
            doc,
            CorrelationId::new(),
            ExtractionOutcome::new(
                "openai",
                "gpt-4.1",
                1,
                vec![
                    field("invoice_number", "FV/1", 0.99),
                    field("gross_amount", "10.00", 0.99),
                ],
                0.25,
            ),
        )
        .unwrap();

        let stream = svc.log().load_stream(doc).unwrap();
        match stream[0].payload() {
            DocumentEvent::AiExtractionCompleted(e) => assert_eq!(e.estimated_cost_usd, 0.25),
            other => panic!("Expected AiExtractionCompleted, got {other:?}"),
        }
        assert_eq!(
            svc.recommend_next_step(doc).unwrap(),
            Some(NextStep::RequestManualReview)
        );
    }

    #[test]
    fn engines_follow_the_supplied_configuration() {
        let config = PipelineConfig {
            policy: docflow_pipeline::ProcessingPolicy {
                auto_finalize_threshold: 0.80,
                retry_threshold: 0.50,
                max_ai_attempts: 3,
                hard_cost_cap_usd: 0.05,
            },
            ..PipelineConfig::default()
        };
        let custom = DocumentPipelineService::new(InMemoryEventLog::new(), config).unwrap();
        let defaults = service();
        let extraction = || {
            ExtractionOutcome::new(
                "openai",
                "gpt-4.1",
                1,
                vec![
                    field("invoice_number", "FV/1", 0.85),
                    field("gross_amount", "10.00", 0.85),
                ],
                0.06,
            )
        };

        let doc = DocumentId::new();
        let run = custom
            .process_extraction(doc, CorrelationId::new(), extraction())
            .unwrap();
        assert_eq!(run.outcome, RunOutcome::Finalized);
        assert_eq!(
            custom.recommend_next_step(doc).unwrap(),
            Some(NextStep::RequestManualReview)
        );

        let doc = DocumentId::new();
        let run = defaults
            .process_extraction(doc, CorrelationId::new(), extraction())
            .unwrap();
        assert_eq!(run.outcome, RunOutcome::ManualReviewRequested);
        assert_eq!(
            defaults.recommend_next_step(doc).unwrap(),
            Some(NextStep::RetryWithFallbackModel)
        );
    }
}
