//! Payload shapes for every fact the document workflow records.
//!
//! Payloads are plain data with public fields. Each one knows how to check its
//! own invariants (`validate`), and the constructors that take numeric input
//! run those checks eagerly.

use serde::{Deserialize, Serialize};

use docflow_core::{DomainError, DomainResult, guard};

/// One extracted field as proposed by an upstream extraction provider.
///
/// Fields are private: the only way to obtain a candidate is through
/// [`FieldCandidate::new`] (or deserialization, which goes through the same
/// check), so `confidence` is always within `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FieldCandidateRepr")]
pub struct FieldCandidate {
    name: String,
    value: String,
    confidence: f64,
}

#[derive(Deserialize)]
struct FieldCandidateRepr {
    name: String,
    value: String,
    confidence: f64,
}

impl TryFrom<FieldCandidateRepr> for FieldCandidate {
    type Error = DomainError;

    fn try_from(raw: FieldCandidateRepr) -> Result<Self, Self::Error> {
        FieldCandidate::new(raw.name, raw.value, raw.confidence)
    }
}

impl FieldCandidate {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        confidence: f64,
    ) -> DomainResult<Self> {
        let name = name.into();
        guard::non_empty(&name, "field name")?;
        guard::unit_interval(confidence, &format!("field:{name}"))?;
        Ok(Self {
            name,
            value: value.into(),
            confidence,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

/// A single human correction of an extracted value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectedField {
    pub name: String,
    pub old_value: String,
    pub new_value: String,
    pub reason: String,
}

impl CorrectedField {
    pub fn new(
        name: impl Into<String>,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
        reason: impl Into<String>,
    ) -> DomainResult<Self> {
        let field = Self {
            name: name.into(),
            old_value: old_value.into(),
            new_value: new_value.into(),
            reason: reason.into(),
        };
        field.validate()?;
        Ok(field)
    }

    pub fn validate(&self) -> DomainResult<()> {
        guard::non_empty(&self.name, "correctedField.name")
    }
}

/// Label recorded on finalization: automatic vs human-approved completion.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityGate {
    Auto,
    Manual,
}

/// Event: DocumentIngested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentIngested {
    pub source: String,
    pub file_name: String,
    pub mime_type: String,
    pub storage_uri: String,
    pub uploaded_by: String,
}

impl DocumentIngested {
    pub fn validate(&self) -> DomainResult<()> {
        guard::non_empty(&self.file_name, "fileName")?;
        guard::non_empty(&self.uploaded_by, "uploadedBy")
    }
}

/// Event: OcrCompleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrCompleted {
    pub provider: String,
    pub language: String,
    pub pages: u32,
    pub text_uri: String,
    pub avg_confidence: f64,
}

impl OcrCompleted {
    pub fn new(
        provider: impl Into<String>,
        language: impl Into<String>,
        pages: u32,
        text_uri: impl Into<String>,
        avg_confidence: f64,
    ) -> DomainResult<Self> {
        let payload = Self {
            provider: provider.into(),
            language: language.into(),
            pages,
            text_uri: text_uri.into(),
            avg_confidence,
        };
        payload.validate()?;
        Ok(payload)
    }

    pub fn validate(&self) -> DomainResult<()> {
        guard::non_empty(&self.provider, "provider")?;
        guard::positive(self.pages, "pages")?;
        guard::unit_interval(self.avg_confidence, "avgConfidence")
    }
}

/// Event: AiExtractionCompleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiExtractionCompleted {
    pub provider: String,
    pub model: String,
    pub attempt: u32,
    pub raw_output_uri: String,
    pub fields: Vec<FieldCandidate>,
    pub estimated_cost_usd: f64,
}

impl AiExtractionCompleted {
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        attempt: u32,
        raw_output_uri: impl Into<String>,
        fields: Vec<FieldCandidate>,
        estimated_cost_usd: f64,
    ) -> DomainResult<Self> {
        let payload = Self {
            provider: provider.into(),
            model: model.into(),
            attempt,
            raw_output_uri: raw_output_uri.into(),
            fields,
            estimated_cost_usd,
        };
        payload.validate()?;
        Ok(payload)
    }

    pub fn validate(&self) -> DomainResult<()> {
        guard::non_empty(&self.provider, "provider")?;
        guard::non_empty(&self.model, "model")?;
        guard::positive(self.attempt, "attempt")?;
        guard::non_negative(self.estimated_cost_usd, "estimatedCostUsd")?;
        for field in &self.fields {
            guard::unit_interval(field.confidence(), &format!("field:{}", field.name()))?;
        }
        Ok(())
    }
}

/// Event: ValidationCompleted.
///
/// Also the value the validation engine computes; there is no separate
/// in-memory result type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationCompleted {
    pub is_valid: bool,
    /// Rule identifiers in the order they failed. Never contains duplicates.
    pub failed_rules: Vec<String>,
    pub score: f64,
    pub requires_manual_review: bool,
}

impl ValidationCompleted {
    pub fn new(
        is_valid: bool,
        failed_rules: Vec<String>,
        score: f64,
        requires_manual_review: bool,
    ) -> DomainResult<Self> {
        let payload = Self {
            is_valid,
            failed_rules,
            score,
            requires_manual_review,
        };
        payload.validate()?;
        Ok(payload)
    }

    pub fn validate(&self) -> DomainResult<()> {
        guard::unit_interval(self.score, "score")
    }
}

/// Event: ManualReviewRequested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualReviewRequested {
    pub reason: String,
}

impl ManualReviewRequested {
    pub fn validate(&self) -> DomainResult<()> {
        guard::non_empty(&self.reason, "reason")
    }
}

/// Event: ManualCorrectionApplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualCorrectionApplied {
    pub reviewer: String,
    pub corrected_fields: Vec<CorrectedField>,
    pub comment: String,
}

impl ManualCorrectionApplied {
    pub fn validate(&self) -> DomainResult<()> {
        guard::non_empty(&self.reviewer, "reviewer")?;
        self.corrected_fields
            .iter()
            .try_for_each(CorrectedField::validate)
    }
}

/// Event: DocumentFinalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFinalized {
    pub final_json_uri: String,
    pub finalized_by: String,
    pub quality_gate: QualityGate,
}

impl DocumentFinalized {
    pub fn validate(&self) -> DomainResult<()> {
        guard::non_empty(&self.finalized_by, "finalizedBy")
    }
}
