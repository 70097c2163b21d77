//! Next-step decision table for a completed extraction.

use serde::{Deserialize, Serialize};

use docflow_events::{AiExtractionCompleted, ValidationCompleted};

use crate::config::ProcessingPolicy;
use crate::validation::min_confidence;

/// Recommended next workflow step.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextStep {
    RetryWithFallbackModel,
    RequestManualReview,
    FinalizeAutomatically,
}

/// Decide the next step for an extraction and its validation outcome.
///
/// Rules are evaluated in order and the first match wins:
///
/// 1. cost above the hard cap → manual review, regardless of anything else
/// 2. validation failed or wants review → retry if attempts remain and the
///    weakest field clears the retry threshold, otherwise manual review
/// 3. weakest field and score both clear auto-finalize → finalize
/// 4. attempts remain and weakest field clears retry → retry
/// 5. manual review
pub fn decide_next_step(
    extraction: &AiExtractionCompleted,
    validation: &ValidationCompleted,
    policy: &ProcessingPolicy,
) -> NextStep {
    if extraction.estimated_cost_usd > policy.hard_cost_cap_usd {
        return NextStep::RequestManualReview;
    }

    let min_confidence = min_confidence(&extraction.fields);
    let can_retry =
        extraction.attempt < policy.max_ai_attempts && min_confidence >= policy.retry_threshold;

    if validation.requires_manual_review || !validation.is_valid {
        return if can_retry {
            NextStep::RetryWithFallbackModel
        } else {
            NextStep::RequestManualReview
        };
    }

    if min_confidence >= policy.auto_finalize_threshold
        && validation.score >= policy.auto_finalize_threshold
    {
        return NextStep::FinalizeAutomatically;
    }

    if can_retry {
        NextStep::RetryWithFallbackModel
    } else {
        NextStep::RequestManualReview
    }
}

/// [`decide_next_step`] bound to one policy value.
#[derive(Debug, Clone, Default)]
pub struct PolicyEngine {
    policy: ProcessingPolicy,
}

impl PolicyEngine {
    pub fn new(policy: ProcessingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ProcessingPolicy {
        &self.policy
    }

    pub fn decide(
        &self,
        extraction: &AiExtractionCompleted,
        validation: &ValidationCompleted,
    ) -> NextStep {
        let step = decide_next_step(extraction, validation, &self.policy);
        tracing::debug!(
            attempt = extraction.attempt,
            estimated_cost_usd = extraction.estimated_cost_usd,
            score = validation.score,
            ?step,
            "policy decision"
        );
        step
    }
}
