//! Threshold configuration for the validation and policy engines.
//!
//! Both types are immutable values passed into the engines explicitly; there
//! is no process-wide default besides `Default::default()`.

use serde::{Deserialize, Serialize};

use docflow_core::{DomainError, DomainResult, guard};

/// Confidence thresholds shared by validation and policy decisions.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    /// Minimum confidence for a document to skip human review.
    pub auto_finalize_threshold: f64,
    /// Minimum confidence for a fallback-model retry to be worthwhile.
    pub retry_threshold: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            auto_finalize_threshold: 0.90,
            retry_threshold: 0.70,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> DomainResult<()> {
        guard::unit_interval(self.auto_finalize_threshold, "autoFinalizeThreshold")?;
        guard::unit_interval(self.retry_threshold, "retryThreshold")
    }
}

/// Full decision table configuration for [`crate::decide_next_step`].
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingPolicy {
    pub auto_finalize_threshold: f64,
    pub retry_threshold: f64,
    pub max_ai_attempts: u32,
    pub hard_cost_cap_usd: f64,
}

impl Default for ProcessingPolicy {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        Self {
            auto_finalize_threshold: thresholds.auto_finalize_threshold,
            retry_threshold: thresholds.retry_threshold,
            max_ai_attempts: 3,
            hard_cost_cap_usd: 0.10,
        }
    }
}

impl ProcessingPolicy {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            auto_finalize_threshold: self.auto_finalize_threshold,
            retry_threshold: self.retry_threshold,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        self.thresholds().validate()?;
        guard::positive(self.max_ai_attempts, "maxAiAttempts")?;
        guard::non_negative(self.hard_cost_cap_usd, "hardCostCapUsd")?;
        if self.retry_threshold > self.auto_finalize_threshold {
            return Err(DomainError::invalid_payload(
                "retryThreshold must not exceed autoFinalizeThreshold",
            ));
        }
        Ok(())
    }
}
