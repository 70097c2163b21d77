//! Pipeline configuration loading and representation.
//!
//! Values come from the environment (`DOCFLOW_*`). Anything unset falls back
//! to the default; anything unparsable falls back too, with a warning.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use docflow_core::DomainResult;
use docflow_pipeline::ProcessingPolicy;

pub const ENV_AUTO_FINALIZE_THRESHOLD: &str = "DOCFLOW_AUTO_FINALIZE_THRESHOLD";
pub const ENV_RETRY_THRESHOLD: &str = "DOCFLOW_RETRY_THRESHOLD";
pub const ENV_MAX_AI_ATTEMPTS: &str = "DOCFLOW_MAX_AI_ATTEMPTS";
pub const ENV_HARD_COST_CAP_USD: &str = "DOCFLOW_HARD_COST_CAP_USD";
pub const ENV_STORAGE_URI_PREFIX: &str = "DOCFLOW_STORAGE_URI_PREFIX";
pub const ENV_FINAL_JSON_URI_PREFIX: &str = "DOCFLOW_FINAL_JSON_URI_PREFIX";

/// Configuration of a [`crate::DocumentPipelineService`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    pub policy: ProcessingPolicy,
    /// Recorded as `DocumentIngested.source`.
    pub source: String,
    /// Recorded as `DocumentIngested.mimeType`.
    pub mime_type: String,
    /// Raw uploads and provider outputs live under `<prefix>/<documentId>/`.
    pub storage_uri_prefix: String,
    /// Final JSON documents live under `<prefix>/<documentId>/final.json`.
    pub final_json_uri_prefix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            policy: ProcessingPolicy::default(),
            source: "api".to_string(),
            mime_type: "application/pdf".to_string(),
            storage_uri_prefix: "s3://documents/raw".to_string(),
            final_json_uri_prefix: "s3://documents/final".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load from the process environment.
    pub fn from_env() -> DomainResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (the environment, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> DomainResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let policy = ProcessingPolicy {
            auto_finalize_threshold: parse_or(
                &lookup,
                ENV_AUTO_FINALIZE_THRESHOLD,
                defaults.policy.auto_finalize_threshold,
            ),
            retry_threshold: parse_or(&lookup, ENV_RETRY_THRESHOLD, defaults.policy.retry_threshold),
            max_ai_attempts: parse_or(&lookup, ENV_MAX_AI_ATTEMPTS, defaults.policy.max_ai_attempts),
            hard_cost_cap_usd: parse_or(
                &lookup,
                ENV_HARD_COST_CAP_USD,
                defaults.policy.hard_cost_cap_usd,
            ),
        };

        let config = Self {
            policy,
            storage_uri_prefix: lookup(ENV_STORAGE_URI_PREFIX)
                .unwrap_or(defaults.storage_uri_prefix),
            final_json_uri_prefix: lookup(ENV_FINAL_JSON_URI_PREFIX)
                .unwrap_or(defaults.final_json_uri_prefix),
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DomainResult<()> {
        self.policy.validate()
    }

    pub(crate) fn storage_uri(&self, document_id: impl core::fmt::Display, name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.storage_uri_prefix.trim_end_matches('/'),
            document_id,
            name
        )
    }

    pub(crate) fn final_json_uri(&self, document_id: impl core::fmt::Display) -> String {
        format!(
            "{}/{}/final.json",
            self.final_json_uri_prefix.trim_end_matches('/'),
            document_id
        )
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: core::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(key, value = %raw, error = %e, "ignoring unparsable setting");
                default
            }
        },
    }
}
