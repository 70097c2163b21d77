//! Field-level validation of extraction results.

use std::collections::HashMap;

use docflow_events::{FieldCandidate, ValidationCompleted};

use crate::config::Thresholds;

/// The computed validation outcome. It is recorded verbatim as the
/// `ValidationCompleted` payload.
pub type ValidationResult = ValidationCompleted;

pub const RULE_INVOICE_NUMBER_PRESENT: &str = "invoice_number_present";
pub const RULE_GROSS_AMOUNT_PRESENT: &str = "gross_amount_present";
pub const RULE_MIN_CONFIDENCE_TOO_LOW: &str = "min_confidence_too_low";

const REQUIRED_FIELDS: [(&str, &str); 2] = [
    ("invoice_number", RULE_INVOICE_NUMBER_PRESENT),
    ("gross_amount", RULE_GROSS_AMOUNT_PRESENT),
];

/// Lowest confidence across `fields`, `0.0` when there are none.
pub fn min_confidence(fields: &[FieldCandidate]) -> f64 {
    fields
        .iter()
        .map(FieldCandidate::confidence)
        .reduce(f64::min)
        .unwrap_or(0.0)
}

/// Scores a set of field candidates against required-field and confidence rules.
///
/// Pure and deterministic: the result depends only on the input fields and the
/// configured thresholds.
#[derive(Debug, Clone, Default)]
pub struct ValidationEngine {
    thresholds: Thresholds,
}

impl ValidationEngine {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn validate(&self, fields: &[FieldCandidate]) -> ValidationResult {
        // Last write wins on duplicate names.
        let by_name: HashMap<&str, &FieldCandidate> =
            fields.iter().map(|f| (f.name(), f)).collect();

        let mut failed_rules: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|(field, _)| !by_name.contains_key(field))
            .map(|(_, rule)| rule.to_string())
            .collect();

        let min_confidence = min_confidence(fields);
        let score = round4(mean_confidence(fields));

        if min_confidence < self.thresholds.retry_threshold {
            failed_rules.push(RULE_MIN_CONFIDENCE_TOO_LOW.to_string());
        }

        let requires_manual_review =
            !failed_rules.is_empty() || min_confidence < self.thresholds.auto_finalize_threshold;
        let is_valid = failed_rules.is_empty();

        tracing::debug!(
            fields = fields.len(),
            min_confidence,
            score,
            is_valid,
            requires_manual_review,
            "validated extraction fields"
        );

        ValidationCompleted {
            is_valid,
            failed_rules,
            score,
            requires_manual_review,
        }
    }
}

/// Mean confidence; an empty input counts as a single zero observation.
fn mean_confidence(fields: &[FieldCandidate]) -> f64 {
    if fields.is_empty() {
        return 0.0;
    }
    let total: f64 = fields.iter().map(FieldCandidate::confidence).sum();
    total / fields.len() as f64
}

/// Four decimal places, rounding the exact binary value with ties to even.
/// Scaling by 10^4 first would round `0.93504999...` up to `0.9351`.
fn round4(value: f64) -> f64 {
    format!("{value:.4}").parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn field(name: &str, confidence: f64) -> FieldCandidate {
        FieldCandidate::new(name, "x", confidence).unwrap()
    }

    #[test]
    fn confident_required_fields_pass_without_review() {
        let engine = ValidationEngine::default();
        let result = engine.validate(&[
            field("invoice_number", 0.95),
            field("gross_amount", 0.92),
        ]);

        assert!(result.is_valid);
        assert!(!result.requires_manual_review);
        assert!(result.failed_rules.is_empty());
        assert_eq!(result.score, 0.935);
    }

    #[test]
    fn score_rounds_the_exact_mean_not_the_scaled_one() {
        // The f64 mean of these is 0.93504999..., just under the half-way point.
        let result = ValidationEngine::default().validate(&[
            field("invoice_number", 0.95),
            field("gross_amount", 0.9201),
        ]);
        assert_eq!(result.score, 0.935);

        assert_eq!(round4(2.0 / 3.0), 0.6667);
        assert_eq!(round4(1.0 / 3.0), 0.3333);
        assert_eq!(round4(1.0), 1.0);
    }

    #[test]
    fn low_confidence_fails_rule_and_requires_review() {
        let engine = ValidationEngine::default();
        let result = engine.validate(&[
            field("invoice_number", 0.91),
            field("gross_amount", 0.62),
        ]);

        assert!(!result.is_valid);
        assert!(result.requires_manual_review);
        assert_eq!(result.failed_rules, vec![RULE_MIN_CONFIDENCE_TOO_LOW.to_string()]);
    }

    #[test]
    fn valid_but_below_auto_finalize_still_requires_review() {
        let engine = ValidationEngine::default();
        let result = engine.validate(&[
            field("invoice_number", 0.85),
            field("gross_amount", 0.95),
        ]);

        assert!(result.is_valid);
        assert!(result.requires_manual_review);
    }

    #[test]
    fn missing_required_fields_are_reported_in_order() {
        let engine = ValidationEngine::default();
        let result = engine.validate(&[field("vendor_name", 0.99)]);

        assert!(!result.is_valid);
        assert_eq!(
            result.failed_rules,
            vec![
                RULE_INVOICE_NUMBER_PRESENT.to_string(),
                RULE_GROSS_AMOUNT_PRESENT.to_string(),
            ]
        );
    }

    #[test]
    fn empty_input_scores_zero_and_fails_everything() {
        let engine = ValidationEngine::default();
        let result = engine.validate(&[]);

        assert_eq!(result.score, 0.0);
        assert!(result.requires_manual_review);
        assert_eq!(
            result.failed_rules,
            vec![
                RULE_INVOICE_NUMBER_PRESENT.to_string(),
                RULE_GROSS_AMOUNT_PRESENT.to_string(),
                RULE_MIN_CONFIDENCE_TOO_LOW.to_string(),
            ]
        );
    }

    #[test]
    fn duplicate_names_count_once_for_presence_but_all_for_confidence() {
        let engine = ValidationEngine::default();
        let result = engine.validate(&[
            field("invoice_number", 0.40),
            field("invoice_number", 0.99),
            field("gross_amount", 0.99),
        ]);

        assert_eq!(result.failed_rules, vec![RULE_MIN_CONFIDENCE_TOO_LOW.to_string()]);
    }

    #[test]
    fn custom_thresholds_are_honoured() {
        let engine = ValidationEngine::new(Thresholds {
            auto_finalize_threshold: 0.80,
            retry_threshold: 0.50,
        });
        let result = engine.validate(&[
            field("invoice_number", 0.85),
            field("gross_amount", 0.81),
        ]);

        assert!(result.is_valid);
        assert!(!result.requires_manual_review);
    }

    #[test]
    fn min_confidence_defaults_to_zero() {
        assert_eq!(min_confidence(&[]), 0.0);
        assert_eq!(min_confidence(&[field("a", 0.3), field("b", 0.2)]), 0.2);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: the score is always a valid payload score and the
        /// review flag is implied by any failed rule.
        #[test]
        fn score_in_unit_interval_and_failures_imply_review(
            confidences in prop::collection::vec(0.0f64..=1.0f64, 0..12)
        ) {
            let fields: Vec<FieldCandidate> = confidences
                .iter()
                .enumerate()
                .map(|(i, c)| field(&format!("f{i}"), *c))
                .collect();
            let result = ValidationEngine::default().validate(&fields);

            prop_assert!((0.0..=1.0).contains(&result.score));
            prop_assert!(result.validate().is_ok());
            prop_assert_eq!(result.is_valid, result.failed_rules.is_empty());
            if !result.is_valid {
                prop_assert!(result.requires_manual_review);
            }
        }
    }
}
