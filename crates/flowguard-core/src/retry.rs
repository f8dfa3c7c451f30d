//! Effective retry policy computation.
//!
//! A policy starts from the caller's [`RetryOptions`] (or the base defaults),
//! is biased by the declared [`CriticalityLevel`], and on resume is tuned
//! further by the categories of the prior attempt's failure.
//!
//! ```text
//! options/defaults ─► criticality ─► error categories ─► RetryPolicy
//! ```

use std::collections::BTreeSet;

use flowguard_types::retry::{CriticalityLevel, ErrorCategory, RetryOptions, RetryPolicy};

use crate::classifier::ErrorClassifier;

/// Ceiling for the initial interval after a transient/connection adjustment.
pub const TRANSIENT_INITIAL_INTERVAL_CAP_MS: u64 = 5_000;
/// Ceiling for the maximum interval after a resource adjustment.
pub const RESOURCE_MAXIMUM_INTERVAL_CAP_MS: u64 = 300_000;
/// Ceiling for the backoff coefficient after a resource adjustment.
pub const RESOURCE_BACKOFF_CAP: f64 = 3.0;

// ---------------------------------------------------------------------------
// RetryPolicyEngine
// ---------------------------------------------------------------------------

/// Stateless retry policy computation.
pub struct RetryPolicyEngine;

impl RetryPolicyEngine {
    /// Compute the policy for one submission.
    ///
    /// `requested` unset means the base defaults. `prior_failure` carries the
    /// classified error of the attempt being resumed, if any.
    pub fn effective_policy(
        requested: Option<&RetryOptions>,
        prior_failure: Option<&BTreeSet<ErrorCategory>>,
    ) -> RetryPolicy {
        let mut options = requested.cloned().unwrap_or_default();

        if let Some(level) = options.criticality_level {
            Self::apply_criticality(&mut options, level);
        }
        if let Some(categories) = prior_failure {
            Self::apply_error_categories(&mut options, categories);
        }

        let policy = RetryPolicy::from(&options);
        tracing::debug!(
            max_attempts = policy.maximum_attempts,
            initial_interval_ms = policy.initial_interval_ms,
            maximum_interval_ms = policy.maximum_interval_ms,
            backoff = policy.backoff_coefficient,
            criticality = ?options.criticality_level,
            categories = ?prior_failure,
            "computed retry policy"
        );
        policy
    }

    /// Bias the options toward the declared criticality.
    pub fn apply_criticality(options: &mut RetryOptions, level: CriticalityLevel) {
        match level {
            CriticalityLevel::Low => {
                options.max_attempts = options.max_attempts.min(3);
                options.maximum_interval_ms = options.maximum_interval_ms.min(30_000);
            }
            CriticalityLevel::Medium => {}
            CriticalityLevel::High => {
                options.max_attempts = options.max_attempts.max(7);
                options.maximum_interval_ms = options.maximum_interval_ms.max(120_000);
            }
            CriticalityLevel::Critical => {
                options.max_attempts = options.max_attempts.max(10);
                options.maximum_interval_ms = options.maximum_interval_ms.max(300_000);
                options.backoff_coefficient = options.backoff_coefficient.min(1.5);
            }
        }
    }

    /// Tune the options for the categories of a prior failure.
    ///
    /// Every matching adjustment applies; a failure that is both
    /// connection-family and resource gets both.
    pub fn apply_error_categories(options: &mut RetryOptions, categories: &BTreeSet<ErrorCategory>) {
        if ErrorClassifier::is_transient(categories) {
            options.initial_interval_ms = options
                .initial_interval_ms
                .saturating_mul(2)
                .min(TRANSIENT_INITIAL_INTERVAL_CAP_MS);
        }
        if ErrorClassifier::is_resource(categories) {
            let widened = (options.maximum_interval_ms as f64 * 1.5).round() as u64;
            options.maximum_interval_ms = widened.min(RESOURCE_MAXIMUM_INTERVAL_CAP_MS);
            options.backoff_coefficient = (options.backoff_coefficient * 1.2).min(RESOURCE_BACKOFF_CAP);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn categories(items: &[ErrorCategory]) -> BTreeSet<ErrorCategory> {
        items.iter().copied().collect()
    }

    #[test]
    fn unset_options_yield_base_defaults() {
        let policy = RetryPolicyEngine::effective_policy(None, None);
        assert_eq!(policy, RetryPolicy::default());
        assert_eq!(policy.maximum_attempts, 5);
        assert_eq!(policy.initial_interval_ms, 1_000);
        assert_eq!(policy.maximum_interval_ms, 60_000);
    }

    #[test]
    fn critical_raises_attempts_and_softens_backoff() {
        let opts = RetryOptions::with_criticality(CriticalityLevel::Critical);
        let policy = RetryPolicyEngine::effective_policy(Some(&opts), None);
        assert_eq!(policy.maximum_attempts, 10);
        assert_eq!(policy.maximum_interval_ms, 300_000);
        assert!((policy.backoff_coefficient - 1.5).abs() < f64::EPSILON);
        assert_eq!(policy.initial_interval_ms, 1_000);
    }

    #[test]
    fn high_raises_floors_only() {
        let mut opts = RetryOptions::with_criticality(CriticalityLevel::High);
        opts.max_attempts = 12;
        let policy = RetryPolicyEngine::effective_policy(Some(&opts), None);
        assert_eq!(policy.maximum_attempts, 12);
        assert_eq!(policy.maximum_interval_ms, 120_000);
        assert!((policy.backoff_coefficient - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn low_caps_attempts_and_interval() {
        let opts = RetryOptions::with_criticality(CriticalityLevel::Low);
        let policy = RetryPolicyEngine::effective_policy(Some(&opts), None);
        assert_eq!(policy.maximum_attempts, 3);
        assert_eq!(policy.maximum_interval_ms, 30_000);
    }

    #[test]
    fn medium_leaves_options_untouched() {
        let mut opts = RetryOptions::with_criticality(CriticalityLevel::Medium);
        opts.max_attempts = 4;
        opts.backoff_coefficient = 2.5;
        let policy = RetryPolicyEngine::effective_policy(Some(&opts), None);
        assert_eq!(policy.maximum_attempts, 4);
        assert!((policy.backoff_coefficient - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn transient_failure_doubles_initial_interval() {
        let opts = RetryOptions::with_criticality(CriticalityLevel::Critical);
        let prior = categories(&[ErrorCategory::Transient, ErrorCategory::Connection]);
        let policy = RetryPolicyEngine::effective_policy(Some(&opts), Some(&prior));
        assert_eq!(policy.initial_interval_ms, 2_000);
        assert_eq!(policy.maximum_attempts, 10);
    }

    #[test]
    fn transient_adjustment_is_capped() {
        let mut opts = RetryOptions::default();
        opts.initial_interval_ms = 4_000;
        let prior = categories(&[ErrorCategory::Connection]);
        let policy = RetryPolicyEngine::effective_policy(Some(&opts), Some(&prior));
        assert_eq!(policy.initial_interval_ms, 5_000);
    }

    #[test]
    fn resource_failure_widens_interval_and_backoff() {
        let prior = categories(&[ErrorCategory::Resource]);
        let policy = RetryPolicyEngine::effective_policy(None, Some(&prior));
        assert_eq!(policy.maximum_interval_ms, 90_000);
        assert!((policy.backoff_coefficient - 2.4).abs() < 1e-9);
        assert_eq!(policy.initial_interval_ms, 1_000);
    }

    #[test]
    fn resource_adjustment_is_capped_after_criticality() {
        let opts = RetryOptions::with_criticality(CriticalityLevel::Critical);
        let prior = categories(&[ErrorCategory::Resource]);
        let policy = RetryPolicyEngine::effective_policy(Some(&opts), Some(&prior));
        assert_eq!(policy.maximum_interval_ms, 300_000);
        assert!((policy.backoff_coefficient - 1.8).abs() < 1e-9);
    }

    #[test]
    fn both_adjustments_apply_together() {
        let prior = categories(&[
            ErrorCategory::Transient,
            ErrorCategory::Connection,
            ErrorCategory::Resource,
        ]);
        let policy = RetryPolicyEngine::effective_policy(None, Some(&prior));
        assert_eq!(policy.initial_interval_ms, 2_000);
        assert_eq!(policy.maximum_interval_ms, 90_000);
    }

    #[test]
    fn generic_failure_changes_nothing() {
        let prior = categories(&[ErrorCategory::Generic]);
        let policy = RetryPolicyEngine::effective_policy(None, Some(&prior));
        assert_eq!(policy, RetryPolicy::default());
    }

    #[test]
    fn non_retryable_types_pass_through() {
        let mut opts = RetryOptions::default();
        opts.non_retryable_error_types = vec!["SchemaMismatch".to_string()];
        let policy = RetryPolicyEngine::effective_policy(Some(&opts), None);
        assert_eq!(policy.non_retryable_error_types, vec!["SchemaMismatch"]);
    }

    fn attempts_at(base: &RetryOptions, level: CriticalityLevel) -> u32 {
        let mut opts = base.clone();
        opts.criticality_level = Some(level);
        RetryPolicyEngine::effective_policy(Some(&opts), None).maximum_attempts
    }

    proptest! {
        #[test]
        fn attempts_are_monotone_in_criticality(max_attempts in 0u32..50) {
            let base = RetryOptions { max_attempts, ..RetryOptions::default() };
            let low = attempts_at(&base, CriticalityLevel::Low);
            let medium = attempts_at(&base, CriticalityLevel::Medium);
            let high = attempts_at(&base, CriticalityLevel::High);
            let critical = attempts_at(&base, CriticalityLevel::Critical);
            prop_assert!(low <= medium);
            prop_assert!(medium <= high);
            prop_assert!(high <= critical);
        }

        #[test]
        fn adjusted_intervals_respect_caps(
            initial in 1u64..100_000,
            maximum in 1u64..1_000_000,
            backoff in 1.0f64..10.0,
        ) {
            let opts = RetryOptions {
                initial_interval_ms: initial,
                maximum_interval_ms: maximum,
                backoff_coefficient: backoff,
                ..RetryOptions::default()
            };
            let prior = categories(&[ErrorCategory::Connection, ErrorCategory::Resource]);
            let policy = RetryPolicyEngine::effective_policy(Some(&opts), Some(&prior));
            prop_assert!(policy.initial_interval_ms <= TRANSIENT_INITIAL_INTERVAL_CAP_MS);
            prop_assert!(policy.maximum_interval_ms <= RESOURCE_MAXIMUM_INTERVAL_CAP_MS);
            prop_assert!(policy.backoff_coefficient <= RESOURCE_BACKOFF_CAP);
        }
    }
}
