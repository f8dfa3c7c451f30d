//! Keyword-based classification of failure messages.
//!
//! A message may fall into several categories at once: "network down, out of
//! memory" is both connection-family and resource. Matching is
//! case-insensitive substring search; a message that matches nothing is
//! [`ErrorCategory::Generic`].

use std::collections::BTreeSet;

use flowguard_types::retry::ErrorCategory;

/// Connection-family failures count as both transient and connection.
const CONNECTION_KEYWORDS: &[&str] = &["connection", "network", "timeout", "econnrefused", "etimedout"];
const RESOURCE_KEYWORDS: &[&str] = &["memory", "cpu", "resource", "out of memory", "load"];
const PERMISSION_KEYWORDS: &[&str] = &["permission", "unauthorized", "forbidden", "auth"];
const DATA_KEYWORDS: &[&str] = &["data", "validation", "schema", "parse"];

fn matches_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| haystack.contains(k))
}

/// Stateless classifier for error messages.
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify a failure message into one or more categories.
    ///
    /// Never returns an empty set.
    pub fn classify(message: &str) -> BTreeSet<ErrorCategory> {
        let lowered = message.to_lowercase();
        let mut categories = BTreeSet::new();

        if matches_any(&lowered, CONNECTION_KEYWORDS) {
            categories.insert(ErrorCategory::Transient);
            categories.insert(ErrorCategory::Connection);
        }
        if matches_any(&lowered, RESOURCE_KEYWORDS) {
            categories.insert(ErrorCategory::Resource);
        }
        if matches_any(&lowered, PERMISSION_KEYWORDS) {
            categories.insert(ErrorCategory::Permission);
        }
        if matches_any(&lowered, DATA_KEYWORDS) {
            categories.insert(ErrorCategory::Data);
        }

        if categories.is_empty() {
            categories.insert(ErrorCategory::Generic);
        }
        categories
    }

    /// Whether the categories call for the transient/connection adjustment.
    pub fn is_transient(categories: &BTreeSet<ErrorCategory>) -> bool {
        categories.contains(&ErrorCategory::Transient)
            || categories.contains(&ErrorCategory::Connection)
    }

    /// Whether the categories call for the resource adjustment.
    pub fn is_resource(categories: &BTreeSet<ErrorCategory>) -> bool {
        categories.contains(&ErrorCategory::Resource)
    }
}
