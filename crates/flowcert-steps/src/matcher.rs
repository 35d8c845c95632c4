//! Response classification for external jobs
//!
//! A poll response is classified by probing the body with JSON-Pointer
//! paths and comparing against expected values. Matchers are part of
//! the step configuration, so what counts as success is
//! tenant-configurable without touching machine logic.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One probe: a JSON-Pointer path and the value that must be there.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathMatcher {
    pub path: String,
    pub expected: Value,
}

impl PathMatcher {
    pub fn new(path: impl Into<String>, expected: Value) -> Self {
        Self {
            path: path.into(),
            expected,
        }
    }

    /// True when the body has `expected` at `path`.
    pub fn matches(&self, body: &Value) -> bool {
        body.pointer(&self.path) == Some(&self.expected)
    }
}

/// How a poll response was classified.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    Success,
    Failure,
    /// No matcher fired; the job is still in flight.
    Indeterminate,
}

/// Run the success matchers, then the failure matchers. The first
/// matcher that fires decides.
pub fn classify(
    body: &Value,
    success: &[PathMatcher],
    failure: &[PathMatcher],
) -> Classification {
    if success.iter().any(|m| m.matches(body)) {
        Classification::Success
    } else if failure.iter().any(|m| m.matches(body)) {
        Classification::Failure
    } else {
        Classification::Indeterminate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn matchers() -> (Vec<PathMatcher>, Vec<PathMatcher>) {
        (
            vec![PathMatcher::new("/state", json!("done"))],
            vec![
                PathMatcher::new("/state", json!("rejected")),
                PathMatcher::new("/error/fatal", json!(true)),
            ],
        )
    }

    #[test]
    fn test_success_match() {
        let (success, failure) = matchers();
        let body = json!({"state": "done", "jobId": 42});
        assert_eq!(classify(&body, &success, &failure), Classification::Success);
    }

    #[test]
    fn test_failure_match_on_nested_path() {
        let (success, failure) = matchers();
        let body = json!({"state": "errored", "error": {"fatal": true}});
        assert_eq!(classify(&body, &success, &failure), Classification::Failure);
    }

    #[test]
    fn test_no_match_is_indeterminate() {
        let (success, failure) = matchers();
        let body = json!({"state": "processing"});
        assert_eq!(
            classify(&body, &success, &failure),
            Classification::Indeterminate
        );
    }

    #[test]
    fn test_missing_path_does_not_match() {
        let matcher = PathMatcher::new("/deeply/nested", json!(1));
        assert!(!matcher.matches(&json!({"other": 1})));
    }
}
