//! Per-target collection outcomes.
//!
//! A failing target never aborts a batch; its failure is reported here and in
//! the audit log instead.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How collection of one target ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetStatus {
    /// Every request succeeded
    Success,
    /// Some data was stored before a request failed
    Partial,
    /// Nothing usable was collected
    Failed,
}

impl TargetStatus {
    /// Value stored in the audit log.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of collecting one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetReport {
    /// Username, repository or package
    pub target: String,
    /// Outcome
    pub status: TargetStatus,
    /// Records stored
    pub items: usize,
    /// Error message if the target did not fully succeed
    pub error: Option<String>,
}

impl TargetReport {
    /// Fully successful target.
    #[must_use]
    pub fn success(target: impl Into<String>, items: usize) -> Self {
        Self {
            target: target.into(),
            status: TargetStatus::Success,
            items,
            error: None,
        }
    }

    /// Target cut short after storing `items` records.
    #[must_use]
    pub fn partial(target: impl Into<String>, items: usize, error: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            status: TargetStatus::Partial,
            items,
            error: Some(error.into()),
        }
    }

    /// Target that produced nothing.
    #[must_use]
    pub fn failed(target: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            status: TargetStatus::Failed,
            items: 0,
            error: Some(error.into()),
        }
    }

    /// Partial when an error is present, success otherwise.
    #[must_use]
    pub fn from_items(target: impl Into<String>, items: usize, error: Option<String>) -> Self {
        match error {
            Some(e) if items == 0 => Self::failed(target, e),
            Some(e) => Self::partial(target, items, e),
            None => Self::success(target, items),
        }
    }

    /// Whether the target fully succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == TargetStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_items() {
        assert!(TargetReport::from_items("a/b", 3, None).is_success());
        assert_eq!(
            TargetReport::from_items("a/b", 3, Some("boom".into())).status,
            TargetStatus::Partial
        );
        let failed = TargetReport::from_items("a/b", 0, Some("boom".into()));
        assert_eq!(failed.status, TargetStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&TargetStatus::Partial).expect("serialize"),
            "\"partial\""
        );
        assert_eq!(TargetStatus::Failed.to_string(), "failed");
    }
}
