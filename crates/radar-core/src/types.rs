//! Shared domain types.
//!
//! Issues and findings flow from the collectors through the analysis crate into
//! storage, so their shapes live here where every crate can see them.

use crate::error::RadarError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Curated repository group a repository belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RepoCategory {
    /// Machine learning frameworks and LLM tooling
    #[serde(rename = "AI/ML")]
    AiMl,
    /// Application security tooling and references
    Security,
    /// Policy-as-code and cloud compliance scanners
    Compliance,
    /// Anything not in a curated list
    Other,
}

impl RepoCategory {
    /// Display label stored alongside issues.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AiMl => "AI/ML",
            Self::Security => "Security",
            Self::Compliance => "Compliance",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for RepoCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepoCategory {
    type Err = RadarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AI/ML" => Ok(Self::AiMl),
            "Security" => Ok(Self::Security),
            "Compliance" => Ok(Self::Compliance),
            "Other" => Ok(Self::Other),
            other => Err(RadarError::Validation(format!(
                "unknown repository category '{other}'"
            ))),
        }
    }
}

/// An open issue discovered by the issue radar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// `owner/name` of the repository
    pub repository: String,
    /// Issue number within the repository
    pub number: i64,
    /// Issue title
    pub title: String,
    /// Browser URL
    pub url: String,
    /// Label names as returned by the API
    pub labels: Vec<String>,
    /// When the issue was opened
    pub created_at: DateTime<Utc>,
    /// Last activity on the issue
    pub updated_at: DateTime<Utc>,
    /// Comment count
    pub comments: u32,
    /// `open` or `closed`
    pub state: String,
    /// Login of the issue author
    pub author: String,
    /// Issue body, truncated when parsed
    pub body: String,
    /// Heuristic value score in `[0, 100]`
    pub score: f64,
    /// Category of the owning repository
    pub category: RepoCategory,
}

/// Kind of vulnerability a pattern rule detects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingType {
    /// SQL built from interpolated strings
    SqlInjection,
    /// Shell or interpreter invocation on dynamic input
    CommandInjection,
    /// File paths built from untrusted input
    PathTraversal,
    /// Credentials committed to source
    HardcodedSecrets,
    /// Unsafe object deserialization
    InsecureDeserialization,
    /// Outbound requests built from request data
    Ssrf,
    /// XML parsing with external entities enabled
    Xxe,
    /// Broken hash or cipher algorithms
    WeakCrypto,
    /// Non-cryptographic randomness
    InsecureRandom,
    /// Debug mode left on
    DebugEnabled,
}

impl FindingType {
    /// Stable identifier stored in the findings table.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SqlInjection => "sql_injection",
            Self::CommandInjection => "command_injection",
            Self::PathTraversal => "path_traversal",
            Self::HardcodedSecrets => "hardcoded_secrets",
            Self::InsecureDeserialization => "insecure_deserialization",
            Self::Ssrf => "ssrf",
            Self::Xxe => "xxe",
            Self::WeakCrypto => "weak_crypto",
            Self::InsecureRandom => "insecure_random",
            Self::DebugEnabled => "debug_enabled",
        }
    }
}

impl fmt::Display for FindingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FindingType {
    type Err = RadarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "sql_injection" => Self::SqlInjection,
            "command_injection" => Self::CommandInjection,
            "path_traversal" => Self::PathTraversal,
            "hardcoded_secrets" => Self::HardcodedSecrets,
            "insecure_deserialization" => Self::InsecureDeserialization,
            "ssrf" => Self::Ssrf,
            "xxe" => Self::Xxe,
            "weak_crypto" => Self::WeakCrypto,
            "insecure_random" => Self::InsecureRandom,
            "debug_enabled" => Self::DebugEnabled,
            other => {
                return Err(RadarError::Validation(format!(
                    "unknown finding type '{other}'"
                )))
            }
        })
    }
}

/// Finding severity, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Exploitable without preconditions
    Critical,
    /// Likely exploitable
    High,
    /// Needs specific conditions
    Medium,
    /// Hardening issue
    Low,
    /// Informational
    Info,
}

impl Severity {
    /// Lowercase name stored in the findings table.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = RadarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            "info" => Ok(Self::Info),
            other => Err(RadarError::Validation(format!("unknown severity '{other}'"))),
        }
    }
}

/// How confident a rule is that a match is a real problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Single unambiguous pattern
    High,
    /// One of several looser patterns
    Medium,
    /// Heuristic only
    Low,
}

impl Confidence {
    /// Lowercase name stored in the findings table.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Confidence {
    type Err = RadarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(RadarError::Validation(format!(
                "unknown confidence '{other}'"
            ))),
        }
    }
}

/// A single line of source code matched by a vulnerability rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// `owner/name` of the scanned repository
    pub repository: String,
    /// Path of the file within the repository
    pub file_path: String,
    /// 1-based line number
    pub line_number: u32,
    /// Rule that matched
    pub finding_type: FindingType,
    /// Severity of the rule
    pub severity: Severity,
    /// Short rule title
    pub title: String,
    /// Which pattern matched
    pub description: String,
    /// CWE identifier such as `CWE-89`
    pub cwe_id: Option<String>,
    /// Trimmed source line, at most 200 characters
    pub evidence: String,
    /// Rule confidence
    pub confidence: Confidence,
}

/// Kind of metric recorded in the collection log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    /// Account profile totals
    Profile,
    /// Pull request, issue, review and commit counts
    Contributions,
    /// Per-repository statistics
    Repositories,
    /// Package index statistics
    Pypi,
}

impl MetricType {
    /// Identifier stored in the collection log.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Contributions => "contributions",
            Self::Repositories => "repositories",
            Self::Pypi => "pypi",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
