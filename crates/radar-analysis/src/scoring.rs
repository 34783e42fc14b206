//! Issue value scoring and repository categorization.
//!
//! Scores are additive over four independent signals (labels, recency,
//! competition, detail) and clamped to `[0, 100]`. Every signal is
//! non-decreasing in the direction that makes an issue more attractive, so the
//! total is monotonic in each of them.

use chrono::{DateTime, Utc};
use radar_core::{Issue, RepoCategory};

/// Upper bound of any score.
pub const MAX_SCORE: f64 = 100.0;

const HIGH_VALUE_LABELS: &[&str] = &["good first issue", "help wanted", "beginner-friendly", "easy"];
const MEDIUM_VALUE_LABELS: &[&str] = &["bug", "documentation", "enhancement"];
const SECURITY_LABELS: &[&str] = &["security", "vulnerability", "cve"];

const HIGH_VALUE_POINTS: f64 = 30.0;
const MEDIUM_VALUE_POINTS: f64 = 15.0;
const SECURITY_POINTS: f64 = 25.0;

/// Labels the search variant of the radar filters on, in priority order.
pub const SEARCH_LABELS: &[&str] = &[
    "good first issue",
    "help wanted",
    "bug",
    "documentation",
    "enhancement",
    "security",
    "vulnerability",
    "hacktoberfest",
    "beginner-friendly",
    "easy",
    "low-hanging-fruit",
    "needs-triage",
    "contributions welcome",
];

/// Machine learning frameworks, LLM tooling and the web stack around them.
pub const AI_ML_REPOS: &[&str] = &[
    "langchain-ai/langchain",
    "huggingface/transformers",
    "openai/openai-python",
    "anthropics/anthropic-sdk-python",
    "run-llama/llama_index",
    "microsoft/autogen",
    "crewAIInc/crewAI",
    "stanfordnlp/dspy",
    "vllm-project/vllm",
    "ggerganov/llama.cpp",
    "pytorch/pytorch",
    "keras-team/keras",
    "scikit-learn/scikit-learn",
    "Lightning-AI/pytorch-lightning",
    "jax-ml/jax",
    "tiangolo/fastapi",
    "encode/starlette",
    "encode/httpx",
    "pydantic/pydantic",
    "pallets/flask",
    "mlflow/mlflow",
    "wandb/wandb",
    "bentoml/BentoML",
    "ray-project/ray",
    "apache/airflow",
];

/// Security scanners, secret detectors, advisories and references.
pub const SECURITY_REPOS: &[&str] = &[
    "OWASP/CheatSheetSeries",
    "OWASP/wstg",
    "OWASP/ASVS",
    "OWASP/owasp-mastg",
    "OWASP/wrongsecrets",
    "PyCQA/bandit",
    "pyupio/safety",
    "aquasecurity/trivy",
    "anchore/grype",
    "anchore/syft",
    "returntocorp/semgrep",
    "snyk/cli",
    "trufflesecurity/trufflehog",
    "gitleaks/gitleaks",
    "Yelp/detect-secrets",
    "github/advisory-database",
    "pypa/advisory-database",
    "sqlmapproject/sqlmap",
    "swisskyrepo/PayloadsAllTheThings",
    "danielmiessler/SecLists",
];

/// Policy-as-code, infrastructure and cloud compliance scanners.
pub const COMPLIANCE_REPOS: &[&str] = &[
    "open-policy-agent/opa",
    "open-policy-agent/gatekeeper",
    "open-policy-agent/conftest",
    "bridgecrewio/checkov",
    "aquasecurity/tfsec",
    "tenable/terrascan",
    "stelligent/cfn_nag",
    "prowler-cloud/prowler",
    "aquasecurity/kube-bench",
    "aquasecurity/kube-hunter",
    "stackrox/kube-linter",
    "FairwindsOps/polaris",
    "cloud-custodian/cloud-custodian",
    "nccgroup/ScoutSuite",
    "toniblyx/my-arsenal-of-aws-security-tools",
];

/// Score an issue relative to `now`.
#[must_use]
pub fn score(issue: &Issue, now: DateTime<Utc>) -> f64 {
    let total = label_points(&issue.labels)
        + recency_points(issue.updated_at, now)
        + competition_points(issue.comments)
        + detail_points(&issue.body);
    total.clamp(0.0, MAX_SCORE)
}

/// Score an issue against the current time.
#[must_use]
pub fn score_now(issue: &Issue) -> f64 {
    score(issue, Utc::now())
}

fn label_points(labels: &[String]) -> f64 {
    let lowered: Vec<String> = labels.iter().map(|l| l.to_lowercase()).collect();
    let has_any = |set: &[&str]| lowered.iter().any(|l| set.contains(&l.as_str()));

    let mut points = 0.0;
    if has_any(HIGH_VALUE_LABELS) {
        points += HIGH_VALUE_POINTS;
    }
    if has_any(MEDIUM_VALUE_LABELS) {
        points += MEDIUM_VALUE_POINTS;
    }
    if has_any(SECURITY_LABELS) {
        points += SECURITY_POINTS;
    }
    points
}

fn recency_points(updated_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    match (now - updated_at).num_days() {
        d if d < 7 => 20.0,
        d if d < 30 => 10.0,
        d if d < 90 => 5.0,
        _ => 0.0,
    }
}

fn competition_points(comments: u32) -> f64 {
    match comments {
        0 => 15.0,
        1..=2 => 10.0,
        3..=9 => 5.0,
        _ => 0.0,
    }
}

fn detail_points(body: &str) -> f64 {
    match body.chars().count() {
        n if n > 200 => 10.0,
        n if n > 50 => 5.0,
        _ => 0.0,
    }
}

/// Curated category of `repository` (`owner/name`), `Other` when unlisted.
#[must_use]
pub fn categorize(repository: &str) -> RepoCategory {
    if AI_ML_REPOS.contains(&repository) {
        RepoCategory::AiMl
    } else if SECURITY_REPOS.contains(&repository) {
        RepoCategory::Security
    } else if COMPLIANCE_REPOS.contains(&repository) {
        RepoCategory::Compliance
    } else {
        RepoCategory::Other
    }
}

/// Curated repositories of `category`; empty for `Other`.
#[must_use]
pub fn repositories(category: RepoCategory) -> &'static [&'static str] {
    match category {
        RepoCategory::AiMl => AI_ML_REPOS,
        RepoCategory::Security => SECURITY_REPOS,
        RepoCategory::Compliance => COMPLIANCE_REPOS,
        RepoCategory::Other => &[],
    }
}
