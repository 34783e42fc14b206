//! Regex vulnerability ruleset and line scanner.
//!
//! The ruleset is compiled once and never mutated. Scanning walks rules in
//! declaration order, then each rule's patterns, then the file's lines, so the
//! output order is fully determined by the input.

use once_cell::sync::Lazy;
use radar_core::{Confidence, Finding, FindingType, Severity};
use regex::Regex;

/// Longest evidence excerpt kept per finding, in characters.
pub const MAX_EVIDENCE_CHARS: usize = 200;

const COMMENT_PREFIXES: &[&str] = &["#", "\"\"\"", "'''"];

/// One compiled pattern and the source text it was built from.
#[derive(Debug)]
pub struct Pattern {
    source: &'static str,
    regex: Regex,
}

impl Pattern {
    /// The pattern as written, without the case-insensitivity flag.
    #[must_use]
    pub fn source(&self) -> &'static str {
        self.source
    }

    /// Whether the pattern matches anywhere in `line`.
    #[must_use]
    pub fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }
}

/// A vulnerability class and the patterns that detect it.
#[derive(Debug)]
pub struct Rule {
    /// Class of vulnerability
    pub finding_type: FindingType,
    /// Severity of every finding the rule produces
    pub severity: Severity,
    /// CWE identifier
    pub cwe_id: &'static str,
    /// Human-readable title
    pub title: &'static str,
    /// Patterns in match order
    pub patterns: Vec<Pattern>,
    /// Fixed confidence; otherwise derived from the pattern count
    pub confidence_override: Option<Confidence>,
}

impl Rule {
    /// Confidence attached to this rule's findings.
    #[must_use]
    pub fn confidence(&self) -> Confidence {
        self.confidence_override.unwrap_or(if self.patterns.len() > 1 {
            Confidence::Medium
        } else {
            Confidence::High
        })
    }
}

fn rule(
    finding_type: FindingType,
    severity: Severity,
    cwe_id: &'static str,
    title: &'static str,
    sources: &[&'static str],
) -> Rule {
    let patterns = sources
        .iter()
        .map(|&source| Pattern {
            source,
            regex: Regex::new(&format!("(?i){source}"))
                .expect("vulnerability pattern is hardcoded and valid"),
        })
        .collect();

    Rule {
        finding_type,
        severity,
        cwe_id,
        title,
        patterns,
        confidence_override: None,
    }
}

/// The ordered ruleset.
pub static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule(
            FindingType::SqlInjection,
            Severity::Critical,
            "CWE-89",
            "Potential SQL Injection",
            &[
                r#"execute\s*\(\s*["'].*%.*["']"#,
                r#"execute\s*\(\s*f["']"#,
                r"\.format\s*\(.*\).*execute",
                r#"cursor\.execute\s*\(\s*["'].*\+"#,
            ],
        ),
        rule(
            FindingType::CommandInjection,
            Severity::Critical,
            "CWE-78",
            "Potential Command Injection",
            &[
                r"os\.system\s*\(",
                r"subprocess\.call\s*\([^,\]]*shell\s*=\s*True",
                r"subprocess\.run\s*\([^,\]]*shell\s*=\s*True",
                r"eval\s*\(",
                r"exec\s*\(",
            ],
        ),
        rule(
            FindingType::PathTraversal,
            Severity::High,
            "CWE-22",
            "Potential Path Traversal",
            &[
                r"open\s*\([^)]*\+[^)]*\)",
                r"\.\./",
                r"os\.path\.join\s*\([^)]*request\.",
            ],
        ),
        rule(
            FindingType::HardcodedSecrets,
            Severity::High,
            "CWE-798",
            "Hardcoded Credentials",
            &[
                r#"password\s*=\s*["'][^"']+["']"#,
                r#"api_key\s*=\s*["'][^"']+["']"#,
                r#"secret\s*=\s*["'][^"']+["']"#,
                r#"token\s*=\s*["'][a-zA-Z0-9]{20,}["']"#,
                r#"AWS_SECRET_ACCESS_KEY\s*=\s*["']"#,
            ],
        ),
        rule(
            FindingType::InsecureDeserialization,
            Severity::High,
            "CWE-502",
            "Insecure Deserialization",
            &[
                r"pickle\.load\s*\(",
                r"pickle\.loads\s*\(",
                r"yaml\.load\s*\([^)]*\)",
                r"marshal\.loads?\s*\(",
            ],
        ),
        rule(
            FindingType::Ssrf,
            Severity::High,
            "CWE-918",
            "Potential SSRF",
            &[
                r"requests\.(get|post|put|delete)\s*\([^)]*request\.",
                r"urllib\.request\.urlopen\s*\([^)]*\+",
                r"httpx\.(get|post)\s*\([^)]*request\.",
            ],
        ),
        rule(
            FindingType::Xxe,
            Severity::Medium,
            "CWE-611",
            "Potential XXE",
            &[
                r"etree\.parse\s*\(",
                r"xml\.etree\.ElementTree\.parse",
                r"xml\.dom\.minidom\.parse",
            ],
        ),
        rule(
            FindingType::WeakCrypto,
            Severity::Medium,
            "CWE-327",
            "Weak Cryptographic Algorithm",
            &[
                r"hashlib\.md5\s*\(",
                r"hashlib\.sha1\s*\(",
                r"DES\s*\.",
                r"RC4\s*\.",
            ],
        ),
        rule(
            FindingType::InsecureRandom,
            Severity::Low,
            "CWE-330",
            "Insecure Random Number Generation",
            &[
                r"random\.random\s*\(",
                r"random\.randint\s*\(",
                r"random\.choice\s*\(",
            ],
        ),
        rule(
            FindingType::DebugEnabled,
            Severity::Medium,
            "CWE-489",
            "Debug Mode Enabled",
            &[
                r"DEBUG\s*=\s*True",
                r"app\.run\s*\([^)]*debug\s*=\s*True",
                r#"FLASK_DEBUG\s*=\s*["']?1"#,
            ],
        ),
    ]
});

fn is_comment(trimmed: &str) -> bool {
    COMMENT_PREFIXES.iter().any(|p| trimmed.starts_with(*p))
}

fn evidence(trimmed: &str) -> String {
    trimmed.chars().take(MAX_EVIDENCE_CHARS).collect()
}

/// Stateless scanner over the shared ruleset.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternScanner;

impl PatternScanner {
    /// Create a scanner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Rules applied by [`PatternScanner::scan`], in order.
    #[must_use]
    pub fn rules(&self) -> &'static [Rule] {
        &RULES
    }

    /// Scan one file's text.
    ///
    /// Every (pattern, line) match yields a finding unless the trimmed line
    /// opens with a comment or docstring marker. Line numbers are 1-based.
    #[must_use]
    pub fn scan(&self, repository: &str, file_path: &str, content: &str) -> Vec<Finding> {
        let lines: Vec<&str> = content.split('\n').collect();
        let mut findings = Vec::new();

        for rule in RULES.iter() {
            let confidence = rule.confidence();
            for pattern in &rule.patterns {
                for (index, line) in lines.iter().enumerate() {
                    if !pattern.is_match(line) {
                        continue;
                    }
                    let trimmed = line.trim();
                    if is_comment(trimmed) {
                        continue;
                    }

                    findings.push(Finding {
                        repository: repository.to_string(),
                        file_path: file_path.to_string(),
                        line_number: u32::try_from(index + 1).unwrap_or(u32::MAX),
                        finding_type: rule.finding_type,
                        severity: rule.severity,
                        title: rule.title.to_string(),
                        description: format!("Pattern matched: {}", pattern.source()),
                        cwe_id: Some(rule.cwe_id.to_string()),
                        evidence: evidence(trimmed),
                        confidence,
                    });
                }
            }
        }

        if !findings.is_empty() {
            tracing::debug!(
                repository,
                file_path,
                count = findings.len(),
                "Pattern matches found"
            );
        }
        findings
    }
}
