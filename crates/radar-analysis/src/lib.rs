//! Radar Analysis - pure functions over collected data.
//!
//! - [`scoring`] - issue value scores and repository categories
//! - [`patterns`] - the regex vulnerability ruleset and line scanner
//!
//! Nothing in this crate performs I/O.
//!
//! # Example
//!
//! ```rust
//! use radar_analysis::{categorize, PatternScanner};
//! use radar_core::{FindingType, RepoCategory};
//!
//! assert_eq!(categorize("gitleaks/gitleaks"), RepoCategory::Security);
//!
//! let findings = PatternScanner::new().scan("acme/app", "run.py", "os.system(cmd)");
//! assert_eq!(findings[0].finding_type, FindingType::CommandInjection);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod patterns;
pub mod scoring;

pub use patterns::{PatternScanner, Rule, RULES};
pub use scoring::{categorize, repositories, score, score_now, MAX_SCORE, SEARCH_LABELS};
