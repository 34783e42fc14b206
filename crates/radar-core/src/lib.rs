//! Radar Core - Foundation crate for the Radar metrics collector.
//!
//! This crate provides shared domain types, error handling and configuration
//! management that all other Radar crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared domain types (`Issue`, `Finding`, `RepoCategory`, `Severity`)
//!
//! # Example
//!
//! ```rust
//! use radar_core::{AppConfig, RepoCategory};
//!
//! let config = AppConfig::default();
//! assert!(config.radar.categories.contains(&RepoCategory::Security));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, CollectionConfig, GeneralConfig, GithubConfig, PypiConfig, RadarConfig,
    ScheduleConfig, VulnScanConfig,
};
pub use error::{ConfigError, ConfigResult, RadarError, Result};
pub use types::{Confidence, Finding, FindingType, Issue, MetricType, RepoCategory, Severity};
