//! Configuration management for Radar.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use crate::types::RepoCategory;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main application configuration.
///
/// This is loaded from `~/.config/radar/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General application settings
    pub general: GeneralConfig,
    /// GitHub API access
    pub github: GithubConfig,
    /// Package index access
    pub pypi: PypiConfig,
    /// Issue radar behaviour
    pub radar: RadarConfig,
    /// Vulnerability scan targets
    pub vuln_scan: VulnScanConfig,
    /// Collection fan-out and lookback
    pub collection: CollectionConfig,
    /// Job intervals
    pub schedule: ScheduleConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(&config_path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `GITHUB_TOKEN`: API token sent as a bearer credential
    /// - `GITHUB_USERNAME`: Account whose metrics are collected
    /// - `RADAR_DATABASE_PATH`: Override the database location
    /// - `RADAR_PYPI_PACKAGES`: Comma-separated package names
    /// - `RADAR_COLLECT_INTERVAL_HOURS`: Override the metrics interval
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup.
    ///
    /// Unparseable numeric values are ignored and the file value kept.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("GITHUB_TOKEN").filter(|t| !t.is_empty()) {
            self.github.token = Some(token);
            tracing::debug!("GitHub token loaded from env");
        }

        if let Some(username) = lookup("GITHUB_USERNAME").filter(|u| !u.is_empty()) {
            tracing::debug!("Override github.username from env: {}", username);
            self.github.username = username;
        }

        if let Some(path) = lookup("RADAR_DATABASE_PATH").filter(|p| !p.is_empty()) {
            tracing::debug!("Override general.database_path from env: {}", path);
            self.general.database_path = Some(PathBuf::from(path));
        }

        if let Some(packages) = lookup("RADAR_PYPI_PACKAGES") {
            self.pypi.packages = packages
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
            tracing::debug!("Override pypi.packages from env: {:?}", self.pypi.packages);
        }

        if let Some(val) = lookup("RADAR_COLLECT_INTERVAL_HOURS") {
            if let Ok(hours) = val.parse() {
                self.schedule.collect_interval_hours = hours;
                tracing::debug!("Override schedule.collect_interval_hours from env: {}", hours);
            }
        }
    }

    /// Reject values the collectors cannot work with.
    pub fn validate(&self) -> ConfigResult<()> {
        if !(1..=100).contains(&self.github.per_page) {
            return Err(invalid("github.per_page", "must be between 1 and 100"));
        }
        if !(1..=100).contains(&self.radar.per_page) {
            return Err(invalid("radar.per_page", "must be between 1 and 100"));
        }
        if self.collection.concurrent_targets == 0 {
            return Err(invalid("collection.concurrent_targets", "must be at least 1"));
        }
        if self.schedule.collect_interval_hours == 0
            || self.schedule.radar_interval_hours == 0
            || self.schedule.scan_interval_hours == 0
        {
            return Err(invalid("schedule", "intervals must be at least one hour"));
        }
        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| invalid("config_path", "no parent directory"))?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/radar/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("dev", "radar", "radar").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/radar`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("dev", "radar", "radar").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Resolve the database file, defaulting to `radar.db` in the data directory.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        match &self.general.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("radar.db")),
        }
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Database file; the data directory is used when unset
    pub database_path: Option<PathBuf>,
}

/// GitHub API access settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// REST API base URL
    pub api_url: String,
    /// Account whose metrics are collected
    pub username: String,
    /// API token (read from the environment, never written to disk)
    #[serde(skip)]
    pub token: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Page size for list endpoints
    pub per_page: u32,
    /// Remaining-quota floor below which requests wait for the reset
    pub min_remaining: u32,
    /// Delay between consecutive page requests in milliseconds
    pub inter_page_delay_ms: u64,
    /// Cooldown after a secondary rate limit response
    pub rate_limit_cooldown_secs: u64,
    /// Page cap for search endpoints
    pub max_search_pages: u32,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            username: String::new(),
            token: None,
            timeout_secs: 30,
            per_page: 100,
            min_remaining: 10,
            inter_page_delay_ms: 250,
            rate_limit_cooldown_secs: 60,
            max_search_pages: 10,
        }
    }
}

/// Package index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PypiConfig {
    /// JSON API base URL
    pub json_api_url: String,
    /// Download statistics API base URL
    pub stats_api_url: String,
    /// Packages to track
    pub packages: Vec<String>,
}

impl Default for PypiConfig {
    fn default() -> Self {
        Self {
            json_api_url: "https://pypi.org/pypi".to_string(),
            stats_api_url: "https://pypistats.org/api".to_string(),
            packages: Vec::new(),
        }
    }
}

/// Issue radar settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarConfig {
    /// Repository groups to watch
    pub categories: Vec<RepoCategory>,
    /// Issues scoring below this are not stored
    pub min_score: f64,
    /// Issues requested per repository page
    pub per_page: u32,
    /// Pages fetched per repository
    pub max_pages: u32,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            categories: vec![
                RepoCategory::AiMl,
                RepoCategory::Security,
                RepoCategory::Compliance,
            ],
            min_score: 20.0,
            per_page: 50,
            max_pages: 1,
        }
    }
}

/// Vulnerability scan settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VulnScanConfig {
    /// Repositories to scan
    pub repos: Vec<String>,
    /// File extensions to include
    pub extensions: Vec<String>,
    /// Maximum files downloaded per repository
    pub max_files: usize,
    /// Maximum directory depth walked
    pub max_depth: usize,
}

impl Default for VulnScanConfig {
    fn default() -> Self {
        Self {
            repos: Vec::new(),
            extensions: vec![".py".to_string()],
            max_files: 50,
            max_depth: 3,
        }
    }
}

/// Collection fan-out settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Targets processed concurrently
    pub concurrent_targets: usize,
    /// Lookback window for contribution counts
    pub days_back: u32,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            concurrent_targets: 4,
            days_back: 365,
        }
    }
}

/// Job interval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Hours between metric collections
    pub collect_interval_hours: u32,
    /// Hours between issue radar runs
    pub radar_interval_hours: u32,
    /// Hours between vulnerability scans
    pub scan_interval_hours: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            collect_interval_hours: 24,
            radar_interval_hours: 4,
            scan_interval_hours: 168,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.github.per_page, 100);
        assert_eq!(config.github.min_remaining, 10);
        assert_eq!(config.github.inter_page_delay_ms, 250);
        assert!((config.radar.min_score - 20.0).abs() < f64::EPSILON);
        assert_eq!(config.vuln_scan.extensions, vec![".py"]);
        assert_eq!(config.schedule.radar_interval_hours, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = AppConfig::default();
        config.github.token = Some("ghp_secret".to_string());
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("[github]"));
        assert!(toml_str.contains("[radar]"));
        assert!(!toml_str.contains("ghp_secret"));

        let parsed: AppConfig = toml::from_str(&toml_str).expect("parse serialized config");
        assert_eq!(parsed.radar.categories, config.radar.categories);
        assert!(parsed.github.token.is_none());
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("config.toml");

        let mut config = AppConfig::default();
        config.github.username = "octocat".to_string();
        config.pypi.packages = vec!["requests".to_string()];

        let contents = toml::to_string_pretty(&config).expect("serialize config");
        fs::write(&config_path, contents).expect("write config file");

        let loaded_contents = fs::read_to_string(&config_path).expect("read config file");
        let loaded: AppConfig = toml::from_str(&loaded_contents).expect("parse loaded config");

        assert_eq!(loaded.github.username, "octocat");
        assert_eq!(loaded.pypi.packages, vec!["requests"]);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("GITHUB_TOKEN", "ghp_abc"),
            ("GITHUB_USERNAME", "octocat"),
            ("RADAR_DATABASE_PATH", "/tmp/radar-test.db"),
            ("RADAR_PYPI_PACKAGES", "requests, httpx ,,"),
            ("RADAR_COLLECT_INTERVAL_HOURS", "not-a-number"),
        ]);

        let mut config = AppConfig::default();
        config.apply_env(|name| vars.get(name).map(ToString::to_string));

        assert_eq!(config.github.token.as_deref(), Some("ghp_abc"));
        assert_eq!(config.github.username, "octocat");
        assert_eq!(
            config.database_path().expect("database path"),
            PathBuf::from("/tmp/radar-test.db")
        );
        assert_eq!(config.pypi.packages, vec!["requests", "httpx"]);
        assert_eq!(config.schedule.collect_interval_hours, 24);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[github]
username = "octocat"
per_page = 50

[radar]
categories = ["Security"]
"#;

        let config: AppConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.github.username, "octocat");
        assert_eq!(config.github.per_page, 50);
        assert_eq!(config.radar.categories, vec![RepoCategory::Security]);
        // These should be defaults
        assert_eq!(config.github.timeout_secs, 30);
        assert_eq!(config.vuln_scan.max_files, 50);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.github.per_page = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "github.per_page"
        ));

        let mut config = AppConfig::default();
        config.collection.concurrent_targets = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.schedule.radar_interval_hours = 0;
        assert!(config.validate().is_err());
    }
}
