//! Core error types for Radar.
//!
//! Subsystem crates define their own error enums; this one covers configuration
//! and the parsing of shared domain values.

use thiserror::Error;

/// Central error type for shared Radar operations.
#[derive(Error, Debug)]
pub enum RadarError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A stored or received value could not be mapped to a domain type
    #[error("validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `RadarError`.
pub type Result<T> = std::result::Result<T, RadarError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RadarError::Validation("unknown severity 'extreme'".to_string());
        assert_eq!(
            err.to_string(),
            "validation error: unknown severity 'extreme'"
        );

        let err = ConfigError::InvalidValue {
            field: "github.per_page".to_string(),
            reason: "must be between 1 and 100".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value for github.per_page: must be between 1 and 100"
        );
    }

    #[test]
    fn test_error_from_config() {
        let radar_err: RadarError = ConfigError::NoConfigDir.into();
        assert!(matches!(radar_err, RadarError::Config(_)));
    }
}
