//! Runtime configuration
//!
//! Values are collected by the binary from command line flags and the
//! environment (including a `.env` file) and checked here before any
//! service is contacted.

use std::time::Duration;
use thiserror::Error;

/// Model used for filename interpretation unless configured otherwise
pub const DEFAULT_MISTRAL_MODEL: &str = "mistral-medium";

/// Metadata language unless configured otherwise (ISO 639-2)
pub const DEFAULT_LANGUAGE: &str = "eng";

/// Errors that can occur while validating the configuration
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A required credential is missing or blank
    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    /// The interpreter call interval is not a positive number of seconds
    #[error("Invalid interpreter interval: {0} (must be a positive number of seconds)")]
    InvalidInterval(f64),

    /// The language is not a three letter code
    #[error("Invalid language code: {0:?} (expected three letters, e.g. eng)")]
    InvalidLanguage(String),
}

/// Settings for a tagging run
#[derive(Debug, Clone)]
pub struct Config {
    pub mistral_api_key: String,
    pub mistral_model: String,
    pub tvdb_api_key: String,
    /// Subscriber PIN, only needed for user-supported TVDB keys
    pub tvdb_pin: Option<String>,
    pub language: String,
    /// Minimum spacing between two interpreter calls
    pub min_interval: Duration,
    pub embed_artwork: bool,
}

impl Config {
    /// Checks credentials, language and interval
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mistral_api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential("MISTRAL_API_KEY"));
        }
        if self.tvdb_api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential("TVDB_API_KEY"));
        }
        if self.mistral_model.trim().is_empty() {
            return Err(ConfigError::MissingCredential("MISTRAL_MODEL"));
        }
        if self.min_interval.is_zero() {
            return Err(ConfigError::InvalidInterval(0.0));
        }
        validate_language(&self.language)?;
        Ok(())
    }
}

/// Converts an interval given in seconds
pub fn interval_from_secs(seconds: f64) -> Result<Duration, ConfigError> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(ConfigError::InvalidInterval(seconds));
    }
    Duration::try_from_secs_f64(seconds).map_err(|_| ConfigError::InvalidInterval(seconds))
}

fn validate_language(language: &str) -> Result<(), ConfigError> {
    if language.len() == 3 && language.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(())
    } else {
        Err(ConfigError::InvalidLanguage(language.to_string()))
    }
}
