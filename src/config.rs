//! Runtime configuration.
//!
//! The configuration snapshot is assembled once at startup from CLI
//! flags and their environment-variable fallbacks, validated before
//! the control loop starts, and immutable afterwards. Invalid values
//! fail fast: a bad endpoint URL, UTC offset, or log level must never
//! let the loop begin.

use std::time::Duration;

use chrono::FixedOffset;
use log::LevelFilter;

use crate::fingerprint::ClassificationPolicy;

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("invalid timing configuration: {0}")]
    InvalidTiming(String),
}

/// Optional HTTP basic-auth pair for a reverse proxy in front of the
/// WebUI.
#[derive(Debug, Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

/// Process-lifetime configuration snapshot.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the WebUI, e.g. `http://127.0.0.1:8080`.
    pub api_base_url: String,
    pub username: String,
    pub password: String,
    pub basic_auth: Option<BasicAuth>,
    /// Fixed sleep between polling cycles.
    pub poll_interval: Duration,
    /// How long a detected peer stays banned.
    pub ban_duration: Duration,
    pub ban_leech: bool,
    pub ban_player: bool,
    pub ban_others: bool,
    pub skip_ratio_check: bool,
    pub upload_threshold: u64,
    /// UTC offset applied to log timestamps.
    pub timezone: FixedOffset,
    pub log_level: LevelFilter,
}

impl Config {
    /// Validate the configuration before the loop starts.
    pub fn validate(&self) -> Result<(), ValidationError> {
        // Validate the endpoint URL
        let host = self
            .api_base_url
            .strip_prefix("http://")
            .or_else(|| self.api_base_url.strip_prefix("https://"))
            .ok_or_else(|| {
                ValidationError::InvalidEndpoint(format!(
                    "'{}' must start with http:// or https://",
                    self.api_base_url
                ))
            })?;
        if host.trim_end_matches('/').is_empty() {
            return Err(ValidationError::InvalidEndpoint(format!(
                "'{}' has no host",
                self.api_base_url
            )));
        }

        // Validate timing settings
        if self.poll_interval.is_zero() {
            return Err(ValidationError::InvalidTiming(
                "poll interval must be at least one second".to_string(),
            ));
        }
        if self.ban_duration.is_zero() {
            return Err(ValidationError::InvalidTiming(
                "ban duration must be at least one second".to_string(),
            ));
        }

        Ok(())
    }

    /// Extract the classifier's policy snapshot.
    pub fn policy(&self) -> ClassificationPolicy {
        ClassificationPolicy {
            ban_leech: self.ban_leech,
            ban_player: self.ban_player,
            ban_others: self.ban_others,
            skip_ratio_check: self.skip_ratio_check,
            upload_threshold: self.upload_threshold,
        }
    }
}

/// Parse a lenient boolean ("yes"/"no"/"true"/"false"/"t"/"f"/"y"/"n"/
/// "1"/"0"), as accepted for every toggle's environment variable.
pub fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "t" | "y" | "1" => Ok(true),
        "no" | "false" | "f" | "n" | "0" => Ok(false),
        other => Err(format!(
            "boolean value expected (yes/no/true/false/1/0), got '{}'",
            other
        )),
    }
}

/// Parse a UTC offset such as "+08:00" or "-05:30".
pub fn parse_offset(value: &str) -> Result<FixedOffset, String> {
    value
        .trim()
        .parse::<FixedOffset>()
        .map_err(|err| format!("invalid UTC offset '{}': {} (expected e.g. +08:00)", value, err))
}

/// Parse a minimum log severity (error, warn, info, debug, trace, off).
pub fn parse_level(value: &str) -> Result<LevelFilter, String> {
    value
        .trim()
        .parse::<LevelFilter>()
        .map_err(|err| format!("invalid log level '{}': {}", value, err))
}
