use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::retry::RetryConfig;
use crate::source::{DEFAULT_BASE_URL, DEFAULT_HOST};

/// Runtime settings for the exporter.
///
/// Defaults match the public source; every field can be overridden through a
/// `TEFAS_*` environment variable (see [`ExporterConfig::from_env`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    pub base_url: String,
    pub host: String,
    /// Fund type filter sent with every listing request (`YAT` = investment funds).
    pub fund_type: String,
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub request_timeout_ms: u64,
    pub max_workers: usize,
    pub margin_days: u32,
    /// Offset of the source's calendar from UTC, in hours.
    pub utc_offset_hours: i8,
    pub requests_per_second: Option<u32>,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            base_url: String::from(DEFAULT_BASE_URL),
            host: String::from(DEFAULT_HOST),
            fund_type: String::from("YAT"),
            retry_attempts: 5,
            retry_base_delay_ms: 300,
            request_timeout_ms: 10_000,
            max_workers: 16,
            margin_days: 7,
            utc_offset_hours: 3,
            requests_per_second: None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {variable}: {reason}")]
    InvalidValue {
        variable: &'static str,
        value: String,
        reason: String,
    },
}

impl ExporterConfig {
    /// Defaults overlaid with `TEFAS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("TEFAS_BASE_URL") {
            config.base_url = value.trim().trim_end_matches('/').to_owned();
        }
        if let Some(value) = lookup("TEFAS_HOST") {
            config.host = value.trim().to_owned();
        }
        if let Some(value) = lookup("TEFAS_FUND_TYPE") {
            config.fund_type = value.trim().to_ascii_uppercase();
        }
        if let Some(value) = lookup("TEFAS_RETRY_ATTEMPTS") {
            config.retry_attempts = parse_var("TEFAS_RETRY_ATTEMPTS", &value)?;
        }
        if let Some(value) = lookup("TEFAS_RETRY_BASE_DELAY_MS") {
            config.retry_base_delay_ms = parse_var("TEFAS_RETRY_BASE_DELAY_MS", &value)?;
        }
        if let Some(value) = lookup("TEFAS_REQUEST_TIMEOUT_MS") {
            config.request_timeout_ms = parse_var("TEFAS_REQUEST_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("TEFAS_MAX_WORKERS") {
            config.max_workers = parse_var("TEFAS_MAX_WORKERS", &value)?;
        }
        if let Some(value) = lookup("TEFAS_MARGIN_DAYS") {
            config.margin_days = parse_var("TEFAS_MARGIN_DAYS", &value)?;
        }
        if let Some(value) = lookup("TEFAS_UTC_OFFSET_HOURS") {
            config.utc_offset_hours = parse_var("TEFAS_UTC_OFFSET_HOURS", &value)?;
        }
        if let Some(value) = lookup("TEFAS_REQUESTS_PER_SECOND") {
            let rate: u32 = parse_var("TEFAS_REQUESTS_PER_SECOND", &value)?;
            config.requests_per_second = (rate > 0).then_some(rate);
        }

        Ok(config)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::linear(
            self.retry_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_margin_days(mut self, margin_days: u32) -> Self {
        self.margin_days = margin_days;
        self
    }

    /// Current calendar date at the source, resolved once per run by callers.
    pub fn today(&self) -> Date {
        let offset = UtcOffset::from_hms(self.utc_offset_hours, 0, 0).unwrap_or(UtcOffset::UTC);
        OffsetDateTime::now_utc().to_offset(offset).date()
    }
}

fn parse_var<T>(variable: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|error| ConfigError::InvalidValue {
            variable,
            value: value.to_owned(),
            reason: error.to_string(),
        })
}
