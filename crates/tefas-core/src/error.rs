use thiserror::Error;
use time::Date;

use crate::http_client::HttpError;

/// Validation and contract errors exposed by `tefas-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("fund code cannot be empty")]
    EmptyFundCode,
    #[error("fund code '{value}' must be ASCII alphanumeric and at most {max} characters")]
    InvalidFundCode { value: String, max: usize },

    #[error("fund name cannot be empty")]
    EmptyName,
    #[error("fund category cannot be empty")]
    EmptyCategory,
    #[error("fund risk score must be a positive integer, got {value}")]
    NonPositiveRiskScore { value: i64 },
    #[error("fund field '{field}' is missing")]
    MissingField { field: &'static str },

    #[error("price list cannot be empty")]
    EmptyPrices,
    #[error("prices must be strictly increasing by date: {next} follows {previous}")]
    UnorderedPrices { previous: Date, next: Date },
    #[error("price dated {date} does not extend series ending {last}")]
    StalePrice { last: Date, date: Date },
    #[error("price value on {date} must be positive, got {value}")]
    NonPositivePrice { date: Date, value: f64 },

    #[error("distribution list cannot be empty")]
    EmptyDistributions,
    #[error("distribution name cannot be empty")]
    EmptyDistributionName,
    #[error("distribution '{name}' has zero weight")]
    ZeroDistributionWeight { name: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },

    #[error("date range start {start} is after end {end}")]
    InvalidDateRange { start: Date, end: Date },
    #[error("date must be formatted as DD.MM.YYYY: '{value}'")]
    InvalidDate { value: String },
    #[error("invalid time frame '{value}', expected e.g. 30d, 2w, 6m, 1y")]
    InvalidTimeFrame { value: String },

    #[error("issuer code cannot be empty")]
    EmptyIssuerCode,
    #[error("issuer name cannot be empty")]
    EmptyIssuerName,
}

/// Failure of a single request or extraction against the source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error on '{endpoint}' after {attempts} attempt(s): {source}")]
    Transport {
        endpoint: String,
        attempts: u32,
        #[source]
        source: HttpError,
    },

    #[error("upstream returned status {status} for '{endpoint}' after {attempts} attempt(s)")]
    Status {
        endpoint: String,
        status: u16,
        attempts: u32,
    },

    #[error("failed to decode response from '{endpoint}': {message}")]
    Decode { endpoint: String, message: String },

    #[error("fund '{code}' has an unreadable {field} chart: {reason}")]
    Extraction {
        code: String,
        field: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl FetchError {
    /// Number of attempts spent before the error became terminal, when a request was made.
    pub const fn attempts(&self) -> Option<u32> {
        match self {
            Self::Transport { attempts, .. } | Self::Status { attempts, .. } => Some(*attempts),
            Self::Decode { .. } | Self::Extraction { .. } | Self::Validation(_) => None,
        }
    }
}

/// Errors raised while reading or writing the flat-file interchange format.
#[derive(Debug, Error)]
pub enum InterchangeError {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("row {row}: column '{column}' is malformed: {message}")]
    Column {
        row: usize,
        column: &'static str,
        message: String,
    },

    #[error("row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: ValidationError,
    },
}
