//! Error types for Dashkit.

use thiserror::Error;

/// The main error type for query translation.
#[derive(Debug, Error)]
pub enum ExplorerError {
    /// Aggregation token outside the fixed set and not a valid percentile.
    #[error("Invalid aggregation: '{0}'. Expected one of avg, count, last, max, mean, min, stddev, sum, variance, or a percentile such as '50%'")]
    InvalidAggregation(String),

    /// A date filter was supplied but is missing required fields.
    #[error("Malformed {bound} date filter: {reason}")]
    MalformedDateFilter { bound: DateBound, reason: String },

    /// The SELECT list would be empty.
    #[error("Query selects no columns and no aggregations")]
    EmptyFieldList,

    /// The query configuration is invalid.
    #[error("Invalid query configuration: {0}")]
    Configuration(String),

    /// The settings file could not be loaded.
    #[error("Config error: {0}")]
    Config(String),

    /// JSON decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which side of the date range a date filter constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    Start,
    End,
}

impl std::fmt::Display for DateBound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateBound::Start => write!(f, "start"),
            DateBound::End => write!(f, "end"),
        }
    }
}

impl ExplorerError {
    /// Create a malformed date filter error.
    pub fn malformed_date(bound: DateBound, reason: impl Into<String>) -> Self {
        Self::MalformedDateFilter {
            bound,
            reason: reason.into(),
        }
    }
}

/// Result type alias for Dashkit operations.
pub type ExplorerResult<T> = Result<T, ExplorerError>;
