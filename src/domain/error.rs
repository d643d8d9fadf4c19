//! Domain error types.

use chrono::NaiveDate;
use std::path::PathBuf;

/// Top-level error type for stratcompare.
///
/// Every variant is fatal to the run; nothing in the pipeline recovers locally.
#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    #[error("failed to fetch prices for {symbol}: {reason}")]
    DataFetch { symbol: String, reason: String },

    #[error("no price data for {symbol}")]
    NoData { symbol: String },

    #[error("invalid price {price} on {date}: prices must be positive and finite")]
    InvalidPrice { date: NaiveDate, price: f64 },

    #[error("dates must be strictly increasing: {previous} is followed by {next}")]
    UnorderedDates { previous: NaiveDate, next: NaiveDate },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("simulation failed: {reason}")]
    Simulation { reason: String },

    #[error("duplicate strategy name: {name}")]
    DuplicateStrategy { name: String },

    #[error("unknown metric: {name}")]
    UnknownMetric { name: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CompareError {
    pub(crate) fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        CompareError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        CompareError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&CompareError> for std::process::ExitCode {
    fn from(err: &CompareError) -> Self {
        let code: u8 = match err {
            CompareError::Io(_) | CompareError::Csv(_) | CompareError::Persist { .. } => 1,
            CompareError::ConfigParse { .. } | CompareError::ConfigInvalid { .. } => 2,
            CompareError::DataFetch { .. }
            | CompareError::NoData { .. }
            | CompareError::InvalidPrice { .. }
            | CompareError::UnorderedDates { .. } => 3,
            CompareError::InvalidParameter { .. }
            | CompareError::Simulation { .. }
            | CompareError::DuplicateStrategy { .. } => 4,
            CompareError::UnknownMetric { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
