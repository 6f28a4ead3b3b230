//! Error Module
//! Error kinds surfaced by loading, filtering and aggregation.

use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// The CSV resource could not be opened or fetched.
    #[error("Source unavailable '{source_id}': {reason}")]
    SourceUnavailable { source_id: String, reason: String },

    /// The source does not have the expected shape.
    #[error("Malformed data: {0}")]
    MalformedData(String),

    /// A filter or aggregation argument is out of range.
    #[error("Invalid parameter {name}={value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("Failed to read config '{}': {reason}", path.display())]
    Config { path: PathBuf, reason: String },
}

impl From<PolarsError> for CoreError {
    fn from(err: PolarsError) -> Self {
        CoreError::MalformedData(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_message() {
        let err = CoreError::InvalidParameter {
            name: "hour",
            value: "24".to_string(),
            reason: "must be within 0..=23",
        };
        assert_eq!(
            err.to_string(),
            "Invalid parameter hour=24: must be within 0..=23"
        );
    }

    #[test]
    fn test_polars_error_is_malformed() {
        let err: CoreError = PolarsError::ColumnNotFound("latitude".into()).into();
        assert!(matches!(err, CoreError::MalformedData(_)));
    }
}
