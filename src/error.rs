//! Error types for the metrics engine

use thiserror::Error;

/// Errors raised while loading configuration or assembling a dataset.
///
/// Arithmetic inside the generators never fails; division by zero falls
/// back to documented constants instead.
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error in {file}: {detail}")]
    Parse { file: String, detail: String },

    #[error("Invalid assumption '{name}': {reason}")]
    InvalidAssumption { name: String, reason: String },

    #[error("Unknown entity '{0}'")]
    UnknownEntity(String),

    #[error("Month {month} out of range for '{entity}' ({months} months)")]
    MonthOutOfRange {
        entity: String,
        month: usize,
        months: usize,
    },

    #[error("Cannot roll up '{0}': no child series")]
    EmptyRollup(String),

    #[error("Series length mismatch in rollup of '{name}': expected {expected}, got {actual}")]
    SeriesLengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Consistency violation at '{entity}', month {month}: {detail}")]
    Inconsistent {
        entity: String,
        month: usize,
        detail: String,
    },
}

pub type Result<T> = std::result::Result<T, MetricsError>;

impl MetricsError {
    pub(crate) fn parse(file: &str, detail: impl Into<String>) -> Self {
        MetricsError::Parse {
            file: file.to_string(),
            detail: detail.into(),
        }
    }

    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        MetricsError::InvalidAssumption {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
