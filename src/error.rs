//! Unified error handling for trace analysis.
//!
//! Every fallible operation returns [`Result`]. Failures are synchronous and
//! never carry partial output; the caller decides whether to abort the trace
//! or fall back to the raw points.

use thiserror::Error;

/// Errors produced while validating or analysing a trace.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TraceError {
    /// A trace needs at least two points to have any extent.
    #[error("trace has {point_count} points, at least {minimum_required} required")]
    InvalidTrace {
        point_count: usize,
        minimum_required: usize,
    },

    /// Input record is malformed (mismatched array lengths, bad coordinates).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A configuration value is out of its valid domain.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An operation needs per-point data the caller did not supply.
    #[error("missing auxiliary data: {0}")]
    MissingAuxiliaryData(String),

    /// The injected elevation source could not answer.
    #[error("elevation lookup failed: {0}")]
    ElevationLookup(String),
}

pub type Result<T> = std::result::Result<T, TraceError>;

/// Conversions from `Option` into trace errors.
pub trait OptionExt<T> {
    /// Map `None` to [`TraceError::InvalidTrace`].
    fn ok_or_invalid_trace(self, point_count: usize, minimum_required: usize) -> Result<T>;

    /// Map `None` to [`TraceError::MissingAuxiliaryData`].
    fn ok_or_missing(self, what: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_invalid_trace(self, point_count: usize, minimum_required: usize) -> Result<T> {
        self.ok_or(TraceError::InvalidTrace {
            point_count,
            minimum_required,
        })
    }

    fn ok_or_missing(self, what: &str) -> Result<T> {
        self.ok_or_else(|| TraceError::MissingAuxiliaryData(what.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TraceError::InvalidTrace {
            point_count: 1,
            minimum_required: 2,
        };
        assert!(err.to_string().contains("1 points"));
        assert!(err.to_string().contains("at least 2"));
    }

    #[test]
    fn test_option_ext() {
        let none: Option<i32> = None;
        assert!(matches!(
            none.ok_or_invalid_trace(0, 2),
            Err(TraceError::InvalidTrace { point_count: 0, .. })
        ));
        assert!(matches!(
            None::<u8>.ok_or_missing("match counts"),
            Err(TraceError::MissingAuxiliaryData(ref s)) if s == "match counts"
        ));
        assert_eq!(Some(3).ok_or_missing("x"), Ok(3));
    }
}
