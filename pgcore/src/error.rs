//! Error types for periodogram candidate detection.

use thiserror::Error;

/// Result type alias for peak search operations.
pub type Result<T> = std::result::Result<T, PeakSearchError>;

/// Precondition violations surfaced to the caller. Running out of significant
/// trials or pooled peaks is not an error, it yields empty outputs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PeakSearchError {
    #[error("periodogram has no period trials")]
    EmptyPeriodogram,

    #[error("periodogram has no width trials")]
    EmptyWidths,

    /// The S/N table does not hold `periods x widths` values.
    #[error("S/N grid shape mismatch: expected {expected} values, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("period trial {index} is not strictly positive ({value})")]
    NonPositivePeriod { index: usize, value: f64 },

    #[error("period trials are not strictly monotonic at index {index}")]
    NonMonotonicPeriods { index: usize },

    #[error("observation duration must be positive and finite, got {0}")]
    InvalidDuration(f64),

    #[error("average number of bins must be positive and finite, got {0}")]
    InvalidBinsAvg(f64),

    #[error("width trial index {index} out of range ({count} width trials)")]
    WidthIndexOutOfRange { index: usize, count: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("threshold fit failed: {0}")]
    ThresholdFit(String),
}
