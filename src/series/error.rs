//! Series model error types

use thiserror::Error;

/// Errors raised while building or slicing in-memory series
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeriesError {
    /// Windows or values do not form a consistent series
    #[error("Invalid series: {0}")]
    InvalidSeries(String),

    /// Owner reference string is not `<uuid>__<name>`
    #[error("Invalid owner reference: {0}")]
    InvalidOwnerRef(String),

    /// A derived forecast window reaches past the backing series
    #[error("Window row {row} is beyond the last valid row {last_valid}")]
    WindowOutOfRange { row: usize, last_valid: usize },
}

/// Result type for series construction
pub type SeriesResult<T> = Result<T, SeriesError>;
