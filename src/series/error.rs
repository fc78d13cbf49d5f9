//! Series layer error types
//!
//! Contract violations on points and sequences. These are programming errors,
//! not data conditions: callers that honour `has_next` never see them.

use thiserror::Error;

/// Errors raised by points, sequences and series accessors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeriesError {
    /// The wrong value accessor was used for a point
    #[error("Type mismatch: point holds {actual} value, {requested} requested")]
    TypeMismatch {
        requested: &'static str,
        actual: &'static str,
    },

    /// `next()` was called on an exhausted sequence
    #[error("No more data points in {0}")]
    EndOfSequence(String),

    /// Random access outside of the series
    #[error("Index {index} out of bounds for series of size {size}")]
    IndexOutOfBounds { index: usize, size: usize },
}

/// Result type alias for series operations
pub type SeriesResult<T> = Result<T, SeriesError>;
