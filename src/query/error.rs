//! Query error types
//!
//! Defines all error conditions that can occur while parsing and evaluating
//! series queries and expressions.

use thiserror::Error;

/// Errors that can occur during query operations
#[derive(Error, Debug)]
pub enum QueryError {
    /// Query or expression parsing failed
    #[error("Parse error: {0}")]
    Parse(String),

    /// A function parameter is missing, empty or unparseable
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A function received the wrong number of series
    #[error("Invalid operands: {0}")]
    InvalidOperands(String),

    /// A function received no query results
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Expression references a function that is not registered
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// A spliced fetch failed and its results were discarded
    #[error("Degraded result: {0}")]
    Degraded(String),

    /// Point or sequence contract violation
    #[error("Series error: {0}")]
    Series(#[from] crate::series::SeriesError),

    /// Storage layer error
    #[error("Storage error: {0}")]
    Store(#[from] crate::storage::StoreError),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::SeriesError;

    #[test]
    fn test_error_display() {
        let err = QueryError::UnknownFunction("median".to_string());
        assert_eq!(err.to_string(), "Unknown function: median");
    }

    #[test]
    fn test_series_error_conversion() {
        let err: QueryError = SeriesError::EndOfSequence("x".to_string()).into();
        assert!(matches!(err, QueryError::Series(_)));
    }
}
