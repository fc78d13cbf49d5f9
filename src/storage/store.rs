//! Storage collaborator interface
//!
//! The pipeline never reads durable storage itself. Everything it needs is
//! "run this metric query over this window and give me raw series".

use crate::query::SeriesQuery;
use crate::series::Series;
use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by a series store
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store gave up on the query
    #[error("Store timeout: {0}")]
    Timeout(String),

    /// Stored data could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Any other backend failure
    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Source of raw series for a scoped query
#[async_trait]
pub trait SeriesStore: Send + Sync {
    /// Fetch every series matching `query` over `query.time_range`
    ///
    /// Implementations may return points slightly outside the window;
    /// callers re-filter.
    async fn fetch(&self, query: &SeriesQuery) -> StoreResult<Vec<Series>>;
}
