//! # Chronicle Pipeline
//!
//! Query post-processing for time-series data: turns raw per-series point
//! streams into the bounded, aggregated, expression-transformed output a
//! client asked for.
//!
//! ## Features
//!
//! - **Lazy sequences**: every stage pulls points through one forward-only cursor
//! - **Downsampling**: fixed-interval reduction with counter-reset correction
//! - **Query splicing**: long windows fetched as concurrent buckets and merged back
//! - **Expressions**: `sumSeries`, `divide`, `movingAverage`, `highestMax` and friends
//!
//! ## Modules
//!
//! - [`series`]: points, sequences and tagged series
//! - [`aggregation`]: aggregators and the multi-series aggregation iterator
//! - [`downsample`]: the interval downsampler
//! - [`query`]: metric query types and parser
//! - [`storage`]: the store collaborator trait and an in-memory store
//! - [`splice`]: parallel bucket fetch and merge
//! - [`expression`]: function library, parser and evaluator
//! - [`stats`]: query counters and timers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chronicle_pipeline::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryStore::from_json(&std::fs::read_to_string("series.json")?)?;
//!     let splicer = QuerySplicer::new(Arc::new(store), SplicerConfig::default());
//!     let evaluator = ExpressionEvaluator::new(splicer);
//!
//!     let range = TimeRange::last_hours(24);
//!     let series = evaluator
//!         .evaluate("highestMax(movingAverage(sum:1m-avg:cpu{host=*},,'5min'),,3)", range)
//!         .await?;
//!
//!     println!("Top {} hosts", series.len());
//!     Ok(())
//! }
//! ```

pub mod aggregation;
pub mod config;
pub mod downsample;
pub mod expression;
pub mod query;
pub mod series;
pub mod splice;
pub mod stats;
pub mod storage;

// Re-export top-level types for convenience
pub use series::{
    Annotation, DataPoint, Sequence, Series, SeriesError, SeriesMeta, SeriesOutput, SeriesResult,
    Signature, SliceSequence, Value,
};

pub use aggregation::{AggregationIterator, Aggregator, Alignment, Interpolation};

pub use downsample::{downsample_series, Downsampler};

pub use query::{
    parse_metric_query, parse_time_spec, DownsampleSpec, QueryError, QueryResult, SeriesQuery,
    TimeRange,
};

pub use storage::{MemoryStore, SeriesStore, StoreError, StoreResult};

pub use splice::{QuerySplicer, SpliceResult, SpliceStatus};

pub use expression::{
    parse_expression, Expression, ExpressionEvaluator, ExpressionTree, FunctionRegistry,
};

pub use stats::{QueryStats, QueryStatsSnapshot, StatsCollector};

pub use config::{Config, ConfigError, LoggingConfig, SplicerConfig};
