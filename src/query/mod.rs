//! Chronicle Query Types
//!
//! - **Types**: `TimeRange`, `SeriesQuery`, `DownsampleSpec`
//! - **Parser**: parse metric query strings into `SeriesQuery`
//! - **Error**: `QueryError`, shared by splicing and expression evaluation
//!
//! # Metric Query Language
//!
//! ```text
//! aggregator:[interval-aggregator[-counter]:]metric[{key=value,...}]
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use chronicle_pipeline::query::{parse_metric_query, TimeRange};
//!
//! let query = parse_metric_query("sum:1m-avg:cpu{host=*}", TimeRange::last_hours(1))?;
//! ```

mod error;
mod parser;
mod types;

pub use error::{QueryError, QueryResult};
pub use parser::{parse_interval, parse_metric_query, parse_time_spec};
pub use types::{DownsampleSpec, SeriesQuery, TimeRange};
