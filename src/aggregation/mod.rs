//! Aggregation primitives
//!
//! Reductions and multi-series combination used by the downsampler, the
//! storage layer and the expression function library:
//!
//! - **Aggregator**: reduce a set of values to one
//! - **AggregationIterator**: walk N series in timestamp order, interpolating
//!   series that lack a point at the current timestamp
//! - **SeriesRanker**: per-series max / latest tracking for top-k selection
//! - **MovingWindow**: sliding average over a count of points or a duration

mod iterator;
mod moving;
mod ranker;

pub use iterator::{AggregationIterator, Alignment, Contribution, Step};
pub use moving::{moving_average, MovingWindow};
pub use ranker::{RankBy, SeriesRanker};

use serde::{Deserialize, Serialize};

/// Reduction strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregator {
    /// Sum of values
    Sum,
    /// Product of values
    #[serde(alias = "multiply")]
    Mult,
    /// Average of values
    Avg,
    /// Minimum value
    Min,
    /// Maximum value
    Max,
    /// Count of values
    Count,
    /// First value
    First,
    /// Last value
    Last,
}

impl Aggregator {
    /// Apply aggregation to a slice of values
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }

        Some(match self {
            Self::Sum => values.iter().sum(),
            Self::Mult => values.iter().product(),
            Self::Avg => values.iter().sum::<f64>() / values.len() as f64,
            Self::Min => values.iter().cloned().fold(f64::INFINITY, f64::min),
            Self::Max => values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            Self::Count => values.len() as f64,
            Self::First => *values.first()?,
            Self::Last => *values.last()?,
        })
    }

    /// Integer-preserving aggregation. `None` for aggregators whose result
    /// is not integral (avg) or on overflow.
    pub fn apply_integers(&self, values: &[i64]) -> Option<i64> {
        if values.is_empty() {
            return None;
        }

        match self {
            Self::Sum => values.iter().try_fold(0i64, |acc, &v| acc.checked_add(v)),
            Self::Mult => values.iter().try_fold(1i64, |acc, &v| acc.checked_mul(v)),
            Self::Avg => None,
            Self::Min => values.iter().copied().min(),
            Self::Max => values.iter().copied().max(),
            Self::Count => i64::try_from(values.len()).ok(),
            Self::First => values.first().copied(),
            Self::Last => values.last().copied(),
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sum" => Some(Self::Sum),
            "mult" | "multiply" => Some(Self::Mult),
            "avg" | "average" => Some(Self::Avg),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "count" => Some(Self::Count),
            "first" => Some(Self::First),
            "last" => Some(Self::Last),
            _ => None,
        }
    }
}

impl std::fmt::Display for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sum => write!(f, "sum"),
            Self::Mult => write!(f, "mult"),
            Self::Avg => write!(f, "avg"),
            Self::Min => write!(f, "min"),
            Self::Max => write!(f, "max"),
            Self::Count => write!(f, "count"),
            Self::First => write!(f, "first"),
            Self::Last => write!(f, "last"),
        }
    }
}

/// How a value is produced for a series lacking a point at a timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    /// Linear interpolation between the surrounding points
    #[default]
    Lerp,
    /// Zero if missing
    Zim,
}
