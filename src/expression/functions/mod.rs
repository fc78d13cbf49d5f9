//! Built-in series functions
//!
//! - **combine**: `sumSeries`, `multiply`, `difference`, `divide`
//! - **transform**: `id`, `alias`, `scale`, `movingAverage`
//! - **rank**: `highestMax`, `highestCurrent`

mod combine;
mod rank;
mod transform;

pub use combine::{Difference, Divide, Multiply, SumSeries};
pub use rank::{HighestCurrent, HighestMax};
pub use transform::{Alias, Identity, MovingAverage, Scale};

use crate::aggregation::{AggregationIterator, Aggregator, Alignment, Interpolation};
use crate::query::{QueryError, QueryResult, TimeRange};
use crate::series::{Sequence, Series};

/// Fail on an empty result list
fn require_results(function: &str, results: &[Vec<Series>]) -> QueryResult<()> {
    if results.is_empty() {
        return Err(QueryError::EmptyInput(format!(
            "{} needs at least one query result",
            function
        )));
    }
    Ok(())
}

/// Parameter `index`, trimmed; missing or blank is an error
fn require_param<'a>(function: &str, params: &'a [String], index: usize) -> QueryResult<&'a str> {
    match params.get(index).map(|p| p.trim()) {
        Some(param) if !param.is_empty() => Ok(param),
        _ => Err(QueryError::InvalidParameter(format!(
            "{} needs parameter #{}",
            function,
            index + 1
        ))),
    }
}

/// Every series from every group, in group order
fn flatten(results: &[Vec<Series>]) -> Vec<Series> {
    results.iter().flatten().cloned().collect()
}

/// Exactly two series: two single-series groups or one group of two
fn binary_operands(function: &str, results: &[Vec<Series>]) -> QueryResult<(Series, Series)> {
    match results {
        [left, right] if left.len() == 1 && right.len() == 1 => {
            Ok((left[0].clone(), right[0].clone()))
        }
        [group] if group.len() == 2 => Ok((group[0].clone(), group[1].clone())),
        _ => {
            let sizes: Vec<String> = results.iter().map(|g| g.len().to_string()).collect();
            Err(QueryError::InvalidOperands(format!(
                "{} expects exactly two series, got groups of [{}]",
                function,
                sizes.join(", ")
            )))
        }
    }
}

/// Reduce `operands` pointwise over `range`; the result takes the identity
/// of `identity`
fn combine(
    identity: &Series,
    operands: &[Series],
    range: &TimeRange,
    aggregator: Aggregator,
    alignment: Alignment,
) -> QueryResult<Series> {
    let mut iter = AggregationIterator::new(
        operands,
        *range,
        aggregator,
        Interpolation::Lerp,
        alignment,
    );
    let points = iter.collect_points()?;
    Ok(Series::post_aggregated(identity, points))
}
