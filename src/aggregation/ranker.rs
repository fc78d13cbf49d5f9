//! Per-series max / latest tracking
//!
//! Fed with every step of an [`AggregationIterator`](super::AggregationIterator),
//! the ranker remembers each series' maximum or most recent value so the
//! top-k functions can order series after a single pass.

use crate::aggregation::Step;

/// What a series is ranked by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankBy {
    /// Maximum value over the window
    Max,
    /// Last value over the window
    Latest,
}

/// Tracks one ranking value per series
#[derive(Debug, Clone)]
pub struct SeriesRanker {
    rank_by: RankBy,
    values: Vec<Option<f64>>,
}

impl SeriesRanker {
    pub fn new(rank_by: RankBy, series_count: usize) -> Self {
        Self {
            rank_by,
            values: vec![None; series_count],
        }
    }

    /// Record the contributions of one step
    pub fn observe(&mut self, step: &Step) {
        for contribution in &step.contributions {
            let Some(slot) = self.values.get_mut(contribution.series) else {
                continue;
            };
            let value = contribution.value.to_f64();
            *slot = match (self.rank_by, *slot) {
                (RankBy::Max, Some(current)) => Some(current.max(value)),
                _ => Some(value),
            };
        }
    }

    /// Tracked value of a series (`None` if it never contributed)
    pub fn value(&self, series: usize) -> Option<f64> {
        self.values.get(series).copied().flatten()
    }

    /// Series indexes in descending rank order
    ///
    /// Ties keep input order. Series that never contributed rank last.
    pub fn ranking(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.values.len()).collect();
        order.sort_by(|&a, &b| {
            let va = self.values[a].unwrap_or(f64::NEG_INFINITY);
            let vb = self.values[b].unwrap_or(f64::NEG_INFINITY);
            vb.total_cmp(&va)
        });
        order
    }
}
