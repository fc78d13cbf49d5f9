//! Multi-series aggregation iterator
//!
//! Walks N materialised series in timestamp order. At each distinct
//! timestamp every series either contributes an exact point, an
//! interpolated value (if it has points on both sides), or nothing.
//!
//! ```text
//! a:  1----3---------7
//! b:     2-----5
//! ts: 1  2 3   5     7
//!     a  a b a a b   a      (b only between 2 and 5)
//!        b   b
//! ```

use crate::aggregation::{Aggregator, Interpolation};
use crate::query::TimeRange;
use crate::series::{DataPoint, Sequence, Series, SeriesError, SeriesResult, Value};
use std::sync::Arc;

/// Which timestamps the iterator visits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// Union of all input timestamps inside the query window
    Union,
    /// Only timestamps inside the overlap of every input
    Endpoints,
}

/// One series' value at a step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution {
    /// Index of the series in the iterator's input order
    pub series: usize,
    pub value: Value,
    /// True if the value was produced by interpolation
    pub interpolated: bool,
}

/// All contributions at one timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub timestamp: i64,
    pub contributions: Vec<Contribution>,
}

/// Iterator combining several series into one
pub struct AggregationIterator {
    series: Vec<Arc<[DataPoint]>>,
    cursors: Vec<usize>,
    upper: i64,
    aggregator: Aggregator,
    interpolation: Interpolation,
}

impl AggregationIterator {
    /// Build an iterator over `series`, bounded to `range` (inclusive)
    pub fn new(
        series: &[Series],
        range: TimeRange,
        aggregator: Aggregator,
        interpolation: Interpolation,
        alignment: Alignment,
    ) -> Self {
        let points: Vec<Arc<[DataPoint]>> = series.iter().map(Series::shared_points).collect();

        let mut lower = range.start;
        let mut upper = range.end;
        if alignment == Alignment::Endpoints {
            for pts in &points {
                match (pts.first(), pts.last()) {
                    (Some(first), Some(last)) => {
                        lower = lower.max(first.timestamp);
                        upper = upper.min(last.timestamp);
                    }
                    // An empty operand leaves no overlap
                    _ => upper = i64::MIN,
                }
            }
        }

        let cursors = points
            .iter()
            .map(|pts| pts.partition_point(|p| p.timestamp < lower))
            .collect();

        Self {
            series: points,
            cursors,
            upper,
            aggregator,
            interpolation,
        }
    }

    /// Number of input series
    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    /// Timestamp of the next step, if any
    fn next_timestamp(&self) -> Option<i64> {
        self.series
            .iter()
            .zip(&self.cursors)
            .filter_map(|(pts, &c)| pts.get(c).map(|p| p.timestamp))
            .min()
            .filter(|&ts| ts <= self.upper)
    }

    /// Advance one timestamp and report every series' contribution
    pub fn next_step(&mut self) -> Option<Step> {
        let timestamp = self.next_timestamp()?;
        let mut contributions = Vec::with_capacity(self.series.len());

        for (index, points) in self.series.iter().enumerate() {
            let cursor = &mut self.cursors[index];

            if *cursor < points.len() && points[*cursor].timestamp == timestamp {
                // Duplicate timestamps inside one series: the last one wins
                while *cursor + 1 < points.len() && points[*cursor + 1].timestamp == timestamp {
                    *cursor += 1;
                }
                contributions.push(Contribution {
                    series: index,
                    value: points[*cursor].value,
                    interpolated: false,
                });
                *cursor += 1;
            } else if *cursor > 0 && *cursor < points.len() {
                let prev = points[*cursor - 1];
                let next = points[*cursor];
                let value = match self.interpolation {
                    Interpolation::Lerp => lerp(&prev, &next, timestamp),
                    Interpolation::Zim => 0.0,
                };
                contributions.push(Contribution {
                    series: index,
                    value: Value::Float(value),
                    interpolated: true,
                });
            }
        }

        Some(Step {
            timestamp,
            contributions,
        })
    }

    /// Reduce a step with the configured aggregator
    fn reduce(&self, step: &Step) -> SeriesResult<DataPoint> {
        let all_exact_integers = step
            .contributions
            .iter()
            .all(|c| !c.interpolated && c.value.is_integer());

        if all_exact_integers {
            let values: Vec<i64> = step
                .contributions
                .iter()
                .filter_map(|c| match c.value {
                    Value::Integer(v) => Some(v),
                    Value::Float(_) => None,
                })
                .collect();
            if let Some(v) = self.aggregator.apply_integers(&values) {
                return Ok(DataPoint::integer(step.timestamp, v));
            }
        }

        let values: Vec<f64> = step.contributions.iter().map(|c| c.value.to_f64()).collect();
        self.aggregator
            .apply(&values)
            .map(|v| DataPoint::float(step.timestamp, v))
            .ok_or_else(|| {
                SeriesError::EndOfSequence(format!("no values at timestamp {}", step.timestamp))
            })
    }
}

impl Sequence for AggregationIterator {
    fn has_next(&mut self) -> bool {
        self.next_timestamp().is_some()
    }

    fn next(&mut self) -> SeriesResult<DataPoint> {
        let step = self.next_step().ok_or_else(|| {
            SeriesError::EndOfSequence(format!(
                "aggregation iterator over {} series",
                self.series.len()
            ))
        })?;
        self.reduce(&step)
    }

    fn seek(&mut self, target: i64) {
        for (points, cursor) in self.series.iter().zip(self.cursors.iter_mut()) {
            let position = points.partition_point(|p| p.timestamp < target);
            *cursor = (*cursor).max(position);
        }
    }
}

fn lerp(prev: &DataPoint, next: &DataPoint, timestamp: i64) -> f64 {
    let span = (next.timestamp - prev.timestamp) as f64;
    let offset = (timestamp - prev.timestamp) as f64;
    let (y0, y1) = (prev.to_f64(), next.to_f64());
    y0 + (y1 - y0) * offset / span
}
