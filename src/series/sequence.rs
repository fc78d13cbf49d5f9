//! Forward-only point sequences
//!
//! Every consumer in the pipeline pulls points through [`Sequence`]: the
//! downsampler, the aggregation iterator and the function library.

use crate::series::error::{SeriesError, SeriesResult};
use crate::series::point::DataPoint;
use std::sync::Arc;

/// A single-pass cursor over an ordered run of points
///
/// `has_next` is idempotent from the caller's point of view. It takes
/// `&mut self` so implementations may defer work until first use. `seek`
/// only moves forward: seeking behind the cursor is unspecified.
pub trait Sequence {
    /// Whether another point is available
    fn has_next(&mut self) -> bool;

    /// Return the next point and advance
    fn next(&mut self) -> SeriesResult<DataPoint>;

    /// Position the cursor on the first point with `timestamp >= target`
    /// (after any implementation-specific rounding of `target`)
    fn seek(&mut self, target: i64);

    /// Drain the remaining points into a vector
    fn collect_points(&mut self) -> SeriesResult<Vec<DataPoint>>
    where
        Self: Sized,
    {
        let mut points = Vec::new();
        while self.has_next() {
            points.push(self.next()?);
        }
        Ok(points)
    }
}

/// Sequence over a shared, timestamp-sorted point slice
#[derive(Debug, Clone)]
pub struct SliceSequence {
    points: Arc<[DataPoint]>,
    pos: usize,
}

impl SliceSequence {
    pub fn new(points: Arc<[DataPoint]>) -> Self {
        Self { points, pos: 0 }
    }

    /// Index of the next point to be returned
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl Sequence for SliceSequence {
    fn has_next(&mut self) -> bool {
        self.pos < self.points.len()
    }

    fn next(&mut self) -> SeriesResult<DataPoint> {
        match self.points.get(self.pos) {
            Some(point) => {
                self.pos += 1;
                Ok(*point)
            }
            None => Err(SeriesError::EndOfSequence(format!(
                "slice sequence of {} points",
                self.points.len()
            ))),
        }
    }

    fn seek(&mut self, target: i64) {
        let remaining = &self.points[self.pos..];
        self.pos += remaining.partition_point(|p| p.timestamp < target);
    }
}
