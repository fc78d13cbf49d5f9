//! Fixed-interval downsampling
//!
//! A [`Downsampler`] wraps any [`Sequence`] and emits one point per
//! non-empty interval, stamped with the interval's aligned start. Empty
//! intervals are skipped. In counter mode, drops in the raw aggregate are
//! treated as counter resets and folded into a running base so the output
//! keeps climbing.

use crate::aggregation::Aggregator;
use crate::query::DownsampleSpec;
use crate::series::{DataPoint, Sequence, Series, SeriesError, SeriesResult};

/// Cursor state, checked at every public entry point
#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    /// No source point pulled yet (fresh, or just re-positioned by `seek`)
    Uninitialized,
    /// `pending` is the first unconsumed source point, if any remain
    Positioned { pending: Option<DataPoint> },
}

/// Running reset correction for monotonic counters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct CounterState {
    base: f64,
    previous: Option<f64>,
}

impl CounterState {
    fn correct(&mut self, raw: f64) -> f64 {
        if let Some(previous) = self.previous {
            if previous > raw {
                self.base += previous;
            }
        }
        self.previous = Some(raw);
        self.base + raw
    }
}

/// Sequence adapter producing one aggregated point per interval
pub struct Downsampler<S: Sequence> {
    source: S,
    interval: i64,
    aggregator: Aggregator,
    counter: Option<CounterState>,
    state: State,
}

impl<S: Sequence> Downsampler<S> {
    /// Wrap `source`. Nothing is read from it until first use.
    ///
    /// # Panics
    /// Panics if `interval` is not positive.
    pub fn new(source: S, interval: i64, aggregator: Aggregator) -> Self {
        assert!(interval > 0, "downsample interval must be positive");
        Self {
            source,
            interval,
            aggregator,
            counter: None,
            state: State::Uninitialized,
        }
    }

    /// Build from a parsed downsample spec
    pub fn from_spec(source: S, spec: &DownsampleSpec) -> Self {
        let downsampler = Self::new(source, spec.interval_ms, spec.aggregator);
        if spec.counter {
            downsampler.counter()
        } else {
            downsampler
        }
    }

    /// Builder method: enable counter-reset correction
    pub fn counter(mut self) -> Self {
        self.counter = Some(CounterState::default());
        self
    }

    pub fn interval(&self) -> i64 {
        self.interval
    }

    pub fn is_counter(&self) -> bool {
        self.counter.is_some()
    }

    /// Start of the interval containing `timestamp`
    pub fn align(&self, timestamp: i64) -> i64 {
        timestamp - timestamp.rem_euclid(self.interval)
    }

    fn pending(&mut self) -> Option<DataPoint> {
        match self.state {
            State::Positioned { pending } => pending,
            State::Uninitialized => {
                let pending = self.pull();
                self.state = State::Positioned { pending };
                pending
            }
        }
    }

    fn pull(&mut self) -> Option<DataPoint> {
        if !self.source.has_next() {
            return None;
        }
        match self.source.next() {
            Ok(point) => Some(point),
            Err(e) => {
                tracing::warn!("Downsample source ended early: {}", e);
                None
            }
        }
    }
}

impl<S: Sequence> Sequence for Downsampler<S> {
    fn has_next(&mut self) -> bool {
        self.pending().is_some()
    }

    fn next(&mut self) -> SeriesResult<DataPoint> {
        let first = self.pending().ok_or_else(|| {
            SeriesError::EndOfSequence(format!("downsampler ({}ms interval)", self.interval))
        })?;

        let start = self.align(first.timestamp);
        let end = start.saturating_add(self.interval);

        let mut values = vec![first.to_f64()];
        let mut pending = None;
        while let Some(point) = self.pull() {
            if point.timestamp < end {
                values.push(point.to_f64());
            } else {
                pending = Some(point);
                break;
            }
        }
        self.state = State::Positioned { pending };

        let raw = self.aggregator.apply(&values).ok_or_else(|| {
            SeriesError::EndOfSequence(format!("empty interval at {}", start))
        })?;

        let value = match self.counter.as_mut() {
            Some(counter) => {
                let corrected = counter.correct(raw);
                tracing::trace!(
                    "Counter interval {}: raw {} corrected {}",
                    start,
                    raw,
                    corrected
                );
                corrected
            }
            None => raw,
        };

        Ok(DataPoint::float(start, value))
    }

    fn seek(&mut self, target: i64) {
        let aligned = self.align(target.saturating_add(self.interval - 1));
        self.source.seek(aligned);
        self.state = State::Uninitialized;
    }
}

/// Downsample a whole series, keeping its identity
pub fn downsample_series(series: &Series, spec: &DownsampleSpec) -> SeriesResult<Series> {
    let mut downsampler = Downsampler::from_spec(series.iterator(), spec);
    let points = downsampler.collect_points()?;
    Ok(Series::post_aggregated(series, points))
}
