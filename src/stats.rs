//! Query statistics
//!
//! Counters and per-stage latency histograms recorded while queries run.
//! Recording never fails; an external collector pulls the values with
//! [`QueryStats::collect_stats`].

use hdrhistogram::Histogram;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Sink for named stat values
pub trait StatsCollector {
    fn record(&mut self, name: &str, value: f64);
}

impl StatsCollector for BTreeMap<String, f64> {
    fn record(&mut self, name: &str, value: f64) {
        self.insert(name.to_string(), value);
    }
}

/// Significant digits kept by latency histograms
const SIGNIFICANT_DIGITS: u8 = 3;

/// Latency distribution in microseconds
///
/// The histogram is created on first use and resizes itself, so recording
/// never fails.
#[derive(Default)]
struct Timer {
    histogram: Mutex<Option<Histogram<u64>>>,
}

impl Timer {
    fn record(&self, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        let Ok(mut slot) = self.histogram.lock() else {
            return;
        };
        if slot.is_none() {
            *slot = Histogram::new(SIGNIFICANT_DIGITS).ok();
        }
        if let Some(histogram) = slot.as_mut() {
            histogram.saturating_record(micros);
        }
    }

    fn snapshot(&self) -> TimerSnapshot {
        let Ok(slot) = self.histogram.lock() else {
            return TimerSnapshot::default();
        };
        let Some(histogram) = slot.as_ref().filter(|h| !h.is_empty()) else {
            return TimerSnapshot::default();
        };
        let ms = |micros: u64| micros as f64 / 1000.0;
        TimerSnapshot {
            count: histogram.len(),
            mean_ms: histogram.mean() / 1000.0,
            min_ms: ms(histogram.min()),
            max_ms: ms(histogram.max()),
            p75_ms: ms(histogram.value_at_quantile(0.75)),
            p95_ms: ms(histogram.value_at_quantile(0.95)),
            p98_ms: ms(histogram.value_at_quantile(0.98)),
            p99_ms: ms(histogram.value_at_quantile(0.99)),
        }
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Timer").field(&self.snapshot()).finish()
    }
}

/// Snapshot of one timer
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TimerSnapshot {
    pub count: u64,
    pub mean_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p75_ms: f64,
    pub p95_ms: f64,
    pub p98_ms: f64,
    pub p99_ms: f64,
}

/// Atomic statistics for query execution
#[derive(Debug, Default)]
pub struct QueryStats {
    /// Top-level queries executed
    queries: AtomicU64,
    /// Metric (leaf) queries executed
    metrics: AtomicU64,
    /// Expression function evaluations
    expressions: AtomicU64,
    /// Raw points returned by storage
    scanned_points: AtomicU64,
    /// Points returned to the client
    response_points: AtomicU64,
    /// Splice executions that degraded
    failed_splices: AtomicU64,

    splice_fetch: Timer,
    splice_merge: Timer,
    downsample: Timer,
    expression: Timer,
}

/// Snapshot of query statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryStatsSnapshot {
    pub queries: u64,
    pub metrics: u64,
    pub expressions: u64,
    pub scanned_points: u64,
    pub response_points: u64,
    pub failed_splices: u64,
    pub splice_fetch: TimerSnapshot,
    pub splice_merge: TimerSnapshot,
    pub downsample: TimerSnapshot,
    pub expression: TimerSnapshot,
}

impl QueryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_metric(&self) {
        self.metrics.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expression(&self, elapsed: Duration) {
        self.expressions.fetch_add(1, Ordering::Relaxed);
        self.expression.record(elapsed);
    }

    pub fn add_scanned_points(&self, count: usize) {
        self.scanned_points.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn add_response_points(&self, count: usize) {
        self.response_points.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_failed_splice(&self) {
        self.failed_splices.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_splice_fetch(&self, elapsed: Duration) {
        self.splice_fetch.record(elapsed);
    }

    pub fn record_splice_merge(&self, elapsed: Duration) {
        self.splice_merge.record(elapsed);
    }

    pub fn record_downsample(&self, elapsed: Duration) {
        self.downsample.record(elapsed);
    }

    pub fn snapshot(&self) -> QueryStatsSnapshot {
        QueryStatsSnapshot {
            queries: self.queries.load(Ordering::Relaxed),
            metrics: self.metrics.load(Ordering::Relaxed),
            expressions: self.expressions.load(Ordering::Relaxed),
            scanned_points: self.scanned_points.load(Ordering::Relaxed),
            response_points: self.response_points.load(Ordering::Relaxed),
            failed_splices: self.failed_splices.load(Ordering::Relaxed),
            splice_fetch: self.splice_fetch.snapshot(),
            splice_merge: self.splice_merge.snapshot(),
            downsample: self.downsample.snapshot(),
            expression: self.expression.snapshot(),
        }
    }

    /// Push every stat into `collector` under `query.*` names
    pub fn collect_stats(&self, collector: &mut dyn StatsCollector) {
        let snap = self.snapshot();
        collector.record("query.count", snap.queries as f64);
        collector.record("query.metrics", snap.metrics as f64);
        collector.record("query.expressions", snap.expressions as f64);
        collector.record("query.scanned_points", snap.scanned_points as f64);
        collector.record("query.response_points", snap.response_points as f64);
        collector.record("query.failed_splices", snap.failed_splices as f64);

        for (name, timer) in [
            ("splice_fetch", snap.splice_fetch),
            ("splice_merge", snap.splice_merge),
            ("downsample", snap.downsample),
            ("expression", snap.expression),
        ] {
            collector.record(&format!("query.{}.count", name), timer.count as f64);
            collector.record(&format!("query.{}.mean_ms", name), timer.mean_ms);
            collector.record(&format!("query.{}.min_ms", name), timer.min_ms);
            collector.record(&format!("query.{}.max_ms", name), timer.max_ms);
            for (percentile, value) in [
                (75, timer.p75_ms),
                (95, timer.p95_ms),
                (98, timer.p98_ms),
                (99, timer.p99_ms),
            ] {
                collector.record(&format!("query.{}.{}thpercentile", name, percentile), value);
            }
        }
    }
}
