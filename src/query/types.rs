//! Query types
//!
//! - `TimeRange`: the window a query covers
//! - `SeriesQuery`: one metric query as handed to the storage collaborator
//! - `DownsampleSpec`: optional per-query downsampling

use crate::aggregation::Aggregator;
use chrono::Utc;
use std::collections::BTreeMap;

/// Time range for queries, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// Start timestamp, in milliseconds
    pub start: i64,
    /// End timestamp, in milliseconds
    pub end: i64,
}

impl TimeRange {
    /// Create a new time range
    ///
    /// # Panics
    /// Panics if start >= end
    pub fn new(start: i64, end: i64) -> Self {
        assert!(start < end, "TimeRange: start must be less than end");
        Self { start, end }
    }

    /// Create a time range, returning None if invalid
    pub fn try_new(start: i64, end: i64) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Create a range for the last N hours from now
    pub fn last_hours(hours: i64) -> Self {
        let end = Utc::now().timestamp_millis();
        let start = end - (hours * 3600 * 1000);
        Self { start, end }
    }

    /// Check if a timestamp falls within `[start, end]`
    pub fn contains_inclusive(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }

    /// Get the duration in milliseconds
    pub fn duration_millis(&self) -> i64 {
        self.end - self.start
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Downsampling applied to every series a query returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownsampleSpec {
    /// Interval length in milliseconds
    pub interval_ms: i64,
    /// Reduction applied per interval
    pub aggregator: Aggregator,
    /// Treat the source as a monotonic counter and correct resets
    pub counter: bool,
}

/// A single metric query
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesQuery {
    /// Metric name
    pub metric: String,
    /// Tag filters; a value of `*` groups by that key
    pub tags: BTreeMap<String, String>,
    /// Aggregator combining series that fall into one group
    pub aggregator: Aggregator,
    /// Optional downsampling
    pub downsample: Option<DownsampleSpec>,
    /// Window to fetch
    pub time_range: TimeRange,
}

impl SeriesQuery {
    pub fn new(metric: impl Into<String>, time_range: TimeRange) -> Self {
        Self {
            metric: metric.into(),
            tags: BTreeMap::new(),
            aggregator: Aggregator::Sum,
            downsample: None,
            time_range,
        }
    }

    /// Builder method: add a tag filter
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Builder method: set the group aggregator
    pub fn aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// Builder method: set downsampling
    pub fn downsample(mut self, spec: DownsampleSpec) -> Self {
        self.downsample = Some(spec);
        self
    }

    /// Copy of this query restricted to `range`
    pub fn scoped(&self, range: TimeRange) -> Self {
        Self {
            time_range: range,
            ..self.clone()
        }
    }
}

impl std::fmt::Display for SeriesQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:", self.aggregator)?;
        if let Some(ds) = &self.downsample {
            write!(f, "{}ms-{}", ds.interval_ms, ds.aggregator)?;
            if ds.counter {
                write!(f, "-counter")?;
            }
            write!(f, ":")?;
        }
        write!(f, "{}", self.metric)?;
        if !self.tags.is_empty() {
            let tags: Vec<String> = self.tags.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            write!(f, "{{{}}}", tags.join(","))?;
        }
        write!(f, " {}", self.time_range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_contains_inclusive() {
        let range = TimeRange::new(1000, 2000);

        assert!(!range.contains_inclusive(999));
        assert!(range.contains_inclusive(1000));
        assert!(range.contains_inclusive(2000));
        assert!(!range.contains_inclusive(2001));
        assert_eq!(range.duration_millis(), 1000);
    }

    #[test]
    fn test_try_new_rejects_inverted() {
        assert!(TimeRange::try_new(5, 5).is_none());
        assert!(TimeRange::try_new(5, 6).is_some());
    }

    #[test]
    fn test_scoped_copy() {
        let query = SeriesQuery::new("cpu", TimeRange::new(0, 100))
            .tag("host", "web1")
            .aggregator(Aggregator::Max);
        let scoped = query.scoped(TimeRange::new(10, 20));

        assert_eq!(scoped.time_range, TimeRange::new(10, 20));
        assert_eq!(scoped.tags, query.tags);
        assert_eq!(scoped.aggregator, Aggregator::Max);
    }

    #[test]
    fn test_display() {
        let query = SeriesQuery::new("cpu", TimeRange::new(0, 100)).tag("host", "*");
        assert_eq!(query.to_string(), "sum:cpu{host=*} [0, 100]");
    }
}
