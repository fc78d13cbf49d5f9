//! Named, tagged series
//!
//! A [`Series`] pairs an identity ([`SeriesMeta`]) with an immutable,
//! timestamp-sorted point array. Derived ("post-aggregated") series share
//! their base's identity and substitute their own points.

use crate::series::error::{SeriesError, SeriesResult};
use crate::series::point::{DataPoint, Value};
use crate::series::sequence::SliceSequence;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Free-form note attached to a time span of a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Start of the annotated span (ms)
    pub start_time: i64,
    /// Optional end of the annotated span (ms)
    #[serde(default)]
    pub end_time: Option<i64>,
    /// Short description
    pub description: String,
    /// Arbitrary key/value details
    #[serde(default)]
    pub custom: BTreeMap<String, String>,
}

/// Identity metadata of a series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesMeta {
    /// Metric name
    pub metric: String,
    /// Tags that identify the series (all significant)
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Tag keys collapsed by upstream aggregation
    #[serde(default)]
    pub aggregated_tags: Vec<String>,
    /// Underlying time series ids, if the store exposes them
    #[serde(default)]
    pub tsuids: Vec<String>,
    /// Annotations carried through from storage
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl SeriesMeta {
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            ..Default::default()
        }
    }

    /// Builder method: add a tag
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Builder method: add an aggregated tag key
    pub fn aggregated_tag(mut self, key: impl Into<String>) -> Self {
        self.aggregated_tags.push(key.into());
        self
    }
}

/// Identity used to match series across buckets and expressions
///
/// Aggregated tags are held as a set, so their order never matters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature {
    pub metric: String,
    pub tags: BTreeMap<String, String>,
    pub aggregated_tags: BTreeSet<String>,
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{{", self.metric)?;
        for (i, (k, v)) in self.tags.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        write!(f, "}}")?;
        if !self.aggregated_tags.is_empty() {
            let keys: Vec<&str> = self.aggregated_tags.iter().map(String::as_str).collect();
            write!(f, " agg=[{}]", keys.join(","))?;
        }
        Ok(())
    }
}

/// An immutable series of points with identity metadata
#[derive(Debug, Clone)]
pub struct Series {
    meta: Arc<SeriesMeta>,
    points: Arc<[DataPoint]>,
    alias: Option<String>,
}

impl Series {
    /// Create a series, sorting points ascending by timestamp
    pub fn new(meta: SeriesMeta, points: Vec<DataPoint>) -> Self {
        Self::from_parts(Arc::new(meta), points, None)
    }

    /// Derive a series from `base`: same identity (and alias), new points
    pub fn post_aggregated(base: &Series, points: Vec<DataPoint>) -> Self {
        Self::from_parts(Arc::clone(&base.meta), points, base.alias.clone())
    }

    fn from_parts(meta: Arc<SeriesMeta>, mut points: Vec<DataPoint>, alias: Option<String>) -> Self {
        // Stable sort keeps storage order for equal timestamps
        points.sort_by_key(|p| p.timestamp);
        Self {
            meta,
            points: points.into(),
            alias,
        }
    }

    /// Return a copy reporting `alias` as metric name and no tags
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Reported metric name (alias if set)
    pub fn metric_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.meta.metric)
    }

    /// Alias, if one was applied
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Reported tags: empty once aliased
    pub fn tags(&self) -> BTreeMap<String, String> {
        if self.alias.is_some() {
            BTreeMap::new()
        } else {
            self.meta.tags.clone()
        }
    }

    pub fn aggregated_tags(&self) -> &[String] {
        &self.meta.aggregated_tags
    }

    pub fn tsuids(&self) -> &[String] {
        &self.meta.tsuids
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.meta.annotations
    }

    /// Raw identity, ignoring any alias
    pub fn meta(&self) -> &SeriesMeta {
        &self.meta
    }

    /// Signature of the raw identity
    pub fn signature(&self) -> Signature {
        Signature {
            metric: self.meta.metric.clone(),
            tags: self.meta.tags.clone(),
            aggregated_tags: self.meta.aggregated_tags.iter().cloned().collect(),
        }
    }

    pub fn size(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Point at index `i`
    pub fn point(&self, i: usize) -> SeriesResult<DataPoint> {
        self.points
            .get(i)
            .copied()
            .ok_or(SeriesError::IndexOutOfBounds {
                index: i,
                size: self.points.len(),
            })
    }

    pub fn timestamp(&self, i: usize) -> SeriesResult<i64> {
        self.point(i).map(|p| p.timestamp)
    }

    pub fn value(&self, i: usize) -> SeriesResult<Value> {
        self.point(i).map(|p| p.value)
    }

    pub fn is_integer(&self, i: usize) -> SeriesResult<bool> {
        self.point(i).map(|p| p.is_integer())
    }

    /// Backing points, sorted by timestamp
    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    /// Shared handle to the backing points
    pub fn shared_points(&self) -> Arc<[DataPoint]> {
        Arc::clone(&self.points)
    }

    /// A fresh sequence over the points
    pub fn iterator(&self) -> SliceSequence {
        SliceSequence::new(self.shared_points())
    }

    /// Serializable view of the series as reported to clients
    pub fn to_output(&self) -> SeriesOutput {
        SeriesOutput {
            metric: self.metric_name().to_string(),
            tags: self.tags(),
            aggregated_tags: self.meta.aggregated_tags.clone(),
            dps: self.points.to_vec(),
        }
    }
}

/// Client-facing rendering of a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesOutput {
    pub metric: String,
    pub tags: BTreeMap<String, String>,
    #[serde(rename = "aggregateTags")]
    pub aggregated_tags: Vec<String>,
    pub dps: Vec<DataPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::sequence::Sequence;

    fn web1() -> SeriesMeta {
        SeriesMeta::new("cpu").tag("host", "web1").tag("dc", "east")
    }

    #[test]
    fn test_points_are_sorted() {
        let series = Series::new(
            web1(),
            vec![
                DataPoint::integer(10, 2),
                DataPoint::integer(5, 1),
                DataPoint::integer(13, 3),
            ],
        );

        let timestamps: Vec<i64> = series.points().iter().map(|p| p.timestamp).collect();
        assert_eq!(timestamps, vec![5, 10, 13]);
        assert_eq!(series.timestamp(0).unwrap(), 5);
        assert_eq!(series.value(2).unwrap(), Value::Integer(3));
        assert!(series.is_integer(1).unwrap());
    }

    #[test]
    fn test_index_out_of_bounds() {
        let series = Series::new(web1(), vec![DataPoint::integer(1, 1)]);
        assert_eq!(
            series.timestamp(3),
            Err(SeriesError::IndexOutOfBounds { index: 3, size: 1 })
        );
    }

    #[test]
    fn test_post_aggregated_shares_identity() {
        let base = Series::new(web1(), vec![DataPoint::integer(1, 1)]);
        let derived = Series::post_aggregated(&base, vec![DataPoint::float(2, 0.5)]);

        assert_eq!(derived.metric_name(), "cpu");
        assert_eq!(derived.tags(), base.tags());
        assert_eq!(derived.signature(), base.signature());
        assert_eq!(derived.size(), 1);
        assert_eq!(base.size(), 1);
    }

    #[test]
    fn test_alias_hides_tags() {
        let series = Series::new(web1(), vec![]).with_alias("host-web1");

        assert_eq!(series.metric_name(), "host-web1");
        assert!(series.tags().is_empty());
        // Raw identity is untouched
        assert_eq!(series.meta().metric, "cpu");
        assert_eq!(series.signature().tags.len(), 2);
    }

    #[test]
    fn test_signature_ignores_aggregated_tag_order() {
        let a = Series::new(
            SeriesMeta::new("cpu").aggregated_tag("host").aggregated_tag("dc"),
            vec![],
        );
        let b = Series::new(
            SeriesMeta::new("cpu").aggregated_tag("dc").aggregated_tag("host"),
            vec![],
        );
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn test_fresh_iterators() {
        let series = Series::new(web1(), vec![DataPoint::integer(1, 1), DataPoint::integer(2, 2)]);

        let mut first = series.iterator();
        first.next().unwrap();
        first.next().unwrap();
        assert!(!first.has_next());

        let mut second = series.iterator();
        assert!(second.has_next());
    }

    #[test]
    fn test_output_rendering() {
        let series = Series::new(web1(), vec![DataPoint::integer(1, 1)]).with_alias("x");
        let output = series.to_output();
        assert_eq!(output.metric, "x");
        assert!(output.tags.is_empty());
        assert_eq!(output.dps, vec![DataPoint::integer(1, 1)]);
    }
}
