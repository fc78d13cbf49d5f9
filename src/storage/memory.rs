//! In-memory series store
//!
//! Holds raw series and answers metric queries the way a TSDB read path
//! would: filter by metric and tags, group by wildcard tags and aggregate
//! each group across its members inside the query window. Members keep
//! their points outside the window so they can still be interpolated at
//! its edges.

use crate::aggregation::{AggregationIterator, Alignment, Interpolation};
use crate::query::SeriesQuery;
use crate::series::{DataPoint, Sequence, Series, SeriesMeta};
use crate::storage::store::{SeriesStore, StoreError, StoreResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// On-disk / JSON form of a raw series
#[derive(Debug, Clone, Deserialize)]
pub struct SeriesRecord {
    #[serde(flatten)]
    pub meta: SeriesMeta,
    #[serde(default)]
    pub dps: Vec<DataPoint>,
}

/// Thread-safe in-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    series: Arc<RwLock<Vec<Series>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-loaded with `series`
    pub fn with_series(series: Vec<Series>) -> Self {
        Self {
            series: Arc::new(RwLock::new(series)),
        }
    }

    /// Parse a JSON array of series records
    pub fn from_json(json: &str) -> StoreResult<Self> {
        let records: Vec<SeriesRecord> = serde_json::from_str(json)?;
        let series = records
            .into_iter()
            .map(|record| Series::new(record.meta, record.dps))
            .collect();
        Ok(Self::with_series(series))
    }

    pub async fn insert(&self, series: Series) {
        self.series.write().await.push(series);
    }

    pub async fn len(&self) -> usize {
        self.series.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.series.read().await.is_empty()
    }
}

#[async_trait]
impl SeriesStore for MemoryStore {
    async fn fetch(&self, query: &SeriesQuery) -> StoreResult<Vec<Series>> {
        let stored = self.series.read().await;

        let group_keys: Vec<&String> = query
            .tags
            .iter()
            .filter(|(_, v)| is_group_by(v))
            .map(|(k, _)| k)
            .collect();

        // Group key -> matching series
        let mut groups: BTreeMap<Vec<String>, Vec<Series>> = BTreeMap::new();
        for series in stored.iter() {
            if series.meta().metric != query.metric || !matches_tags(series, &query.tags) {
                continue;
            }
            let key = group_keys
                .iter()
                .map(|k| series.meta().tags.get(*k).cloned().unwrap_or_default())
                .collect();
            groups.entry(key).or_default().push(series.clone());
        }

        let mut results = Vec::with_capacity(groups.len());
        for members in groups.into_values() {
            let meta = merged_meta(&query.metric, &members);
            let mut iter = AggregationIterator::new(
                &members,
                query.time_range,
                query.aggregator,
                Interpolation::Lerp,
                Alignment::Union,
            );
            let points = iter
                .collect_points()
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            results.push(Series::new(meta, points));
        }

        tracing::debug!("Memory store answered {} with {} series", query, results.len());
        Ok(results)
    }
}

/// Wildcard and alternation filters split results into groups
fn is_group_by(filter: &str) -> bool {
    filter == "*" || filter.contains('|')
}

fn matches_tags(series: &Series, filters: &BTreeMap<String, String>) -> bool {
    filters.iter().all(|(key, filter)| {
        match series.meta().tags.get(key) {
            None => false,
            Some(_) if filter == "*" => true,
            Some(value) => filter.split('|').any(|alt| alt == value),
        }
    })
}

/// Identity of an aggregated group: tags shared by all members stay tags,
/// keys whose values differ become aggregated tags
fn merged_meta(metric: &str, members: &[Series]) -> SeriesMeta {
    let mut meta = SeriesMeta::new(metric);
    let Some(first) = members.first() else {
        return meta;
    };

    let mut tags = first.meta().tags.clone();
    let mut aggregated: BTreeSet<String> = first.meta().aggregated_tags.iter().cloned().collect();

    for member in &members[1..] {
        let other = &member.meta().tags;
        let differing: Vec<String> = tags
            .iter()
            .filter(|(k, v)| other.get(*k) != Some(*v))
            .map(|(k, _)| k.clone())
            .collect();
        for key in differing {
            tags.remove(&key);
            aggregated.insert(key);
        }
        aggregated.extend(other.keys().filter(|k| !tags.contains_key(*k)).cloned());
        aggregated.extend(member.meta().aggregated_tags.iter().cloned());
    }

    meta.tags = tags;
    meta.aggregated_tags = aggregated.into_iter().collect();
    meta.tsuids = members
        .iter()
        .flat_map(|m| m.tsuids().iter().cloned())
        .collect();
    meta.annotations = members
        .iter()
        .flat_map(|m| m.annotations().iter().cloned())
        .collect();
    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::Aggregator;
    use crate::query::TimeRange;

    fn raw(host: &str, dc: &str, points: &[(i64, i64)]) -> Series {
        Series::new(
            SeriesMeta::new("cpu").tag("host", host).tag("dc", dc),
            points.iter().map(|&(t, v)| DataPoint::integer(t, v)).collect(),
        )
    }

    fn store() -> MemoryStore {
        MemoryStore::with_series(vec![
            raw("web1", "east", &[(0, 1), (10, 2), (20, 3)]),
            raw("web2", "east", &[(0, 10), (10, 20), (20, 30)]),
            raw("db1", "west", &[(0, 100), (10, 200), (20, 300)]),
        ])
    }

    #[tokio::test]
    async fn test_fetch_aggregates_all_matches() {
        let query = SeriesQuery::new("cpu", TimeRange::new(0, 100));
        let result = store().fetch(&query).await.unwrap();

        assert_eq!(result.len(), 1);
        let series = &result[0];
        assert!(series.tags().is_empty());
        assert_eq!(series.aggregated_tags(), &["dc".to_string(), "host".to_string()]);
        assert_eq!(
            series.points(),
            &[
                DataPoint::integer(0, 111),
                DataPoint::integer(10, 222),
                DataPoint::integer(20, 333),
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_groups_by_wildcard() {
        let query = SeriesQuery::new("cpu", TimeRange::new(0, 100)).tag("dc", "*");
        let result = store().fetch(&query).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].tags().get("dc").map(String::as_str), Some("east"));
        assert_eq!(result[0].aggregated_tags(), &["host".to_string()]);
        assert_eq!(result[0].points()[0], DataPoint::integer(0, 11));

        assert_eq!(result[1].tags().get("host").map(String::as_str), Some("db1"));
        assert!(result[1].aggregated_tags().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_literal_and_alternation_filters() {
        let query = SeriesQuery::new("cpu", TimeRange::new(0, 100)).tag("host", "web1");
        let result = store().fetch(&query).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].points()[2], DataPoint::integer(20, 3));

        let query = SeriesQuery::new("cpu", TimeRange::new(0, 100)).tag("host", "web1|db1");
        let result = store().fetch(&query).await.unwrap();
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_clips_to_window_inclusive() {
        let query = SeriesQuery::new("cpu", TimeRange::new(10, 20))
            .tag("host", "web1")
            .aggregator(Aggregator::Max);
        let result = store().fetch(&query).await.unwrap();

        let timestamps: Vec<i64> = result[0].points().iter().map(|p| p.timestamp).collect();
        assert_eq!(timestamps, vec![10, 20]);
    }

    #[tokio::test]
    async fn test_fetch_interpolates_across_window_edges() {
        let store = MemoryStore::with_series(vec![
            raw("a", "east", &[(0, 10), (1000, 10), (2000, 10)]),
            raw("b", "east", &[(500, 100), (1500, 100)]),
        ]);
        let query = SeriesQuery::new("cpu", TimeRange::new(1000, 1999));
        let result = store.fetch(&query).await.unwrap();

        // b only has 1500 inside the window but is interpolated at 1000,
        // a's neighbour at 2000 lets it be interpolated at 1500
        assert_eq!(
            result[0].points(),
            &[DataPoint::float(1000, 110.0), DataPoint::float(1500, 110.0)]
        );
    }

    #[tokio::test]
    async fn test_fetch_unknown_metric_is_empty() {
        let query = SeriesQuery::new("mem", TimeRange::new(0, 100));
        assert!(store().fetch(&query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_from_json() {
        let json = r#"[
            {"metric": "cpu", "tags": {"host": "a"}, "dps": [
                {"timestamp": 0, "value": 1},
                {"timestamp": 10, "value": 2.5}
            ]}
        ]"#;
        let store = MemoryStore::from_json(json).unwrap();
        assert_eq!(store.len().await, 1);

        let result = store
            .fetch(&SeriesQuery::new("cpu", TimeRange::new(0, 10)))
            .await
            .unwrap();
        assert_eq!(result[0].points()[1], DataPoint::float(10, 2.5));

        assert!(matches!(
            MemoryStore::from_json("{"),
            Err(StoreError::Decode(_))
        ));
    }
}
