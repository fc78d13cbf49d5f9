//! Bucket result merge
//!
//! Series from different buckets that share a [`Signature`] are the same
//! output series cut into time slices; they are stitched back together here.

use crate::series::{DataPoint, Series, Signature};
use std::collections::{BTreeMap, HashMap};

/// Merge per-bucket results (in bucket order) into whole series
///
/// Output order follows first appearance, scanning buckets in order. On an
/// exact timestamp collision the later bucket wins.
pub fn merge_buckets(buckets: Vec<Vec<Series>>) -> Vec<Series> {
    let expected = buckets.len();
    let mut order: Vec<Signature> = Vec::new();
    let mut groups: HashMap<Signature, Vec<Series>> = HashMap::new();

    for series in buckets.into_iter().flatten() {
        let signature = series.signature();
        match groups.get_mut(&signature) {
            Some(members) => members.push(series),
            None => {
                order.push(signature.clone());
                groups.insert(signature, vec![series]);
            }
        }
    }

    let mut merged = Vec::with_capacity(order.len());
    for signature in order {
        let Some(members) = groups.remove(&signature) else {
            continue;
        };

        if members.len() == 1 && expected > 1 {
            tracing::error!(
                "Series {} found in a single bucket out of {}",
                signature,
                expected
            );
        } else if members.len() < expected {
            tracing::warn!(
                "Series {} matched {} of {} buckets",
                signature,
                members.len(),
                expected
            );
        }

        let mut points: BTreeMap<i64, DataPoint> = BTreeMap::new();
        for member in &members {
            for point in member.points() {
                points.insert(point.timestamp, *point);
            }
        }
        merged.push(Series::post_aggregated(
            &members[0],
            points.into_values().collect(),
        ));
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::SeriesMeta;

    fn slice(meta: SeriesMeta, points: &[(i64, i64)]) -> Series {
        Series::new(
            meta,
            points.iter().map(|&(t, v)| DataPoint::integer(t, v)).collect(),
        )
    }

    #[test]
    fn test_aggregated_tag_order_is_ignored() {
        let first = SeriesMeta::new("cpu")
            .tag("dc", "east")
            .aggregated_tag("host")
            .aggregated_tag("rack");
        let second = SeriesMeta::new("cpu")
            .tag("dc", "east")
            .aggregated_tag("rack")
            .aggregated_tag("host");

        let merged = merge_buckets(vec![
            vec![slice(first, &[(0, 1), (10, 2)])],
            vec![slice(second, &[(20, 3), (30, 4)])],
        ]);

        assert_eq!(merged.len(), 1);
        let timestamps: Vec<i64> = merged[0].points().iter().map(|p| p.timestamp).collect();
        assert_eq!(timestamps, vec![0, 10, 20, 30]);
    }

    #[test]
    fn test_different_tag_values_stay_apart() {
        let merged = merge_buckets(vec![
            vec![
                slice(SeriesMeta::new("cpu").tag("host", "a"), &[(0, 1)]),
                slice(SeriesMeta::new("cpu").tag("host", "b"), &[(0, 2)]),
            ],
            vec![
                slice(SeriesMeta::new("cpu").tag("host", "b"), &[(10, 3)]),
                slice(SeriesMeta::new("cpu").tag("host", "a"), &[(10, 4)]),
            ],
        ]);

        assert_eq!(merged.len(), 2);
        // First-bucket order is kept
        assert_eq!(merged[0].tags().get("host").map(String::as_str), Some("a"));
        assert_eq!(
            merged[0].points(),
            &[DataPoint::integer(0, 1), DataPoint::integer(10, 4)]
        );
        assert_eq!(merged[1].tags().get("host").map(String::as_str), Some("b"));
    }

    #[test]
    fn test_later_bucket_wins_collision() {
        let meta = SeriesMeta::new("cpu");
        let merged = merge_buckets(vec![
            vec![slice(meta.clone(), &[(0, 1), (10, 2)])],
            vec![slice(meta, &[(10, 99), (20, 3)])],
        ]);

        assert_eq!(
            merged[0].points(),
            &[
                DataPoint::integer(0, 1),
                DataPoint::integer(10, 99),
                DataPoint::integer(20, 3),
            ]
        );
    }

    #[test]
    fn test_partial_series_still_emitted() {
        let merged = merge_buckets(vec![
            vec![
                slice(SeriesMeta::new("cpu"), &[(0, 1)]),
                slice(SeriesMeta::new("mem"), &[(0, 5)]),
            ],
            vec![slice(SeriesMeta::new("cpu"), &[(10, 2)])],
            vec![slice(SeriesMeta::new("cpu"), &[(20, 3)])],
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].size(), 3);
        assert_eq!(merged[1].metric_name(), "mem");
        assert_eq!(merged[1].size(), 1);
    }
}
