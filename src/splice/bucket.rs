//! Bucket planning
//!
//! Buckets tile the query window without overlap. Both ends of every
//! bucket are inclusive so a point is owned by exactly one bucket.

use crate::query::TimeRange;

/// Split `range` into bucket-aligned sub-ranges of `bucket_size` ms
///
/// The first bucket runs from `range.start` to the next multiple of
/// `bucket_size`, the last one ends at `range.end`. A range inside a single
/// bucket comes back unchanged. When the window would need more than
/// `max_buckets` buckets, the bucket size is widened to a multiple of
/// `bucket_size` that fits.
pub fn splice_range(range: TimeRange, bucket_size: i64, max_buckets: usize) -> Vec<TimeRange> {
    let bucket_size = widen_bucket_size(range, bucket_size.max(1), max_buckets.max(1));
    let mut buckets = Vec::new();

    let mut lower = range.start;
    let mut boundary = lower
        .checked_sub(lower.rem_euclid(bucket_size))
        .and_then(|aligned| aligned.checked_add(bucket_size));
    while let Some(upper) = boundary.filter(|&upper| upper <= range.end) {
        buckets.push(TimeRange {
            start: lower,
            end: upper - 1,
        });
        lower = upper;
        boundary = upper.checked_add(bucket_size);
    }
    if lower <= range.end {
        buckets.push(TimeRange {
            start: lower,
            end: range.end,
        });
    }
    buckets
}

/// Number of `bucket_size` buckets covering `range`
fn bucket_count(range: TimeRange, bucket_size: i64) -> i128 {
    let size = i128::from(bucket_size);
    let aligned = i128::from(range.start) - i128::from(range.start.rem_euclid(bucket_size));
    let span = i128::from(range.end) - aligned + 1;
    (span + size - 1) / size
}

fn widen_bucket_size(range: TimeRange, bucket_size: i64, max_buckets: usize) -> i64 {
    let max = i128::try_from(max_buckets).unwrap_or(i128::MAX);
    let mut size = bucket_size;
    loop {
        let count = bucket_count(range, size);
        if count <= max || size == i64::MAX {
            if size != bucket_size {
                tracing::warn!(
                    "Window {} needs more than {} buckets of {} ms, using {} ms buckets",
                    range,
                    max_buckets,
                    bucket_size,
                    size
                );
            }
            return size;
        }
        let factor = ((count + max - 1) / max).max(2);
        size = i64::try_from(i128::from(size) * factor).unwrap_or(i64::MAX);
    }
}
