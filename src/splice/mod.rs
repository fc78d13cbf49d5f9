//! Parallel query splicing
//!
//! - **bucket**: plans bucket-aligned sub-ranges of a query window
//! - **merge**: stitches per-bucket series back into whole series
//!
//! # Execution
//!
//! ```text
//!   SeriesQuery ─► splice_range ─┬─ ≤ 2 buckets ─► store.fetch (direct)
//!                                └─ N buckets ──► spawn fetch+filter per bucket
//!                                                  (Semaphore-bound)
//!                                                        │
//!                                     await all, in bucket order ◄┘
//!                                                        │
//!                                     any failure ─► Failed, no series
//!                                     otherwise   ─► merge_buckets
//! ```

mod bucket;
mod merge;

pub use bucket::splice_range;
pub use merge::merge_buckets;

use crate::config::SplicerConfig;
use crate::query::{QueryError, QueryResult, SeriesQuery, TimeRange};
use crate::series::Series;
use crate::stats::QueryStats;
use crate::storage::{SeriesStore, StoreError, StoreResult};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::Instrument;
use uuid::Uuid;

/// Outcome of a splice execution
#[derive(Debug, Clone, PartialEq)]
pub enum SpliceStatus {
    /// Every fetch succeeded
    Complete,
    /// At least one fetch failed; all series were discarded
    Failed { errors: Vec<String> },
}

/// Series produced by a splice execution, with an explicit status
#[derive(Debug, Clone)]
pub struct SpliceResult {
    pub execution_id: Uuid,
    /// Number of buckets the query ran as (1 when run directly)
    pub buckets: usize,
    pub status: SpliceStatus,
    /// Empty when `status` is `Failed`
    pub series: Vec<Series>,
}

impl SpliceResult {
    pub fn is_complete(&self) -> bool {
        self.status == SpliceStatus::Complete
    }

    /// Series on success, `QueryError::Degraded` otherwise
    pub fn into_result(self) -> QueryResult<Vec<Series>> {
        match self.status {
            SpliceStatus::Complete => Ok(self.series),
            SpliceStatus::Failed { errors } => Err(QueryError::Degraded(format!(
                "splice {} failed: {}",
                self.execution_id,
                errors.join("; ")
            ))),
        }
    }
}

/// Runs metric queries against a store, splitting long windows into
/// concurrently fetched buckets
pub struct QuerySplicer<S: SeriesStore + ?Sized> {
    store: Arc<S>,
    config: SplicerConfig,
    semaphore: Arc<Semaphore>,
    stats: Arc<QueryStats>,
}

impl<S: SeriesStore + ?Sized + 'static> QuerySplicer<S> {
    pub fn new(store: Arc<S>, config: SplicerConfig) -> Self {
        let permits = config.max_concurrent_buckets.max(1);
        Self {
            store,
            config,
            semaphore: Arc::new(Semaphore::new(permits)),
            stats: Arc::new(QueryStats::new()),
        }
    }

    /// Builder method: record into shared stats
    pub fn with_stats(mut self, stats: Arc<QueryStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn config(&self) -> &SplicerConfig {
        &self.config
    }

    pub fn stats(&self) -> &Arc<QueryStats> {
        &self.stats
    }

    /// Execute `query`, directly or as parallel buckets
    pub async fn execute(&self, query: &SeriesQuery) -> SpliceResult {
        let execution_id = Uuid::new_v4();
        let span = tracing::info_span!("splice", id = %execution_id, query = %query);
        self.run(execution_id, query).instrument(span).await
    }

    async fn run(&self, execution_id: Uuid, query: &SeriesQuery) -> SpliceResult {
        let bucket_size = self.config.bucket_size_millis();
        let ranges = if self.config.enabled {
            splice_range(query.time_range, bucket_size, self.config.max_buckets)
        } else {
            vec![query.time_range]
        };

        let started = Instant::now();
        let outcome = if ranges.len() <= 2 {
            tracing::debug!("Running {} directly ({} buckets)", query, ranges.len());
            self.store
                .fetch(query)
                .await
                .map_err(|e| vec![e.to_string()])
                .map(|series| (1, series))
        } else {
            self.fetch_buckets(query, &ranges)
                .await
                .map(|series| (ranges.len(), series))
        };
        self.stats.record_splice_fetch(started.elapsed());

        match outcome {
            Ok((buckets, series)) => {
                let scanned: usize = series.iter().map(Series::size).sum();
                self.stats.add_scanned_points(scanned);
                tracing::info!(
                    "Splice returned {} series ({} points) from {} buckets",
                    series.len(),
                    scanned,
                    buckets
                );
                SpliceResult {
                    execution_id,
                    buckets,
                    status: SpliceStatus::Complete,
                    series,
                }
            }
            Err(errors) => {
                self.stats.record_failed_splice();
                tracing::error!(
                    "Splice failed with {} errors, discarding results: {}",
                    errors.len(),
                    errors.join("; ")
                );
                SpliceResult {
                    execution_id,
                    buckets: ranges.len(),
                    status: SpliceStatus::Failed { errors },
                    series: Vec::new(),
                }
            }
        }
    }

    async fn fetch_buckets(
        &self,
        query: &SeriesQuery,
        ranges: &[TimeRange],
    ) -> Result<Vec<Series>, Vec<String>> {
        if let (Some(first), Some(last)) = (ranges.first(), ranges.last()) {
            tracing::debug!(
                "Splicing into {} buckets: first {}, last {}",
                ranges.len(),
                first,
                last
            );
        }

        let mut handles = Vec::with_capacity(ranges.len());
        for &range in ranges {
            let store = Arc::clone(&self.store);
            let semaphore = Arc::clone(&self.semaphore);
            let scoped = query.scoped(range);

            let handle = tokio::spawn(
                async move {
                    let _permit = semaphore
                        .acquire()
                        .await
                        .map_err(|_| StoreError::Unavailable("splicer shut down".to_string()))?;
                    let series = store.fetch(&scoped).await?;
                    Ok::<_, StoreError>(filter_bucket(series, range))
                }
                .in_current_span(),
            );
            handles.push((range, handle));
        }

        // Await every bucket, keeping bucket order
        let mut slots: Vec<StoreResult<Vec<Series>>> = Vec::with_capacity(handles.len());
        for (range, handle) in handles {
            let slot = match handle.await {
                Ok(result) => result,
                Err(e) => Err(StoreError::Backend(format!("bucket task aborted: {}", e))),
            };
            match &slot {
                Ok(series) => tracing::debug!("Bucket {} returned {} series", range, series.len()),
                Err(e) => tracing::error!("Bucket {} failed: {}", range, e),
            }
            slots.push(slot);
        }

        let mut buckets = Vec::with_capacity(slots.len());
        let mut errors = Vec::new();
        for slot in slots {
            match slot {
                Ok(series) => buckets.push(series),
                Err(e) => errors.push(e.to_string()),
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        let started = Instant::now();
        let merged = merge_buckets(buckets);
        self.stats.record_splice_merge(started.elapsed());
        Ok(merged)
    }
}

/// Keep only points inside `range` (inclusive); storage may over-return
fn filter_bucket(series: Vec<Series>, range: TimeRange) -> Vec<Series> {
    series
        .iter()
        .map(|s| {
            let points = s
                .points()
                .iter()
                .filter(|p| range.contains_inclusive(p.timestamp))
                .copied()
                .collect();
            Series::post_aggregated(s, points)
        })
        .collect()
}
