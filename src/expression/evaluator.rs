//! Expression evaluation
//!
//! Trees evaluate post-order: every operand of a call is evaluated
//! concurrently (results keep operand order), then the call's function runs
//! over the collected groups. Metric leaves run through the splicer and the
//! query's optional downsampler.

use crate::downsample::downsample_series;
use crate::expression::{parse_expression, ExpressionTree, FunctionRegistry, Operand};
use crate::query::{parse_metric_query, QueryError, QueryResult, SeriesQuery, TimeRange};
use crate::series::{Series, SeriesResult};
use crate::splice::QuerySplicer;
use crate::stats::QueryStats;
use crate::storage::SeriesStore;
use futures_util::future::{try_join_all, BoxFuture};
use std::sync::Arc;
use std::time::Instant;

/// Evaluates expressions against a store
pub struct ExpressionEvaluator<S: SeriesStore + ?Sized> {
    splicer: QuerySplicer<S>,
    registry: FunctionRegistry,
    stats: Arc<QueryStats>,
}

impl<S: SeriesStore + ?Sized + 'static> ExpressionEvaluator<S> {
    /// Evaluator using the built-in functions and the splicer's stats
    pub fn new(splicer: QuerySplicer<S>) -> Self {
        let stats = Arc::clone(splicer.stats());
        Self {
            splicer,
            registry: FunctionRegistry::with_builtins(),
            stats,
        }
    }

    /// Builder method: use a custom function registry
    pub fn with_registry(mut self, registry: FunctionRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn stats(&self) -> &Arc<QueryStats> {
        &self.stats
    }

    /// Parse and evaluate `expression` over `range`
    ///
    /// A bare metric query (no call) is evaluated as `id(query)`.
    pub async fn evaluate(&self, expression: &str, range: TimeRange) -> QueryResult<Vec<Series>> {
        self.stats.record_query();

        let source = if expression.contains('(') {
            expression.to_string()
        } else {
            format!("id({})", expression.trim())
        };
        let parsed = parse_expression(&source, &self.registry)?;
        let queries = parsed
            .metric_queries
            .iter()
            .map(|q| parse_metric_query(q, range))
            .collect::<QueryResult<Vec<_>>>()?;

        tracing::info!(
            "Evaluating {} over {} ({} metric queries)",
            parsed.tree.render(&parsed.metric_queries),
            range,
            queries.len()
        );

        let series = self.evaluate_tree(&parsed.tree, &queries, range).await?;
        let points: usize = series.iter().map(Series::size).sum();
        self.stats.add_response_points(points);
        tracing::info!("Expression produced {} series ({} points)", series.len(), points);
        Ok(series)
    }

    /// Evaluate an already parsed tree; `queries` resolves metric operands
    pub fn evaluate_tree<'a>(
        &'a self,
        tree: &'a ExpressionTree,
        queries: &'a [SeriesQuery],
        range: TimeRange,
    ) -> BoxFuture<'a, QueryResult<Vec<Series>>> {
        Box::pin(async move {
            let operands = tree.operands().iter().map(|operand| match operand {
                Operand::Expression(sub) => self.evaluate_tree(sub, queries, range),
                Operand::Metric(index) => Box::pin(self.fetch_metric(queries, *index))
                    as BoxFuture<'a, QueryResult<Vec<Series>>>,
            });
            let groups = try_join_all(operands).await?;

            let started = Instant::now();
            let output = tree.function().evaluate(&range, &groups, tree.params())?;
            self.stats.record_expression(started.elapsed());
            tracing::debug!(
                "{} over {} groups produced {} series",
                tree.name(),
                groups.len(),
                output.len()
            );
            Ok(output)
        })
    }

    async fn fetch_metric(&self, queries: &[SeriesQuery], index: usize) -> QueryResult<Vec<Series>> {
        let query = queries
            .get(index)
            .ok_or_else(|| QueryError::Parse(format!("no metric query #{}", index)))?;
        self.stats.record_metric();

        let series = self.splicer.execute(query).await.into_result()?;

        match &query.downsample {
            Some(spec) => {
                let started = Instant::now();
                let downsampled = series
                    .iter()
                    .map(|s| downsample_series(s, spec))
                    .collect::<SeriesResult<Vec<_>>>()?;
                self.stats.record_downsample(started.elapsed());
                Ok(downsampled)
            }
            None => Ok(series),
        }
    }
}
