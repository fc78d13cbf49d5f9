//! Top-k selection

use super::{flatten, require_param, require_results};
use crate::aggregation::{
    AggregationIterator, Aggregator, Alignment, Interpolation, RankBy, SeriesRanker,
};
use crate::expression::Expression;
use crate::query::{QueryError, QueryResult, TimeRange};
use crate::series::Series;

fn parse_k(function: &str, params: &[String]) -> QueryResult<usize> {
    let param = require_param(function, params, 0)?;
    match param.parse::<usize>() {
        Ok(k) if k > 0 => Ok(k),
        _ => Err(QueryError::InvalidParameter(format!(
            "{} needs a positive series count, got '{}'",
            function, param
        ))),
    }
}

/// Keep the `k` best series by `rank_by`, best first
fn top_k(
    function: &str,
    rank_by: RankBy,
    range: &TimeRange,
    results: &[Vec<Series>],
    params: &[String],
) -> QueryResult<Vec<Series>> {
    require_results(function, results)?;
    let k = parse_k(function, params)?;
    let series = flatten(results);
    if k >= series.len() {
        return Ok(series);
    }

    let mut iter = AggregationIterator::new(
        &series,
        *range,
        Aggregator::Sum,
        Interpolation::Lerp,
        Alignment::Union,
    );
    let mut ranker = SeriesRanker::new(rank_by, series.len());
    while let Some(step) = iter.next_step() {
        ranker.observe(&step);
    }

    let ranking = ranker.ranking();
    tracing::debug!(
        "{} kept {} of {} series: {:?}",
        function,
        k,
        series.len(),
        &ranking[..k]
    );
    Ok(ranking
        .into_iter()
        .take(k)
        .map(|i| series[i].clone())
        .collect())
}

/// Series with the highest maximum
#[derive(Debug, Default)]
pub struct HighestMax;

impl Expression for HighestMax {
    fn name(&self) -> &'static str {
        "highestMax"
    }

    fn evaluate(
        &self,
        range: &TimeRange,
        results: &[Vec<Series>],
        params: &[String],
    ) -> QueryResult<Vec<Series>> {
        top_k(self.name(), RankBy::Max, range, results, params)
    }
}

/// Series with the highest last value
#[derive(Debug, Default)]
pub struct HighestCurrent;

impl Expression for HighestCurrent {
    fn name(&self) -> &'static str {
        "highestCurrent"
    }

    fn evaluate(
        &self,
        range: &TimeRange,
        results: &[Vec<Series>],
        params: &[String],
    ) -> QueryResult<Vec<Series>> {
        top_k(self.name(), RankBy::Latest, range, results, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{DataPoint, SeriesMeta};

    fn series(host: &str, values: &[i64]) -> Series {
        Series::new(
            SeriesMeta::new("cpu").tag("host", host),
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| DataPoint::integer(i as i64 * 10, v))
                .collect(),
        )
    }

    fn hosts(out: &[Series]) -> Vec<String> {
        out.iter()
            .map(|s| s.tags().get("host").cloned().unwrap_or_default())
            .collect()
    }

    fn window() -> TimeRange {
        TimeRange::new(0, 1000)
    }

    fn k(n: &str) -> Vec<String> {
        vec![n.to_string()]
    }

    #[test]
    fn test_highest_max() {
        let results = vec![vec![
            series("a", &[1, 5, 2]),
            series("b", &[9, 0, 0]),
            series("c", &[3, 3, 3]),
        ]];

        let out = HighestMax.evaluate(&window(), &results, &k("2")).unwrap();
        assert_eq!(hosts(&out), vec!["b", "a"]);
        // Original series, untouched
        assert_eq!(out[0].points(), results[0][1].points());
    }

    #[test]
    fn test_highest_current() {
        let results = vec![
            vec![series("a", &[1, 5, 2])],
            vec![series("b", &[9, 0, 0])],
            vec![series("c", &[3, 3, 3])],
        ];

        let out = HighestCurrent.evaluate(&window(), &results, &k("1")).unwrap();
        assert_eq!(hosts(&out), vec!["c"]);
    }

    #[test]
    fn test_k_at_least_n_returns_inputs() {
        let results = vec![vec![series("a", &[1]), series("b", &[9])]];
        let out = HighestMax.evaluate(&window(), &results, &k("5")).unwrap();
        assert_eq!(hosts(&out), vec!["a", "b"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let results = vec![vec![
            series("a", &[4]),
            series("b", &[7]),
            series("c", &[7]),
        ]];
        let out = HighestMax.evaluate(&window(), &results, &k("2")).unwrap();
        assert_eq!(hosts(&out), vec!["b", "c"]);
    }

    #[test]
    fn test_series_outside_window_rank_last() {
        let late = Series::new(
            SeriesMeta::new("cpu").tag("host", "late"),
            vec![DataPoint::integer(5000, 100)],
        );
        let results = vec![vec![late, series("a", &[1]), series("b", &[2])]];
        let out = HighestMax.evaluate(&window(), &results, &k("2")).unwrap();
        assert_eq!(hosts(&out), vec!["b", "a"]);
    }

    #[test]
    fn test_invalid_k() {
        let results = vec![vec![series("a", &[1]), series("b", &[2])]];
        for bad in [vec![], k(""), k("0"), k("-1"), k("two"), k("1.5")] {
            assert!(matches!(
                HighestMax.evaluate(&window(), &results, &bad),
                Err(QueryError::InvalidParameter(_))
            ));
        }
        assert!(matches!(
            HighestCurrent.evaluate(&window(), &[], &k("1")),
            Err(QueryError::EmptyInput(_))
        ));
    }
}
