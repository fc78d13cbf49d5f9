//! Per-series transforms

use super::{flatten, require_param, require_results};
use crate::aggregation::{moving_average, MovingWindow};
use crate::expression::Expression;
use crate::query::{QueryError, QueryResult, TimeRange};
use crate::series::{DataPoint, Series};

/// Pass-through of a single input group
#[derive(Debug, Default)]
pub struct Identity;

impl Expression for Identity {
    fn name(&self) -> &'static str {
        "id"
    }

    fn evaluate(
        &self,
        _range: &TimeRange,
        results: &[Vec<Series>],
        _params: &[String],
    ) -> QueryResult<Vec<Series>> {
        require_results(self.name(), results)?;
        match results {
            [group] => Ok(group.clone()),
            _ => Err(QueryError::InvalidOperands(format!(
                "id takes one input, got {}",
                results.len()
            ))),
        }
    }
}

/// Rename series from a template; `@key` expands to the series' tag value
#[derive(Debug, Default)]
pub struct Alias;

impl Alias {
    fn template(params: &[String]) -> QueryResult<String> {
        let template = params.join(",");
        if template.trim().is_empty() {
            return Err(QueryError::InvalidParameter(
                "alias needs a name template".to_string(),
            ));
        }
        Ok(template.trim().to_string())
    }

    fn render(template: &str, series: &Series) -> String {
        let mut tags: Vec<(&String, &String)> = series.meta().tags.iter().collect();
        // Longest keys first so `@host` cannot clobber `@hostname`
        tags.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let mut name = template.to_string();
        for (key, value) in tags {
            name = name.replace(&format!("@{}", key), value);
        }
        name
    }
}

impl Expression for Alias {
    fn name(&self) -> &'static str {
        "alias"
    }

    fn evaluate(
        &self,
        _range: &TimeRange,
        results: &[Vec<Series>],
        params: &[String],
    ) -> QueryResult<Vec<Series>> {
        require_results(self.name(), results)?;
        let template = Self::template(params)?;

        Ok(flatten(results)
            .into_iter()
            .map(|series| {
                let name = Self::render(&template, &series);
                series.with_alias(name)
            })
            .collect())
    }

    fn write_string_field(&self, params: &[String], _inner: &str) -> String {
        Self::template(params).unwrap_or_else(|_| "NULL".to_string())
    }
}

/// Multiply every point by a constant; output is floating
#[derive(Debug, Default)]
pub struct Scale;

impl Expression for Scale {
    fn name(&self) -> &'static str {
        "scale"
    }

    fn evaluate(
        &self,
        _range: &TimeRange,
        results: &[Vec<Series>],
        params: &[String],
    ) -> QueryResult<Vec<Series>> {
        require_results(self.name(), results)?;
        let param = require_param(self.name(), params, 0)?;
        let factor: f64 = param
            .parse()
            .ok()
            .filter(|f: &f64| f.is_finite())
            .ok_or_else(|| {
                QueryError::InvalidParameter(format!("scale factor '{}' is not a number", param))
            })?;

        Ok(flatten(results)
            .iter()
            .map(|series| {
                let points = series
                    .points()
                    .iter()
                    .map(|p| DataPoint::float(p.timestamp, p.to_f64() * factor))
                    .collect();
                Series::post_aggregated(series, points)
            })
            .collect())
    }
}

/// Trailing average over a point count or a quoted duration
/// (`'5min'`, `'2hr'`, `'30sec'`)
#[derive(Debug, Default)]
pub struct MovingAverage;

impl MovingAverage {
    fn parse_window(param: &str) -> QueryResult<MovingWindow> {
        let invalid = || QueryError::InvalidParameter(format!("invalid window '{}'", param));

        if param.chars().all(|c| c.is_ascii_digit()) {
            let count: usize = param.parse().map_err(|_| invalid())?;
            if count == 0 {
                return Err(invalid());
            }
            return Ok(MovingWindow::Points(count));
        }

        let re = regex::Regex::new(r"^'(\d+)\s*(min|hr|sec)'$")
            .map_err(|e| QueryError::Parse(format!("window pattern: {}", e)))?;
        let caps = re.captures(param).ok_or_else(invalid)?;
        let amount: i64 = caps[1].parse().map_err(|_| invalid())?;
        let unit_ms = match &caps[2] {
            "min" => 60_000,
            "hr" => 3_600_000,
            _ => 1_000,
        };
        match amount.checked_mul(unit_ms) {
            Some(ms) if ms > 0 => Ok(MovingWindow::Duration(ms)),
            _ => Err(invalid()),
        }
    }
}

impl Expression for MovingAverage {
    fn name(&self) -> &'static str {
        "movingAverage"
    }

    fn evaluate(
        &self,
        range: &TimeRange,
        results: &[Vec<Series>],
        params: &[String],
    ) -> QueryResult<Vec<Series>> {
        require_results(self.name(), results)?;
        let window = Self::parse_window(require_param(self.name(), params, 0)?)?;

        Ok(flatten(results)
            .iter()
            .map(|series| {
                let in_range: Vec<DataPoint> = series
                    .points()
                    .iter()
                    .filter(|p| range.contains_inclusive(p.timestamp))
                    .copied()
                    .collect();
                Series::post_aggregated(series, moving_average(&in_range, window))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::SeriesMeta;

    fn web1(points: Vec<DataPoint>) -> Series {
        Series::new(
            SeriesMeta::new("cpu").tag("host", "web1").tag("hostgroup", "front"),
            points,
        )
    }

    fn window() -> TimeRange {
        TimeRange::new(0, 1_000_000)
    }

    fn params(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_identity() {
        let s = web1(vec![DataPoint::integer(0, 1)]);
        let out = Identity.evaluate(&window(), &[vec![s.clone()]], &[]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].points(), s.points());
        assert!(Identity.evaluate(&window(), &[], &[]).is_err());
    }

    #[test]
    fn test_identity_keeps_its_group() {
        let group = vec![
            web1(vec![DataPoint::integer(0, 1)]),
            web1(vec![DataPoint::integer(0, 2)]),
        ];
        let out = Identity.evaluate(&window(), &[group.clone()], &[]).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].points(), group[1].points());

        assert!(matches!(
            Identity.evaluate(&window(), &[group.clone(), group], &[]),
            Err(QueryError::InvalidOperands(_))
        ));
    }

    #[test]
    fn test_alias_substitutes_tags() {
        let s = web1(vec![DataPoint::integer(0, 1)]);
        let out = Alias
            .evaluate(&window(), &[vec![s]], &params(&["host-@host"]))
            .unwrap();

        assert_eq!(out[0].metric_name(), "host-web1");
        assert!(out[0].tags().is_empty());
        assert_eq!(out[0].points(), &[DataPoint::integer(0, 1)]);
    }

    #[test]
    fn test_alias_prefers_longer_keys() {
        let s = web1(vec![]);
        let out = Alias
            .evaluate(&window(), &[vec![s]], &params(&["@hostgroup/@host"]))
            .unwrap();
        assert_eq!(out[0].metric_name(), "front/web1");
    }

    #[test]
    fn test_alias_joins_params_and_requires_template() {
        let s = web1(vec![]);
        let out = Alias
            .evaluate(&window(), &[vec![s.clone()]], &params(&["a", "b"]))
            .unwrap();
        assert_eq!(out[0].metric_name(), "a,b");

        assert!(matches!(
            Alias.evaluate(&window(), &[vec![s]], &[]),
            Err(QueryError::InvalidParameter(_))
        ));
        assert_eq!(Alias.write_string_field(&params(&["x"]), "ignored"), "x");
    }

    #[test]
    fn test_scale_by_one_is_float_identity() {
        let ints = web1(vec![DataPoint::integer(0, 3), DataPoint::integer(10, -7)]);
        let floats = web1(vec![DataPoint::float(0, 0.1), DataPoint::float(10, 2.5)]);

        let out = Scale
            .evaluate(&window(), &[vec![ints], vec![floats]], &params(&["1.0"]))
            .unwrap();

        assert_eq!(
            out[0].points(),
            &[DataPoint::float(0, 3.0), DataPoint::float(10, -7.0)]
        );
        assert_eq!(
            out[1].points(),
            &[DataPoint::float(0, 0.1), DataPoint::float(10, 2.5)]
        );
    }

    #[test]
    fn test_scale_rejects_bad_factor() {
        let s = web1(vec![DataPoint::integer(0, 1)]);
        for bad in [vec![], params(&[""]), params(&["ten"]), params(&["NaN"])] {
            assert!(matches!(
                Scale.evaluate(&window(), &[vec![s.clone()]], &bad),
                Err(QueryError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_moving_average_points() {
        let s = web1(vec![
            DataPoint::integer(0, 2),
            DataPoint::integer(10, 4),
            DataPoint::integer(20, 6),
        ]);
        let out = MovingAverage
            .evaluate(&window(), &[vec![s]], &params(&["2"]))
            .unwrap();
        assert_eq!(
            out[0].points(),
            &[
                DataPoint::float(0, 2.0),
                DataPoint::float(10, 3.0),
                DataPoint::float(20, 5.0),
            ]
        );
    }

    #[test]
    fn test_moving_average_one_output_per_series() {
        let a = web1(vec![DataPoint::integer(0, 1)]);
        let b = web1(vec![DataPoint::integer(0, 2)]);
        let out = MovingAverage
            .evaluate(&window(), &[vec![a, b]], &params(&["3"]))
            .unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_moving_average_windows() {
        assert_eq!(MovingAverage::parse_window("5").unwrap(), MovingWindow::Points(5));
        assert_eq!(
            MovingAverage::parse_window("'5min'").unwrap(),
            MovingWindow::Duration(300_000)
        );
        assert_eq!(
            MovingAverage::parse_window("'2hr'").unwrap(),
            MovingWindow::Duration(7_200_000)
        );
        assert_eq!(
            MovingAverage::parse_window("'30sec'").unwrap(),
            MovingWindow::Duration(30_000)
        );

        for bad in ["0", "'0min'", "5min", "'5days'", "-3", "abc"] {
            assert!(
                matches!(
                    MovingAverage::parse_window(bad),
                    Err(QueryError::InvalidParameter(_))
                ),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_moving_average_needs_window() {
        let s = web1(vec![DataPoint::integer(0, 1)]);
        assert!(matches!(
            MovingAverage.evaluate(&window(), &[vec![s]], &[]),
            Err(QueryError::InvalidParameter(_))
        ));
    }
}
