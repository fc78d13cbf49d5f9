//! Pointwise combination of several series

use super::{binary_operands, combine, flatten, require_results};
use crate::aggregation::{Aggregator, Alignment};
use crate::expression::Expression;
use crate::query::{QueryResult, TimeRange};
use crate::series::{DataPoint, Series, Value};

/// Sum of every input series (union of their time ranges)
#[derive(Debug, Default)]
pub struct SumSeries;

impl Expression for SumSeries {
    fn name(&self) -> &'static str {
        "sumSeries"
    }

    fn evaluate(
        &self,
        range: &TimeRange,
        results: &[Vec<Series>],
        _params: &[String],
    ) -> QueryResult<Vec<Series>> {
        require_results(self.name(), results)?;
        let operands = flatten(results);
        let Some(identity) = operands.first() else {
            return Ok(Vec::new());
        };
        let sum = combine(identity, &operands, range, Aggregator::Sum, Alignment::Union)?;
        Ok(vec![sum])
    }
}

/// Product of every input series (union of their time ranges)
#[derive(Debug, Default)]
pub struct Multiply;

impl Expression for Multiply {
    fn name(&self) -> &'static str {
        "multiply"
    }

    fn evaluate(
        &self,
        range: &TimeRange,
        results: &[Vec<Series>],
        _params: &[String],
    ) -> QueryResult<Vec<Series>> {
        require_results(self.name(), results)?;
        let operands = flatten(results);
        let Some(identity) = operands.first() else {
            return Ok(Vec::new());
        };
        let product = combine(identity, &operands, range, Aggregator::Mult, Alignment::Union)?;
        Ok(vec![product])
    }
}

/// First series minus the second, over their overlap
#[derive(Debug, Default)]
pub struct Difference;

impl Expression for Difference {
    fn name(&self) -> &'static str {
        "difference"
    }

    fn evaluate(
        &self,
        range: &TimeRange,
        results: &[Vec<Series>],
        _params: &[String],
    ) -> QueryResult<Vec<Series>> {
        require_results(self.name(), results)?;
        let (left, right) = binary_operands(self.name(), results)?;

        let negated = right.points().iter().map(|p| negate(*p)).collect();
        let right = Series::post_aggregated(&right, negated);

        let difference = combine(
            &left,
            &[left.clone(), right],
            range,
            Aggregator::Sum,
            Alignment::Endpoints,
        )?;
        Ok(vec![difference])
    }
}

/// First series divided by the second, over their overlap
///
/// Divisor points within 1e-7 of zero are dropped; the quotient there is
/// interpolated from the neighbouring divisor points.
#[derive(Debug, Default)]
pub struct Divide;

const ZERO_TOLERANCE: f64 = 1e-7;

impl Expression for Divide {
    fn name(&self) -> &'static str {
        "divide"
    }

    fn evaluate(
        &self,
        range: &TimeRange,
        results: &[Vec<Series>],
        _params: &[String],
    ) -> QueryResult<Vec<Series>> {
        require_results(self.name(), results)?;
        let (left, right) = binary_operands(self.name(), results)?;

        let reciprocals: Vec<DataPoint> = right
            .points()
            .iter()
            .filter(|p| p.to_f64().abs() >= ZERO_TOLERANCE)
            .map(|p| DataPoint::float(p.timestamp, 1.0 / p.to_f64()))
            .collect();
        if reciprocals.len() < right.size() {
            tracing::debug!(
                "divide skipped {} zero divisor points",
                right.size() - reciprocals.len()
            );
        }
        let right = Series::post_aggregated(&right, reciprocals);

        let quotient = combine(
            &left,
            &[left.clone(), right],
            range,
            Aggregator::Mult,
            Alignment::Endpoints,
        )?;
        Ok(vec![quotient])
    }
}

fn negate(point: DataPoint) -> DataPoint {
    let value = match point.value {
        Value::Integer(v) => v
            .checked_neg()
            .map(Value::Integer)
            .unwrap_or(Value::Float(-(v as f64))),
        Value::Float(v) => Value::Float(-v),
    };
    DataPoint {
        timestamp: point.timestamp,
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryError;
    use crate::series::SeriesMeta;

    fn series(metric: &str, points: &[(i64, i64)]) -> Series {
        Series::new(
            SeriesMeta::new(metric),
            points.iter().map(|&(t, v)| DataPoint::integer(t, v)).collect(),
        )
    }

    fn window() -> TimeRange {
        TimeRange::new(0, 1000)
    }

    fn values(series: &Series) -> Vec<(i64, f64)> {
        series.points().iter().map(|p| (p.timestamp, p.to_f64())).collect()
    }

    #[test]
    fn test_sum_uses_union_with_interpolation() {
        let a = series("a", &[(0, 1), (20, 3)]);
        let b = series("b", &[(10, 10)]);

        let out = SumSeries.evaluate(&window(), &[vec![a], vec![b]], &[]).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].metric_name(), "a");
        assert_eq!(values(&out[0]), vec![(0, 1.0), (10, 12.0), (20, 3.0)]);
        assert!(out[0].points()[0].is_integer());
        assert!(!out[0].points()[1].is_integer());
    }

    #[test]
    fn test_sum_is_bounded_by_window() {
        let a = series("a", &[(0, 1), (10, 2), (20, 3)]);
        let out = SumSeries
            .evaluate(&TimeRange::new(5, 15), &[vec![a]], &[])
            .unwrap();
        assert_eq!(values(&out[0]), vec![(10, 2.0)]);
    }

    #[test]
    fn test_sum_rejects_empty_results() {
        assert!(matches!(
            SumSeries.evaluate(&window(), &[], &[]),
            Err(QueryError::EmptyInput(_))
        ));
        assert!(SumSeries.evaluate(&window(), &[vec![]], &[]).unwrap().is_empty());
    }

    #[test]
    fn test_multiply() {
        let a = series("a", &[(0, 2), (10, 3)]);
        let b = series("b", &[(0, 4), (10, 5)]);

        let out = Multiply.evaluate(&window(), &[vec![a, b]], &[]).unwrap();
        assert_eq!(
            out[0].points(),
            &[DataPoint::integer(0, 8), DataPoint::integer(10, 15)]
        );
    }

    #[test]
    fn test_difference() {
        let a = series("a", &[(0, 10), (10, 20), (20, 30)]);
        let b = series("b", &[(0, 1), (10, 2), (20, 3)]);

        let out = Difference.evaluate(&window(), &[vec![a], vec![b]], &[]).unwrap();
        assert_eq!(
            out[0].points(),
            &[
                DataPoint::integer(0, 9),
                DataPoint::integer(10, 18),
                DataPoint::integer(20, 27),
            ]
        );
    }

    #[test]
    fn test_difference_is_bounded_to_overlap() {
        let a = series("a", &[(0, 10), (10, 20), (20, 30), (30, 40)]);
        let b = series("b", &[(10, 2), (20, 3)]);

        let out = Difference.evaluate(&window(), &[vec![a, b]], &[]).unwrap();
        assert_eq!(values(&out[0]), vec![(10, 18.0), (20, 27.0)]);
    }

    #[test]
    fn test_divide_skips_zero_divisors() {
        let a = series("a", &[(0, 10), (10, 20)]);
        let b = series("b", &[(0, 2), (10, 0), (20, 4)]);

        let out = Divide.evaluate(&window(), &[vec![a], vec![b]], &[]).unwrap();
        assert_eq!(values(&out[0]), vec![(0, 5.0), (10, 7.5)]);
        assert!(out[0].points().iter().all(|p| p.to_f64().is_finite()));
    }

    #[test]
    fn test_divide_tolerance_applies_to_float_divisors() {
        let a = series("a", &[(0, 10), (10, 20)]);
        let divisor = |near_zero: f64| {
            Series::new(
                SeriesMeta::new("b"),
                vec![
                    DataPoint::float(0, 2.0),
                    DataPoint::float(10, near_zero),
                    DataPoint::float(20, 4.0),
                ],
            )
        };

        for near_zero in [5e-8, -5e-8] {
            let out = Divide
                .evaluate(&window(), &[vec![a.clone()], vec![divisor(near_zero)]], &[])
                .unwrap();
            assert_eq!(values(&out[0]), vec![(0, 5.0), (10, 7.5)], "{}", near_zero);
        }

        // Just outside the tolerance the divisor is used as is
        let out = Divide
            .evaluate(&window(), &[vec![a], vec![divisor(2e-7)]], &[])
            .unwrap();
        let (timestamp, quotient) = values(&out[0])[1];
        assert_eq!(timestamp, 10);
        assert!((quotient / 1e8 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_binary_operand_cardinality() {
        let s = |m| series(m, &[(0, 1)]);

        for results in [
            vec![vec![s("a"), s("b"), s("c")]],
            vec![vec![s("a")], vec![s("b")], vec![s("c")]],
            vec![vec![s("a"), s("b")], vec![s("c")]],
            vec![vec![s("a")]],
        ] {
            assert!(matches!(
                Divide.evaluate(&window(), &results, &[]),
                Err(QueryError::InvalidOperands(_))
            ));
            assert!(matches!(
                Difference.evaluate(&window(), &results, &[]),
                Err(QueryError::InvalidOperands(_))
            ));
        }
    }

    #[test]
    fn test_negate_overflow_falls_back_to_float() {
        let point = negate(DataPoint::integer(0, i64::MIN));
        assert!(!point.is_integer());
        assert_eq!(point.to_f64(), 9.223372036854775808e18);
    }
}
