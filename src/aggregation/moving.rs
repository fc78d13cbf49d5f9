//! Sliding-window moving average

use crate::series::DataPoint;
use std::collections::VecDeque;

/// Size of a moving average window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovingWindow {
    /// The last N points, including the current one
    Points(usize),
    /// Points within the trailing duration (ms), including the current one
    Duration(i64),
}

/// Average of the window ending at each point
///
/// Emits one floating point per input point.
pub fn moving_average(points: &[DataPoint], window: MovingWindow) -> Vec<DataPoint> {
    let mut output = Vec::with_capacity(points.len());
    let mut in_window: VecDeque<DataPoint> = VecDeque::new();
    let mut sum = 0.0;

    for point in points {
        in_window.push_back(*point);
        sum += point.to_f64();

        while let Some(oldest) = in_window.front() {
            let expired = match window {
                MovingWindow::Points(n) => in_window.len() > n,
                MovingWindow::Duration(ms) => oldest.timestamp <= point.timestamp - ms,
            };
            if !expired {
                break;
            }
            sum -= oldest.to_f64();
            in_window.pop_front();
        }

        output.push(DataPoint::float(
            point.timestamp,
            sum / in_window.len() as f64,
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(values: &[(i64, i64)]) -> Vec<DataPoint> {
        values.iter().map(|&(t, v)| DataPoint::integer(t, v)).collect()
    }

    #[test]
    fn test_point_window() {
        let input = points(&[(1, 2), (2, 4), (3, 6), (4, 8)]);
        let output = moving_average(&input, MovingWindow::Points(2));

        let values: Vec<f64> = output.iter().map(|p| p.to_f64()).collect();
        assert_eq!(values, vec![2.0, 3.0, 5.0, 7.0]);
        assert!(output.iter().all(|p| !p.is_integer()));
    }

    #[test]
    fn test_duration_window() {
        // 60s window: the point at 0 falls out once we reach 60_000
        let input = points(&[(0, 10), (30_000, 20), (60_000, 30)]);
        let output = moving_average(&input, MovingWindow::Duration(60_000));

        let values: Vec<f64> = output.iter().map(|p| p.to_f64()).collect();
        assert_eq!(values, vec![10.0, 15.0, 25.0]);
    }

    #[test]
    fn test_empty_input() {
        assert!(moving_average(&[], MovingWindow::Points(3)).is_empty());
    }
}
