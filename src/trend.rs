use crate::models::TimeSeriesPoint;

/// Percentage change between the last two points, or `None` when there are
/// fewer than two points or the earlier value is zero.
pub fn trend_change(series: &[TimeSeriesPoint]) -> Option<f64> {
    let [.., previous, last] = series else {
        return None;
    };

    if previous.score == 0.0 {
        return None;
    }

    Some((last.score - previous.score) / previous.score.abs() * 100.0)
}

pub fn calculate_trend(series: &[TimeSeriesPoint]) -> f64 {
    trend_change(series).unwrap_or(0.0)
}
