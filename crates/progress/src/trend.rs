//! Daily completion trend.

use chartrack_core::{Date, ProgressRecord};

/// One day of the completion trend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendPoint {
    /// Calendar day
    pub date: Date,

    /// Completion percentage recorded that day
    pub percent: f64,

    /// Change since the previous recorded day (0 for the first day)
    pub delta: f64,
}

/// Build the trend from the recorded history, oldest day first.
pub fn daily_trend(record: &ProgressRecord) -> Vec<TrendPoint> {
    let mut previous = None;
    record
        .history
        .iter()
        .map(|(&date, &percent)| {
            let delta = previous.map_or(0.0, |p| percent - p);
            previous = Some(percent);
            TrendPoint { date, percent, delta }
        })
        .collect()
}
