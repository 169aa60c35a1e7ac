//! Month-over-month percent change of a forecast

use crate::error::{ForecastError, Result};
use crate::models::ForecastResult;
use chrono::NaiveDate;
use serde::Serialize;

/// Percent change of one forecasted month relative to the month before it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentChangePoint {
    pub timestamp: NaiveDate,
    /// Signed, in percent units
    pub percent_change: f64,
}

/// Percent change of each forecast point against its predecessor.
///
/// The first point is compared with `last_observed`, the last value of the
/// history; every later point with the previous forecast. A zero
/// denominator anywhere fails the whole computation with
/// [`ForecastError::DivisionByZero`].
pub fn percent_change(
    forecast: &ForecastResult,
    last_observed: f64,
) -> Result<Vec<PercentChangePoint>> {
    let mut previous = last_observed;
    let mut changes = Vec::with_capacity(forecast.horizon());

    for (index, point) in forecast.points().iter().enumerate() {
        let change = relative_change(previous, point.predicted_value)
            .ok_or(ForecastError::DivisionByZero { index })?;
        changes.push(PercentChangePoint {
            timestamp: point.timestamp,
            percent_change: change,
        });
        previous = point.predicted_value;
    }

    Ok(changes)
}

fn relative_change(from: f64, to: f64) -> Option<f64> {
    if from == 0.0 {
        return None;
    }
    let change = (to - from) / from * 100.0;
    change.is_finite().then_some(change)
}
