//! Ready-to-render forecast tables

use crate::error::{ForecastError, Result};
use crate::models::ForecastResult;
use crate::transform::PercentChangePoint;
use chrono::NaiveDate;
use serde::Serialize;

/// One row of a forecast table
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastRecord {
    #[serde(rename = "Date")]
    pub timestamp: NaiveDate,
    #[serde(rename = "Forecasted CPI")]
    pub forecasted_cpi: f64,
    #[serde(rename = "Percent Change")]
    pub percent_change: f64,
    #[serde(rename = "Lower", skip_serializing_if = "Option::is_none")]
    pub lower: Option<f64>,
    #[serde(rename = "Upper", skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
}

/// Forecast of one strategy for one horizon
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastTable {
    /// Strategy label from the configuration
    pub strategy: String,
    /// Fitted model description, e.g. the selected ARIMA order
    pub model: String,
    pub horizon: usize,
    pub rows: Vec<ForecastRecord>,
}

impl ForecastTable {
    /// Zip a forecast with its percent changes, index by index
    pub fn assemble(
        strategy: impl Into<String>,
        forecast: &ForecastResult,
        changes: &[PercentChangePoint],
    ) -> Result<Self> {
        if changes.len() != forecast.horizon() {
            return Err(ForecastError::InvalidParameter(format!(
                "{} percent changes for a forecast of {} months",
                changes.len(),
                forecast.horizon()
            )));
        }

        let intervals = forecast.intervals();
        let rows = forecast
            .points()
            .iter()
            .zip(changes)
            .enumerate()
            .map(|(i, (point, change))| {
                if point.timestamp != change.timestamp {
                    return Err(ForecastError::InvalidParameter(format!(
                        "Percent change for {} paired with forecast for {}",
                        change.timestamp, point.timestamp
                    )));
                }
                let bounds = intervals.map(|b| b[i]);
                Ok(ForecastRecord {
                    timestamp: point.timestamp,
                    forecasted_cpi: point.predicted_value,
                    percent_change: change.percent_change,
                    lower: bounds.map(|(lo, _)| lo),
                    upper: bounds.map(|(_, hi)| hi),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            strategy: strategy.into(),
            model: forecast.model().to_string(),
            horizon: forecast.horizon(),
            rows,
        })
    }

    pub fn has_intervals(&self) -> bool {
        self.rows.iter().any(|r| r.lower.is_some())
    }
}
