//! Forecasting models for monthly series
//!
//! Models are two-phase, as elsewhere in the crate: a [`ForecastModel`] is
//! an untrained specification, [`ForecastModel::train`] produces a
//! [`TrainedForecastModel`] holding estimated state. The object-safe
//! [`Forecaster`] capability wraps both phases plus the shared month-stamping
//! postprocessing, and is what the request pipeline works with.

use crate::calendar::months_after;
use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Debug;
use tracing::debug;

pub mod arima;
pub mod auto_arima;
pub mod nhits;

/// One forecasted month
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    /// First day of the forecasted month
    pub timestamp: NaiveDate,
    pub predicted_value: f64,
}

/// Raw model output before it is stamped with months
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub values: Vec<f64>,
    /// Optional (lower, upper) bounds per step
    pub intervals: Option<Vec<(f64, f64)>>,
}

impl Prediction {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            intervals: None,
        }
    }

    pub fn with_intervals(values: Vec<f64>, intervals: Vec<(f64, f64)>) -> Self {
        Self {
            values,
            intervals: Some(intervals),
        }
    }
}

/// Ordered forecast for the months following a history
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    model: String,
    points: Vec<ForecastPoint>,
    intervals: Option<Vec<(f64, f64)>>,
}

impl ForecastResult {
    /// Stamp `prediction` with the months after `last_observed`.
    ///
    /// Fails if the prediction is not exactly `horizon` long or contains
    /// non-finite values.
    pub fn from_prediction(
        model: impl Into<String>,
        last_observed: NaiveDate,
        horizon: usize,
        prediction: Prediction,
    ) -> Result<Self> {
        let model = model.into();
        if prediction.values.len() != horizon {
            return Err(ForecastError::ModelFit(format!(
                "{} produced {} values for a horizon of {}",
                model,
                prediction.values.len(),
                horizon
            )));
        }
        if let Some(intervals) = &prediction.intervals {
            if intervals.len() != horizon {
                return Err(ForecastError::ModelFit(format!(
                    "{} produced {} intervals for a horizon of {}",
                    model,
                    intervals.len(),
                    horizon
                )));
            }
        }
        if prediction.values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ModelFit(format!(
                "{} produced a non-finite forecast",
                model
            )));
        }

        let months = months_after(last_observed, horizon).ok_or_else(|| {
            ForecastError::InvalidParameter(format!(
                "Horizon of {} months runs past the supported calendar",
                horizon
            ))
        })?;

        let points = months
            .into_iter()
            .zip(prediction.values)
            .map(|(timestamp, predicted_value)| ForecastPoint {
                timestamp,
                predicted_value,
            })
            .collect();

        Ok(Self {
            model,
            points,
            intervals: prediction.intervals,
        })
    }

    /// Name of the model that produced the forecast
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    /// Number of forecasted months
    pub fn horizon(&self) -> usize {
        self.points.len()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.predicted_value).collect()
    }

    pub fn timestamps(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.timestamp).collect()
    }

    /// Prediction interval bounds, if the model provides them
    pub fn intervals(&self) -> Option<&[(f64, f64)]> {
        self.intervals.as_deref()
    }
}

/// Fitted model state able to extrapolate
pub trait TrainedForecastModel: Debug {
    /// Predict the next `horizon` values after the training history
    fn forecast(&self, horizon: usize) -> Result<Prediction>;

    /// Name of the model, including fitted orders where relevant
    fn name(&self) -> &str;
}

/// Forecast model that can be trained on a monthly series
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train on `data` for forecasts of `horizon` months
    fn train(&self, data: &TimeSeries, horizon: usize) -> Result<Self::Trained>;

    /// Smallest history the model can be trained on for `horizon`
    fn min_history(&self, horizon: usize) -> usize;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// Forecasting capability shared by all strategies.
///
/// `forecast` is a pure function of the history, the horizon and the
/// forecaster's configuration; nothing is cached between calls.
pub trait Forecaster: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn forecast(&self, history: &TimeSeries, horizon: usize) -> Result<ForecastResult>;
}

impl<M> Forecaster for M
where
    M: ForecastModel + Send + Sync,
{
    fn name(&self) -> &str {
        ForecastModel::name(self)
    }

    fn forecast(&self, history: &TimeSeries, horizon: usize) -> Result<ForecastResult> {
        if horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "Forecast horizon must be at least one month".to_string(),
            ));
        }

        let needed = self.min_history(horizon);
        if history.len() < needed {
            return Err(ForecastError::InsufficientHistory {
                model: ForecastModel::name(self).to_string(),
                needed,
                got: history.len(),
            });
        }

        let trained = self.train(history, horizon)?;
        let prediction = trained.forecast(horizon)?;
        debug!(model = trained.name(), horizon, "forecast complete");

        ForecastResult::from_prediction(trained.name(), history.last_date(), horizon, prediction)
    }
}
