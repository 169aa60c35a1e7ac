//! Metrics for evaluating forecast performance

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::Forecaster;
use serde::Serialize;
use tracing::debug;

/// Forecast accuracy against withheld observations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error, over non-zero actuals
    pub mape: f64,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
    /// Share of month-to-month moves whose sign was predicted, in percent
    pub direction_accuracy: f64,
}

/// One-line summary used in dashboard and example output
impl std::fmt::Display for ForecastMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MAE {:.4}  RMSE {:.4}  MAPE {:.4}%  sMAPE {:.4}%  direction {:.1}%",
            self.mae, self.rmse, self.mape, self.smape, self.direction_accuracy
        )
    }
}

/// Back-test outcome for one strategy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Backtest {
    pub strategy: String,
    /// Model name as reported by the fitted forecaster
    pub model: String,
    pub holdout_months: usize,
    pub forecast: Vec<f64>,
    pub actual: Vec<f64>,
    pub metrics: ForecastMetrics,
}

/// Evaluate forecast accuracy against actual values
pub fn evaluate_forecast(forecast: &[f64], actual: &[f64]) -> Result<ForecastMetrics> {
    if forecast.len() != actual.len() || forecast.is_empty() {
        return Err(ForecastError::InvalidParameter(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }

    let n = forecast.len() as f64;
    let errors: Vec<f64> = forecast.iter().zip(actual).map(|(f, a)| a - f).collect();

    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let mse = errors.iter().map(|e| e.powi(2)).sum::<f64>() / n;
    let rmse = mse.sqrt();

    let (pct_sum, pct_count) = actual
        .iter()
        .zip(&errors)
        .filter(|(&a, _)| a != 0.0)
        .fold((0.0, 0usize), |(sum, count), (a, e)| {
            (sum + e.abs() / a.abs() * 100.0, count + 1)
        });
    let mape = if pct_count > 0 {
        pct_sum / pct_count as f64
    } else {
        0.0
    };

    let smape = actual
        .iter()
        .zip(forecast)
        .map(|(&a, &f)| {
            let denom = a.abs() + f.abs();
            if denom == 0.0 {
                0.0
            } else {
                200.0 * (a - f).abs() / denom
            }
        })
        .sum::<f64>()
        / n;

    let moves: Vec<bool> = forecast
        .windows(2)
        .zip(actual.windows(2))
        .filter(|(f, a)| (f[1] - f[0]).abs() > 1e-10 && (a[1] - a[0]).abs() > 1e-10)
        .map(|(f, a)| (f[1] > f[0]) == (a[1] > a[0]))
        .collect();
    let direction_accuracy = if moves.is_empty() {
        0.0
    } else {
        moves.iter().filter(|&&hit| hit).count() as f64 / moves.len() as f64 * 100.0
    };

    Ok(ForecastMetrics {
        mae,
        mse,
        rmse,
        mape,
        smape,
        direction_accuracy,
    })
}

/// Train on all but the last `holdout_months` observations and score the
/// forecast of those months
pub fn backtest(
    strategy: &str,
    forecaster: &dyn Forecaster,
    history: &TimeSeries,
    holdout_months: usize,
) -> Result<Backtest> {
    let (training, actual) = history.split_holdout(holdout_months)?;
    let result = forecaster.forecast(&training, holdout_months)?;
    let forecast = result.values();
    let metrics = evaluate_forecast(&forecast, &actual)?;
    debug!(strategy, model = result.model(), mae = metrics.mae, "back-test complete");

    Ok(Backtest {
        strategy: strategy.to_string(),
        model: result.model().to_string(),
        holdout_months,
        forecast,
        actual,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::arima::ArimaModel;
    use approx::assert_relative_eq;
    use chrono::{Months, NaiveDate};

    #[test]
    fn perfect_forecast_has_zero_error() {
        let m = evaluate_forecast(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.smape, 0.0);
        assert_eq!(m.direction_accuracy, 100.0);
    }

    #[test]
    fn known_errors() {
        let m = evaluate_forecast(&[110.0, 90.0], &[100.0, 100.0]).unwrap();
        assert_relative_eq!(m.mae, 10.0);
        assert_relative_eq!(m.mse, 100.0);
        assert_relative_eq!(m.rmse, 10.0);
        assert_relative_eq!(m.mape, 10.0);
        // forecast fell, actual flat: no move to score
        assert_eq!(m.direction_accuracy, 0.0);
    }

    #[test]
    fn mape_skips_zero_actuals() {
        let m = evaluate_forecast(&[1.0, 110.0], &[0.0, 100.0]).unwrap();
        assert_relative_eq!(m.mape, 10.0);
    }

    #[test]
    fn rejects_mismatched_lengths() {
        assert!(evaluate_forecast(&[1.0], &[1.0, 2.0]).is_err());
        assert!(evaluate_forecast(&[], &[]).is_err());
    }

    #[test]
    fn backtest_scores_withheld_months() {
        let start = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
        let history = TimeSeries::new(
            (0..48)
                .map(|i| (start + Months::new(i), 240.0 + 0.4 * i as f64 + (i as f64).sin()))
                .collect(),
        )
        .unwrap();
        let model = ArimaModel::new(1, 1, 0);
        let result = backtest("fixed-arima", &model, &history, 6).unwrap();

        assert_eq!(result.holdout_months, 6);
        assert_eq!(result.forecast.len(), 6);
        assert_eq!(result.actual, history.values()[42..].to_vec());
        assert!(result.metrics.mae.is_finite());
    }
}
