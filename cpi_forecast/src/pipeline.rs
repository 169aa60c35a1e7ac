//! Stateless request handlers
//!
//! Every forecast request builds its own forecaster, so requests share no
//! state and can run in any order. A failed request is reported alongside
//! the successful ones; only a failure to load the history is fatal.

use crate::config::{DashboardConfig, StrategyConfig};
use crate::data::{DataLoader, Observation, SeriesSummary, TimeSeries};
use crate::error::{RequestError, Result};
use crate::metrics::{backtest, Backtest};
use crate::report::ForecastTable;
use crate::transform::percent_change;
use serde::Serialize;
use tracing::{error, info};

/// Result of one strategy x horizon request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ForecastOutcome {
    Succeeded(ForecastTable),
    Failed {
        strategy: String,
        horizon: usize,
        message: String,
    },
}

impl ForecastOutcome {
    pub fn strategy(&self) -> &str {
        match self {
            ForecastOutcome::Succeeded(table) => &table.strategy,
            ForecastOutcome::Failed { strategy, .. } => strategy,
        }
    }

    pub fn horizon(&self) -> usize {
        match self {
            ForecastOutcome::Succeeded(table) => table.horizon,
            ForecastOutcome::Failed { horizon, .. } => *horizon,
        }
    }

    pub fn table(&self) -> Option<&ForecastTable> {
        match self {
            ForecastOutcome::Succeeded(table) => Some(table),
            ForecastOutcome::Failed { .. } => None,
        }
    }
}

impl From<std::result::Result<ForecastTable, RequestError>> for ForecastOutcome {
    fn from(result: std::result::Result<ForecastTable, RequestError>) -> Self {
        match result {
            Ok(table) => ForecastOutcome::Succeeded(table),
            Err(err) => ForecastOutcome::Failed {
                strategy: err.strategy.clone(),
                horizon: err.horizon,
                message: err.to_string(),
            },
        }
    }
}

/// Back-test of one strategy, or why it could not run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BacktestOutcome {
    Succeeded(Backtest),
    Failed { strategy: String, message: String },
}

/// Everything the presentation layer renders for one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub summary: SeriesSummary,
    pub history: Vec<Observation>,
    pub outcomes: Vec<ForecastOutcome>,
    pub backtests: Vec<BacktestOutcome>,
}

impl DashboardReport {
    pub fn tables(&self) -> impl Iterator<Item = &ForecastTable> {
        self.outcomes.iter().filter_map(ForecastOutcome::table)
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.table().is_none()).count()
    }
}

/// Forecast `horizon` months with a fresh forecaster built from `strategy`
/// and attach percent changes.
pub fn forecast_request(
    history: &TimeSeries,
    strategy: &StrategyConfig,
    horizon: usize,
    confidence_level: f64,
) -> std::result::Result<ForecastTable, RequestError> {
    let tag = |source| RequestError {
        strategy: strategy.label().to_string(),
        horizon,
        source,
    };

    let forecaster = strategy.build(confidence_level).map_err(tag)?;
    let forecast = forecaster.forecast(history, horizon).map_err(tag)?;
    let changes = percent_change(&forecast, history.last_value()).map_err(tag)?;
    let table = ForecastTable::assemble(strategy.label(), &forecast, &changes).map_err(tag)?;

    info!(
        strategy = strategy.label(),
        model = %table.model,
        horizon,
        "forecast request complete"
    );
    Ok(table)
}

/// Run every configured strategy for every configured horizon
pub fn run_dashboard(config: &DashboardConfig) -> Result<DashboardReport> {
    config.validate()?;
    let loader = DataLoader::new(config.date_column.clone(), config.value_column.clone());
    let history = loader.load(&config.data_path)?;
    Ok(build_report(&history, config))
}

/// Forecasts and back-tests for an already loaded history
pub fn build_report(history: &TimeSeries, config: &DashboardConfig) -> DashboardReport {
    let mut outcomes = Vec::with_capacity(config.strategies.len() * config.horizons.len());
    for strategy in &config.strategies {
        for &horizon in &config.horizons {
            let result = forecast_request(history, strategy, horizon, config.confidence_level);
            if let Err(err) = &result {
                error!(strategy = %err.strategy, horizon = err.horizon, error = %err.source, "forecast request failed");
            }
            outcomes.push(ForecastOutcome::from(result));
        }
    }

    let backtests = match config.holdout_months {
        Some(holdout) => config
            .strategies
            .iter()
            .map(|strategy| run_backtest(history, strategy, holdout, config.confidence_level))
            .collect(),
        None => Vec::new(),
    };

    DashboardReport {
        summary: history.summary(),
        history: history.observations(),
        outcomes,
        backtests,
    }
}

fn run_backtest(
    history: &TimeSeries,
    strategy: &StrategyConfig,
    holdout: usize,
    confidence_level: f64,
) -> BacktestOutcome {
    let result = strategy
        .build(confidence_level)
        .and_then(|forecaster| backtest(strategy.label(), forecaster.as_ref(), history, holdout));
    match result {
        Ok(bt) => BacktestOutcome::Succeeded(bt),
        Err(err) => {
            error!(strategy = strategy.label(), error = %err, "back-test failed");
            BacktestOutcome::Failed {
                strategy: strategy.label().to_string(),
                message: err.to_string(),
            }
        }
    }
}
