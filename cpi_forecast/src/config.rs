//! Dashboard and strategy configuration
//!
//! Configuration is a JSON document. Every field has a default, so an empty
//! object `{}` describes the stock dashboard: `data.csv` in the working directory,
//! horizons of 3 and 12 months and the fixed-order ARIMA strategy.

use crate::error::{ForecastError, Result};
use crate::models::arima::{ArimaModel, ArimaOrder};
use crate::models::auto_arima::{AutoArima, AutoArimaConfig};
use crate::models::nhits::{NHits, NHitsConfig};
use crate::models::Forecaster;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Fixed (p, d, q) ARIMA settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedArimaConfig {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    /// `None` estimates a constant only for undifferenced models
    pub include_constant: Option<bool>,
}

impl Default for FixedArimaConfig {
    fn default() -> Self {
        let order = ArimaOrder::default();
        Self {
            p: order.p,
            d: order.d,
            q: order.q,
            include_constant: None,
        }
    }
}

/// One forecasting strategy, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    FixedArima(FixedArimaConfig),
    AutoArima(AutoArimaConfig),
    Nhits(NHitsConfig),
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig::FixedArima(FixedArimaConfig::default())
    }
}

impl StrategyConfig {
    /// Short label used in tables, logs and file names
    pub fn label(&self) -> &'static str {
        match self {
            StrategyConfig::FixedArima(_) => "fixed-arima",
            StrategyConfig::AutoArima(_) => "auto-arima",
            StrategyConfig::Nhits(_) => "nhits",
        }
    }

    /// Construct a fresh forecaster.
    ///
    /// `confidence_level` sets the prediction interval coverage for the
    /// ARIMA strategies; the neural strategy produces point forecasts only.
    pub fn build(&self, confidence_level: f64) -> Result<Box<dyn Forecaster>> {
        match self {
            StrategyConfig::FixedArima(cfg) => {
                let mut model = ArimaModel::new(cfg.p, cfg.d, cfg.q)
                    .with_confidence_level(confidence_level)?;
                if let Some(include) = cfg.include_constant {
                    model = model.with_constant(include);
                }
                Ok(Box::new(model))
            }
            StrategyConfig::AutoArima(cfg) => {
                let cfg = AutoArimaConfig {
                    confidence_level,
                    ..cfg.clone()
                };
                Ok(Box::new(AutoArima::new(cfg)?))
            }
            StrategyConfig::Nhits(cfg) => Ok(Box::new(NHits::new(cfg.clone())?)),
        }
    }

    /// Override the neural seed; other strategies are unaffected
    pub fn with_seed(self, seed: u64) -> Self {
        match self {
            StrategyConfig::Nhits(cfg) => StrategyConfig::Nhits(NHitsConfig { seed, ..cfg }),
            other => other,
        }
    }
}

/// Everything one dashboard run needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub data_path: PathBuf,
    pub date_column: String,
    pub value_column: String,
    pub horizons: Vec<usize>,
    pub strategies: Vec<StrategyConfig>,
    /// Months withheld for the optional back-test
    pub holdout_months: Option<usize>,
    pub confidence_level: f64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data.csv"),
            date_column: "Date".to_string(),
            value_column: "CPI".to_string(),
            horizons: vec![3, 12],
            strategies: vec![StrategyConfig::default()],
            holdout_months: None,
            confidence_level: 0.95,
        }
    }
}

impl DashboardConfig {
    /// Read and validate a JSON configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: DashboardConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.horizons.is_empty() {
            return Err(ForecastError::Config("At least one horizon is required".to_string()));
        }
        if self.horizons.contains(&0) {
            return Err(ForecastError::Config("Horizons must be positive".to_string()));
        }
        if self.strategies.is_empty() {
            return Err(ForecastError::Config("At least one strategy is required".to_string()));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(ForecastError::Config(format!(
                "Confidence level {} must be strictly between 0 and 1",
                self.confidence_level
            )));
        }
        if self.holdout_months == Some(0) {
            return Err(ForecastError::Config("Holdout must be at least one month".to_string()));
        }
        for strategy in &self.strategies {
            match strategy {
                StrategyConfig::Nhits(cfg) => cfg
                    .validate()
                    .map_err(|e| ForecastError::Config(e.to_string()))?,
                StrategyConfig::AutoArima(cfg) if cfg.max_d > 2 => {
                    return Err(ForecastError::Config(
                        "Auto ARIMA differencing is limited to d <= 2".to_string(),
                    ))
                }
                _ => {}
            }
        }
        Ok(())
    }
}
