//! # CPI Forecast
//!
//! Loading, forecasting and tabulating monthly Consumer Price Index data.
//!
//! ## Features
//!
//! - Monthly series loading from CSV (any day of month, any row order)
//! - Forecasting strategies behind one [`Forecaster`] capability:
//!   fixed-order ARIMA, automatic order selection, and the N-HiTS network
//! - Month-over-month percent change of every forecast
//! - Ready-to-render tables per strategy and horizon, with CSV/JSON export
//! - Holdout back-testing with MAE, RMSE, MAPE and sMAPE
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cpi_forecast::config::StrategyConfig;
//! use cpi_forecast::data::DataLoader;
//! use cpi_forecast::pipeline::forecast_request;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load data
//! let history = DataLoader::from_csv("data.csv")?;
//!
//! // Forecast the next three months with ARIMA(1,1,1)
//! let table = forecast_request(&history, &StrategyConfig::default(), 3, 0.95)?;
//!
//! for row in &table.rows {
//!     println!("{} {:.2} {:+.3}%", row.timestamp, row.forecasted_cpi, row.percent_change);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Every request constructs its own model, so requests are independent and
//! a failing strategy never affects the others or the loaded history.

pub mod calendar;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod transform;

// Re-export commonly used types
pub use crate::config::{DashboardConfig, StrategyConfig};
pub use crate::data::{DataLoader, TimeSeries};
pub use crate::error::{ForecastError, RequestError};
pub use crate::models::{ForecastModel, ForecastResult, Forecaster};
pub use crate::pipeline::{forecast_request, run_dashboard, DashboardReport, ForecastOutcome};
pub use crate::report::{ForecastRecord, ForecastTable};
pub use crate::transform::{percent_change, PercentChangePoint};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
