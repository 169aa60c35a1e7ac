//! # CPI Forecast Workspace
//!
//! Umbrella crate re-exporting the workspace libraries:
//!
//! - [`cpi_forecast`]: loading, forecasting strategies, percent change and tables
//! - [`forecast_math`]: numerical building blocks shared by the strategies
//!
//! ## Example
//!
//! ```
//! use chrono::NaiveDate;
//! use cpi_forecast_workspace::prelude::*;
//!
//! let history = TimeSeries::new(vec![
//!     (NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(), 100.0),
//!     (NaiveDate::from_ymd_opt(2023, 2, 1).unwrap(), 100.5),
//!     (NaiveDate::from_ymd_opt(2023, 3, 1).unwrap(), 101.0),
//! ])
//! .unwrap();
//!
//! let table = forecast_request(&history, &StrategyConfig::default(), 1, 0.95).unwrap();
//! assert_eq!(table.rows.len(), 1);
//! assert_eq!(table.rows[0].timestamp, NaiveDate::from_ymd_opt(2023, 4, 1).unwrap());
//! ```

pub use cpi_forecast;
pub use forecast_math;

/// The types most callers need
pub mod prelude {
    pub use cpi_forecast::{
        forecast_request, percent_change, run_dashboard, DashboardConfig, DataLoader,
        ForecastError, ForecastOutcome, ForecastResult, ForecastTable, Forecaster,
        StrategyConfig, TimeSeries,
    };
}

/// Workspace version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
