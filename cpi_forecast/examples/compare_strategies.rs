use chrono::{Months, NaiveDate};
use cpi_forecast::config::StrategyConfig;
use cpi_forecast::metrics::backtest;
use cpi_forecast::models::auto_arima::AutoArimaConfig;
use cpi_forecast::models::nhits::NHitsConfig;
use cpi_forecast::{forecast_request, TimeSeries};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("CPI Forecast: Strategy Comparison");
    println!("=================================\n");

    let history = create_sample_cpi();
    let strategies = vec![
        StrategyConfig::default(),
        StrategyConfig::AutoArima(AutoArimaConfig::default()),
        StrategyConfig::Nhits(NHitsConfig::default()),
    ];

    for horizon in [3, 12] {
        println!("{}-month horizon", horizon);
        for strategy in &strategies {
            match forecast_request(&history, strategy, horizon, 0.95) {
                Ok(table) => {
                    let last = table.rows.last().map(|r| r.forecasted_cpi).unwrap_or(f64::NAN);
                    let total: f64 = table.rows.iter().map(|r| r.percent_change).sum();
                    println!(
                        "  {:<12} {:<28} final {:.3}  cumulative {:+.3}%",
                        table.strategy, table.model, last, total
                    );
                }
                Err(err) => println!("  {}", err),
            }
        }
        println!();
    }

    println!("Back-test on the last 12 months");
    for strategy in &strategies {
        let forecaster = strategy.build(0.95)?;
        match backtest(strategy.label(), forecaster.as_ref(), &history, 12) {
            Ok(result) => println!("  {:<12} {}", result.strategy, result.metrics),
            Err(err) => println!("  {:<12} failed: {}", strategy.label(), err),
        }
    }

    Ok(())
}

fn create_sample_cpi() -> TimeSeries {
    let start = NaiveDate::from_ymd_opt(2012, 1, 1).unwrap();
    let points = (0..144u32)
        .map(|i| {
            let t = i as f64;
            let level = 229.0 + 0.42 * t + 0.0015 * t * t;
            let season = 0.3 * (2.0 * std::f64::consts::PI * t / 12.0).sin();
            (start + Months::new(i), level + season)
        })
        .collect();
    TimeSeries::new(points).unwrap()
}
