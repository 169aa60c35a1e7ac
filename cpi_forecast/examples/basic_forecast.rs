use chrono::{Months, NaiveDate};
use cpi_forecast::models::arima::ArimaModel;
use cpi_forecast::models::{ForecastModel, TrainedForecastModel};
use cpi_forecast::{percent_change, ForecastResult, ForecastTable, TimeSeries};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("CPI Forecast: Basic Forecasting Example");
    println!("=======================================\n");

    let history = create_sample_cpi();
    let summary = history.summary();
    println!(
        "History: {} months from {} to {}, last CPI {:.3}\n",
        summary.observations, summary.first_month, summary.last_month, summary.last_value
    );

    // Train once, then inspect the fitted model
    let model = ArimaModel::new(1, 1, 1);
    let trained = model.train(&history, 12)?;
    println!("Fitted {}", trained.name());
    println!("  AR coefficients: {:?}", trained.ar_coefficients());
    println!("  MA coefficients: {:?}", trained.ma_coefficients());
    println!("  Residual variance: {:.5}", trained.sigma2());
    println!("  AIC: {:.2}\n", trained.scores().aic);

    let prediction = trained.forecast(12)?;
    let forecast =
        ForecastResult::from_prediction(trained.name(), history.last_date(), 12, prediction)?;
    let changes = percent_change(&forecast, history.last_value())?;
    let table = ForecastTable::assemble("fixed-arima", &forecast, &changes)?;

    println!("{:<12} {:>14} {:>15} {:>22}", "Date", "Forecasted CPI", "Percent Change", "95% interval");
    for row in &table.rows {
        let interval = match (row.lower, row.upper) {
            (Some(lo), Some(hi)) => format!("[{:.2}, {:.2}]", lo, hi),
            _ => String::from("-"),
        };
        println!(
            "{:<12} {:>14.3} {:>14.3}% {:>22}",
            row.timestamp.format("%Y-%m"),
            row.forecasted_cpi,
            row.percent_change,
            interval
        );
    }

    Ok(())
}

// Ten years of CPI-like monthly data: steady inflation with a seasonal wobble
fn create_sample_cpi() -> TimeSeries {
    let start = NaiveDate::from_ymd_opt(2014, 1, 1).unwrap();
    let points = (0..120u32)
        .map(|i| {
            let t = i as f64;
            let level = 234.0 * (1.0 + 0.0022_f64).powf(t);
            let season = 0.35 * (2.0 * std::f64::consts::PI * t / 12.0).sin();
            (start + Months::new(i), level + season)
        })
        .collect();
    TimeSeries::new(points).unwrap()
}
