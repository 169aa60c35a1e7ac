use approx::assert_relative_eq;
use chrono::NaiveDate;
use cpi_forecast::calendar::is_contiguous;
use cpi_forecast::config::{FixedArimaConfig, StrategyConfig};
use cpi_forecast::models::nhits::NHitsConfig;
use cpi_forecast::pipeline::{build_report, BacktestOutcome};
use cpi_forecast::{
    forecast_request, percent_change, run_dashboard, DashboardConfig, DataLoader, ForecastError,
    ForecastOutcome,
};
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

// Monthly CPI-like file, deliberately out of order and mid-month
fn create_sample_data(months: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Date,CPI").unwrap();
    for i in (0..months).rev() {
        let year = 2018 + (i / 12) as i32;
        let month = (i % 12) as u32 + 1;
        let value = 250.0 + 0.3 * i as f64 + 0.4 * ((i as f64) / 4.0).sin();
        writeln!(file, "{}-{:02}-15,{:.3}", year, month, value).unwrap();
    }
    file
}

fn fixed(p: usize, d: usize, q: usize) -> StrategyConfig {
    StrategyConfig::FixedArima(FixedArimaConfig {
        p,
        d,
        q,
        include_constant: None,
    })
}

#[test]
fn test_three_month_history_one_step() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Date,CPI").unwrap();
    writeln!(file, "2023-01-01,100.0").unwrap();
    writeln!(file, "2023-02-01,100.5").unwrap();
    writeln!(file, "2023-03-01,101.0").unwrap();

    let history = DataLoader::from_csv(file.path()).unwrap();
    let table = forecast_request(&history, &StrategyConfig::default(), 1, 0.95).unwrap();

    assert_eq!(table.rows.len(), 1);
    let row = table.rows[0];
    assert_eq!(row.timestamp, NaiveDate::from_ymd_opt(2023, 4, 1).unwrap());
    assert_relative_eq!(
        row.percent_change,
        (row.forecasted_cpi - 101.0) / 101.0 * 100.0,
        epsilon = 1e-12
    );
}

#[test]
fn test_zero_last_value_fails_after_forecasting() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Date,CPI").unwrap();
    writeln!(file, "2023-01-01,0.4").unwrap();
    writeln!(file, "2023-02-01,0.2").unwrap();
    writeln!(file, "2023-03-01,0.0").unwrap();
    let history = DataLoader::from_csv(file.path()).unwrap();

    // The forecast itself succeeds with all three points
    let strategy = fixed(0, 1, 0);
    let forecaster = strategy.build(0.95).unwrap();
    let forecast = forecaster.forecast(&history, 3).unwrap();
    assert_eq!(forecast.horizon(), 3);

    assert!(matches!(
        percent_change(&forecast, history.last_value()),
        Err(ForecastError::DivisionByZero { index: 0 })
    ));

    let err = forecast_request(&history, &strategy, 3, 0.95).unwrap_err();
    assert_eq!(err.strategy, "fixed-arima");
    assert_eq!(err.horizon, 3);
    assert!(matches!(err.source, ForecastError::DivisionByZero { index: 0 }));
}

#[test]
fn test_two_strategies_same_history() {
    let file = create_sample_data(48);
    let history = DataLoader::from_csv(file.path()).unwrap();
    let nhits = StrategyConfig::Nhits(NHitsConfig {
        hidden_size: 16,
        max_steps: 40,
        ..Default::default()
    });

    let arima = forecast_request(&history, &StrategyConfig::default(), 3, 0.95).unwrap();
    let neural = forecast_request(&history, &nhits, 3, 0.95).unwrap();

    for table in [&arima, &neural] {
        let months: Vec<NaiveDate> = table.rows.iter().map(|r| r.timestamp).collect();
        assert_eq!(months[0], NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
        assert!(is_contiguous(&months));
    }
    assert!(arima.has_intervals());
    assert!(!neural.has_intervals());
    assert_ne!(arima.rows[0].forecasted_cpi, neural.rows[0].forecasted_cpi);
}

#[test]
fn test_run_dashboard_from_config_file() {
    let data = create_sample_data(36);
    let mut config_file = NamedTempFile::new().unwrap();
    write!(
        config_file,
        r#"{{
            "data_path": {},
            "horizons": [3, 12],
            "strategies": [
                {{"kind": "fixed_arima"}},
                {{"kind": "fixed_arima", "p": 2, "d": 1, "q": 0}},
                {{"kind": "nhits", "max_steps": 20, "hidden_size": 8, "input_size": 40}}
            ],
            "holdout_months": 6
        }}"#,
        serde_json::to_string(&data.path()).unwrap()
    )
    .unwrap();

    let config = DashboardConfig::from_json_file(config_file.path()).unwrap();
    let report = run_dashboard(&config).unwrap();

    assert_eq!(report.summary.observations, 36);
    assert_eq!(report.history.len(), 36);
    assert_eq!(report.outcomes.len(), 6);
    // both ARIMA strategies succeed; N-HiTS needs 40 months
    assert_eq!(report.tables().count(), 4);
    for outcome in &report.outcomes[4..] {
        assert!(matches!(outcome, ForecastOutcome::Failed { strategy, .. } if strategy == "nhits"));
    }
    assert_eq!(report.backtests.len(), 3);
    assert!(matches!(report.backtests[0], BacktestOutcome::Succeeded(_)));
    assert!(matches!(report.backtests[2], BacktestOutcome::Failed { .. }));
}

#[test]
fn test_failed_load_is_fatal() {
    let config = DashboardConfig {
        data_path: "does/not/exist.csv".into(),
        ..Default::default()
    };
    assert!(matches!(run_dashboard(&config), Err(ForecastError::Io(_))));
}

#[test]
fn test_report_serialises_outcomes_with_status() {
    let file = create_sample_data(24);
    let history = DataLoader::from_csv(file.path()).unwrap();
    let config = DashboardConfig {
        horizons: vec![3],
        strategies: vec![fixed(1, 1, 1), fixed(30, 1, 0)],
        ..Default::default()
    };
    let report = build_report(&history, &config);
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["outcomes"][0]["status"], "succeeded");
    assert_eq!(json["outcomes"][0]["rows"][0]["Date"], "2020-01-01");
    assert_eq!(json["outcomes"][1]["status"], "failed");
    assert_eq!(json["history"][0]["CPI"], 250.0);
}
