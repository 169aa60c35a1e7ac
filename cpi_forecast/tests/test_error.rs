use cpi_forecast::error::{ForecastError, RequestError};
use std::error::Error;

#[test]
fn test_error_messages() {
    let err = ForecastError::InsufficientHistory {
        model: "NHITS".to_string(),
        needed: 25,
        got: 10,
    };
    assert_eq!(
        err.to_string(),
        "Insufficient history for NHITS: need at least 25 observations, got 10"
    );

    let err = ForecastError::DivisionByZero { index: 0 };
    assert!(err.to_string().contains("index 0"));
}

#[test]
fn test_request_error_identifies_request() {
    let err = RequestError {
        strategy: "auto-arima".to_string(),
        horizon: 12,
        source: ForecastError::ModelFit("no candidate converged".to_string()),
    };

    assert_eq!(
        err.to_string(),
        "auto-arima forecast for a 12-month horizon failed: Model fit error: no candidate converged"
    );
    assert!(err.source().is_some());
}

#[test]
fn test_error_conversions() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    assert!(matches!(ForecastError::from(io), ForecastError::Io(_)));

    let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    assert!(matches!(ForecastError::from(json), ForecastError::Json(_)));

    let math = forecast_math::MathError::EmptyLayer { inputs: 0, outputs: 3 };
    match ForecastError::from(math) {
        ForecastError::ModelFit(msg) => assert!(msg.contains("0x3")),
        other => panic!("unexpected error: {:?}", other),
    }
}
