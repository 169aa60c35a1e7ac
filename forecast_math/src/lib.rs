//! # Forecast Math
//!
//! Numerical building blocks for the CPI forecasting models.
//! This crate provides differencing and integration, a bounded Nelder-Mead
//! optimizer, information criteria, interpolation, and the small dense
//! network pieces used by the neural forecaster.

use thiserror::Error;

pub mod criteria;
pub mod differencing;
pub mod interpolation;
pub mod neural;
pub mod optimization;

/// Errors raised while building network layers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Dense layer dimensions must be non-zero, got {inputs}x{outputs}")]
    EmptyLayer { inputs: usize, outputs: usize },

    #[error("Expected {expected_weights} weights and {expected_bias} biases, got {weights} and {bias}")]
    ShapeMismatch {
        expected_weights: usize,
        expected_bias: usize,
        weights: usize,
        bias: usize,
    },

    #[error("Invalid weight distribution: {0}")]
    Distribution(String),
}

/// Result type for forecasting math operations
pub type Result<T> = std::result::Result<T, MathError>;

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance (n - 1 denominator), 0 for fewer than two values
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_of_empty_is_none() {
        assert!(mean(&[]).is_none());
    }

    #[test]
    fn mean_and_variance() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&values).unwrap(), 5.0);
        assert_relative_eq!(variance(&values), 32.0 / 7.0);
        assert_eq!(variance(&[1.0]), 0.0);
    }
}
