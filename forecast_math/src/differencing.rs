//! Differencing and integration for ARIMA-type models
//!
//! Contains:
//! - Ordinary differencing of order d
//! - Integration of a differenced forecast back onto the original scale
//! - A variance-ratio heuristic for choosing d

use crate::variance;

/// Apply differencing of order `d` to a series.
///
/// Each pass shortens the series by one. Differencing stops early once the
/// series has a single element left.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= 1 {
            break;
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Integrate forecasts made on the `d`-times differenced scale.
///
/// `original` is the undifferenced history that the forecasts continue.
/// Each level is restored by a running sum seeded with the last value of
/// the history differenced to that level.
pub fn integrate(differenced: &[f64], original: &[f64], d: usize) -> Vec<f64> {
    if d == 0 || differenced.is_empty() {
        return differenced.to_vec();
    }

    let mut result = differenced.to_vec();
    for level in (0..d).rev() {
        let anchor = difference(original, level).last().copied().unwrap_or(0.0);
        let mut running = anchor;
        for value in result.iter_mut() {
            running += *value;
            *value = running;
        }
    }
    result
}

/// Suggest a differencing order between 0 and `max_d`.
///
/// Another difference is taken while it shrinks the sample variance by more
/// than 10%.
pub fn suggest_differencing(series: &[f64], max_d: usize) -> usize {
    let mut d = 0;
    let mut current = series.to_vec();
    let mut current_var = variance(&current);

    while d < max_d && current.len() >= 3 {
        let next = difference(&current, 1);
        let next_var = variance(&next);
        if current_var > 0.0 && next_var / current_var < 0.9 {
            d += 1;
            current = next;
            current_var = next_var;
        } else {
            break;
        }
    }
    d
}
