//! ARIMA models for monthly forecasting
//!
//! Coefficients are estimated by minimising the conditional sum of squares
//! (CSS) of one-step errors on the differenced series with a bounded
//! Nelder-Mead search. A fit that does not converge is an error.

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, Prediction, TrainedForecastModel};
use forecast_math::criteria::ModelScores;
use forecast_math::differencing::{difference, integrate};
use forecast_math::optimization::{nelder_mead, NelderMeadConfig};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt;
use tracing::debug;

/// Bound on AR and MA coefficients, keeping fits stationary and invertible
const COEFFICIENT_BOUND: f64 = 0.99;

/// (p, d, q) order of an ARIMA model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArimaOrder {
    /// AR order
    pub p: usize,
    /// Differencing order
    pub d: usize,
    /// MA order
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Observations needed before the order can be estimated
    pub fn min_history(&self) -> usize {
        self.d + self.p.max(self.q) + 1
    }
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// ARIMA model (AutoRegressive Integrated Moving Average) with a fixed order
#[derive(Debug, Clone)]
pub struct ArimaModel {
    /// Name of the model
    name: String,
    order: ArimaOrder,
    /// `None` means "only when d == 0"
    include_constant: Option<bool>,
    confidence_level: f64,
    optimizer: NelderMeadConfig,
}

/// Trained ARIMA model
#[derive(Debug, Clone)]
pub struct TrainedArimaModel {
    name: String,
    order: ArimaOrder,
    /// Mean of the differenced process (0 when no constant is fitted)
    constant: f64,
    ar_coefficients: Vec<f64>,
    ma_coefficients: Vec<f64>,
    /// Original training values, needed to integrate forecasts
    history: Vec<f64>,
    differenced: Vec<f64>,
    residuals: Vec<f64>,
    sigma2: f64,
    scores: ModelScores,
    confidence_level: f64,
}

impl ArimaModel {
    /// Create a new ARIMA(p, d, q) model
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self::from_order(ArimaOrder::new(p, d, q))
    }

    pub fn from_order(order: ArimaOrder) -> Self {
        Self {
            name: order.to_string(),
            order,
            include_constant: None,
            confidence_level: 0.95,
            optimizer: NelderMeadConfig::default(),
        }
    }

    /// Force the constant term on or off
    pub fn with_constant(mut self, include: bool) -> Self {
        self.include_constant = Some(include);
        self
    }

    /// Coverage of the prediction intervals, strictly between 0 and 1
    pub fn with_confidence_level(mut self, level: f64) -> Result<Self> {
        validate_level(level)?;
        self.confidence_level = level;
        Ok(self)
    }

    /// Replace the optimizer settings
    pub fn with_optimizer(mut self, optimizer: NelderMeadConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    /// Whether a constant is estimated for this order
    pub fn includes_constant(&self) -> bool {
        self.include_constant.unwrap_or(self.order.d == 0)
    }
}

impl ForecastModel for ArimaModel {
    type Trained = TrainedArimaModel;

    fn train(&self, data: &TimeSeries, _horizon: usize) -> Result<TrainedArimaModel> {
        fit_arima(
            data.values(),
            self.order,
            self.includes_constant(),
            self.confidence_level,
            &self.optimizer,
        )
    }

    fn min_history(&self, _horizon: usize) -> usize {
        self.order.min_history()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Estimate an ARIMA model of the given order on `values`.
pub(crate) fn fit_arima(
    values: &[f64],
    order: ArimaOrder,
    include_constant: bool,
    confidence_level: f64,
    optimizer: &NelderMeadConfig,
) -> Result<TrainedArimaModel> {
    let ArimaOrder { p, q, .. } = order;
    if values.len() < order.min_history() {
        return Err(ForecastError::InsufficientHistory {
            model: order.to_string(),
            needed: order.min_history(),
            got: values.len(),
        });
    }

    let differenced = difference(values, order.d);
    let offset = usize::from(include_constant);
    let mean = forecast_math::mean(&differenced).unwrap_or(0.0);

    let mut initial = Vec::with_capacity(offset + p + q);
    let mut bounds = Vec::with_capacity(offset + p + q);
    if include_constant {
        initial.push(mean);
        bounds.push((f64::NEG_INFINITY, f64::INFINITY));
    }
    for i in 0..p + q {
        let lag = if i < p { i } else { i - p };
        initial.push(0.1 / (lag + 1) as f64);
        bounds.push((-COEFFICIENT_BOUND, COEFFICIENT_BOUND));
    }

    let unpack = |params: &[f64]| -> (f64, Vec<f64>, Vec<f64>) {
        let constant = if include_constant { params[0] } else { 0.0 };
        let ar = params[offset..offset + p].to_vec();
        let ma = params[offset + p..offset + p + q].to_vec();
        (constant, ar, ma)
    };

    let (constant, ar, ma) = if p == 0 && q == 0 {
        // Only the constant, whose CSS minimiser is the sample mean
        (if include_constant { mean } else { 0.0 }, Vec::new(), Vec::new())
    } else {
        let result = nelder_mead(
            |params| {
                let (c, ar, ma) = unpack(params);
                conditional_residuals(&differenced, c, &ar, &ma).0
            },
            &initial,
            Some(&bounds),
            optimizer,
        );
        if !result.converged || !result.optimal_value.is_finite() {
            return Err(ForecastError::ModelFit(format!(
                "{} did not converge after {} iterations",
                order, result.iterations
            )));
        }
        unpack(&result.optimal_point)
    };

    let (sse, residuals) = conditional_residuals(&differenced, constant, &ar, &ma);
    let n_eff = differenced.len() - p;
    let k = offset + p + q + 1;
    let scores = ModelScores::from_sse(sse, n_eff, k);
    let sigma2 = sse / n_eff as f64;

    debug!(
        %order,
        constant,
        ar = ?ar,
        ma = ?ma,
        sigma2,
        aic = scores.aic,
        "fitted ARIMA"
    );

    Ok(TrainedArimaModel {
        name: order.to_string(),
        order,
        constant,
        ar_coefficients: ar,
        ma_coefficients: ma,
        history: values.to_vec(),
        differenced,
        residuals,
        sigma2,
        scores,
        confidence_level,
    })
}

/// Conditional sum of squares and residuals of a mean-adjusted ARMA on `w`.
///
/// The first `p` values are conditioned on; pre-sample errors are zero.
fn conditional_residuals(w: &[f64], constant: f64, ar: &[f64], ma: &[f64]) -> (f64, Vec<f64>) {
    let p = ar.len();
    let mut residuals = vec![0.0; w.len()];
    let mut sse = 0.0;

    for t in p..w.len() {
        let mut pred = constant;
        for (i, phi) in ar.iter().enumerate() {
            pred += phi * (w[t - 1 - i] - constant);
        }
        for (j, theta) in ma.iter().enumerate() {
            if t > j {
                pred += theta * residuals[t - 1 - j];
            }
        }
        let error = w[t] - pred;
        residuals[t] = error;
        sse += error * error;
    }

    (sse, residuals)
}

impl TrainedArimaModel {
    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coefficients
    }

    /// One-step residuals on the differenced scale
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Innovation variance estimate
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn scores(&self) -> ModelScores {
        self.scores
    }

    /// Point forecasts on the original scale
    pub fn point_forecast(&self, horizon: usize) -> Vec<f64> {
        let p = self.ar_coefficients.len();
        let q = self.ma_coefficients.len();
        let mut w = self.differenced.clone();
        let mut e = self.residuals.clone();

        for _ in 0..horizon {
            let t = w.len();
            let mut pred = self.constant;
            for i in 0..p.min(t) {
                pred += self.ar_coefficients[i] * (w[t - 1 - i] - self.constant);
            }
            for j in 0..q.min(t) {
                pred += self.ma_coefficients[j] * e[t - 1 - j];
            }
            w.push(pred);
            e.push(0.0);
        }

        let forecast_diff = &w[self.differenced.len()..];
        integrate(forecast_diff, &self.history, self.order.d)
    }

    /// Psi weights of the integrated model, `psi[0] == 1`
    pub fn psi_weights(&self, count: usize) -> Vec<f64> {
        // phi(B) * (1 - B)^d as a lag polynomial [1, a1, a2, ...]
        let mut poly = vec![1.0];
        poly.extend(self.ar_coefficients.iter().map(|phi| -phi));
        for _ in 0..self.order.d {
            let mut next = vec![0.0; poly.len() + 1];
            for (i, c) in poly.iter().enumerate() {
                next[i] += c;
                next[i + 1] -= c;
            }
            poly = next;
        }
        let phi_star: Vec<f64> = poly[1..].iter().map(|a| -a).collect();

        let mut psi = Vec::with_capacity(count);
        for j in 0..count {
            if j == 0 {
                psi.push(1.0);
                continue;
            }
            let mut value = self.ma_coefficients.get(j - 1).copied().unwrap_or(0.0);
            for (i, phi) in phi_star.iter().enumerate().take(j) {
                value += phi * psi[j - 1 - i];
            }
            psi.push(value);
        }
        psi
    }
}

impl TrainedForecastModel for TrainedArimaModel {
    fn forecast(&self, horizon: usize) -> Result<Prediction> {
        if self.history.is_empty() {
            return Err(ForecastError::ModelFit(
                "Model has not been fitted to data".to_string(),
            ));
        }

        let values = self.point_forecast(horizon);
        let z = normal_quantile(self.confidence_level)?;
        let psi = self.psi_weights(horizon);

        let mut cumulative = 0.0;
        let intervals = values
            .iter()
            .zip(&psi)
            .map(|(value, weight)| {
                cumulative += weight * weight;
                let half_width = z * (self.sigma2 * cumulative).sqrt();
                (value - half_width, value + half_width)
            })
            .collect();

        Ok(Prediction::with_intervals(values, intervals))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn validate_level(level: f64) -> Result<()> {
    if level <= 0.0 || level >= 1.0 {
        return Err(ForecastError::InvalidParameter(
            "Confidence level must be between 0 and 1".to_string(),
        ));
    }
    Ok(())
}

/// Two-sided standard normal multiplier for `level` coverage
pub(crate) fn normal_quantile(level: f64) -> Result<f64> {
    validate_level(level)?;
    let normal =
        Normal::new(0.0, 1.0).map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;
    Ok(normal.inverse_cdf((1.0 + level) / 2.0))
}
