//! Information criteria for model order selection

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Floor applied to residual variance so a perfect fit scores finitely
const MIN_VARIANCE: f64 = 1e-12;

/// Criterion used to rank candidate models (lower is better)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InformationCriterion {
    /// Akaike information criterion
    #[default]
    Aic,
    /// Small-sample corrected AIC
    Aicc,
    /// Bayesian (Schwarz) information criterion
    Bic,
}

/// Scores of one fitted model
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelScores {
    pub log_likelihood: f64,
    pub aic: f64,
    pub aicc: f64,
    pub bic: f64,
}

impl ModelScores {
    /// Gaussian scores from a residual sum of squares.
    ///
    /// `n` is the number of residuals contributing to `sse` and `k` the
    /// number of estimated parameters (the innovation variance included).
    pub fn from_sse(sse: f64, n: usize, k: usize) -> Self {
        let n_f = n.max(1) as f64;
        let k_f = k as f64;
        let sigma2 = (sse / n_f).max(MIN_VARIANCE);
        let log_likelihood = -0.5 * n_f * (1.0 + sigma2.ln() + (2.0 * PI).ln());
        let aic = -2.0 * log_likelihood + 2.0 * k_f;
        let aicc = if n_f - k_f - 1.0 > 0.0 {
            aic + 2.0 * k_f * (k_f + 1.0) / (n_f - k_f - 1.0)
        } else {
            f64::INFINITY
        };
        let bic = -2.0 * log_likelihood + k_f * n_f.ln();
        Self {
            log_likelihood,
            aic,
            aicc,
            bic,
        }
    }

    /// Score under the chosen criterion
    pub fn get(&self, criterion: InformationCriterion) -> f64 {
        match criterion {
            InformationCriterion::Aic => self.aic,
            InformationCriterion::Aicc => self.aicc,
            InformationCriterion::Bic => self.bic,
        }
    }
}
