//! Automatic (p, d, q) selection for non-seasonal ARIMA

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::arima::{fit_arima, ArimaOrder, TrainedArimaModel};
use crate::models::{ForecastModel, Prediction, TrainedForecastModel};
use forecast_math::criteria::InformationCriterion;
use forecast_math::differencing::suggest_differencing;
use forecast_math::optimization::NelderMeadConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Search bounds and selection criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoArimaConfig {
    pub max_p: usize,
    pub max_d: usize,
    pub max_q: usize,
    pub criterion: InformationCriterion,
    pub confidence_level: f64,
}

impl Default for AutoArimaConfig {
    fn default() -> Self {
        Self {
            max_p: 3,
            max_d: 2,
            max_q: 3,
            criterion: InformationCriterion::Aic,
            confidence_level: 0.95,
        }
    }
}

/// ARIMA with the order chosen per history by information criterion.
///
/// The differencing order comes from a variance-ratio test; every (p, q)
/// within bounds is then fitted and the lowest score wins. Candidates are
/// visited simplest first and only a strictly lower score replaces the
/// incumbent, so ties keep the simpler model. When AICc is undefined for
/// every converged candidate, AIC ranks them instead. When no candidate
/// converges training fails; there is no fallback model.
#[derive(Debug, Clone)]
pub struct AutoArima {
    name: String,
    config: AutoArimaConfig,
    optimizer: NelderMeadConfig,
}

/// Outcome of fitting one candidate order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateScore {
    pub order: ArimaOrder,
    /// `None` when the candidate could not be fitted
    pub score: Option<f64>,
}

/// The selected ARIMA together with the search record
#[derive(Debug, Clone)]
pub struct TrainedAutoArima {
    name: String,
    selected: TrainedArimaModel,
    criterion: InformationCriterion,
    candidates: Vec<CandidateScore>,
}

impl AutoArima {
    pub fn new(config: AutoArimaConfig) -> Result<Self> {
        if config.confidence_level <= 0.0 || config.confidence_level >= 1.0 {
            return Err(ForecastError::InvalidParameter(
                "Confidence level must be between 0 and 1".to_string(),
            ));
        }
        Ok(Self {
            name: "AutoARIMA".to_string(),
            config,
            optimizer: NelderMeadConfig::default(),
        })
    }

    /// Replace the optimizer settings used for every candidate
    pub fn with_optimizer(mut self, optimizer: NelderMeadConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn config(&self) -> &AutoArimaConfig {
        &self.config
    }

    /// Candidate orders for differencing order `d`, in visiting order
    pub fn candidates(&self, d: usize) -> Vec<ArimaOrder> {
        let mut orders: Vec<ArimaOrder> = (0..=self.config.max_p)
            .flat_map(|p| (0..=self.config.max_q).map(move |q| ArimaOrder::new(p, d, q)))
            .collect();
        orders.sort_by_key(|o| (o.p + o.q, o.p));
        orders
    }
}

impl Default for AutoArima {
    fn default() -> Self {
        Self {
            name: "AutoARIMA".to_string(),
            config: AutoArimaConfig::default(),
            optimizer: NelderMeadConfig::default(),
        }
    }
}

impl ForecastModel for AutoArima {
    type Trained = TrainedAutoArima;

    fn train(&self, data: &TimeSeries, _horizon: usize) -> Result<TrainedAutoArima> {
        let values = data.values();
        // Keep at least two differenced observations
        let max_d = self.config.max_d.min(values.len().saturating_sub(2));
        let d = suggest_differencing(values, max_d);
        let include_constant = d < 2;
        debug!(d, include_constant, "selected differencing order");

        let fits = self.candidates(d).into_iter().map(|order| {
            let fit = fit_arima(
                values,
                order,
                include_constant,
                self.config.confidence_level,
                &self.optimizer,
            );
            (order, fit)
        });
        let Selection {
            score,
            selected,
            criterion,
            candidates,
        } = select_best(fits, self.config.criterion, d)?;

        debug!(order = %selected.order(), score, ?criterion, "selected ARIMA order");
        Ok(TrainedAutoArima {
            name: format!("AutoARIMA[{}]", selected.order()),
            selected,
            criterion,
            candidates,
        })
    }

    fn min_history(&self, _horizon: usize) -> usize {
        3
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Candidates ranked under one criterion
#[derive(Debug)]
struct Selection {
    score: f64,
    selected: TrainedArimaModel,
    criterion: InformationCriterion,
    candidates: Vec<CandidateScore>,
}

/// Keep the first candidate with the strictly lowest finite score.
///
/// AICc is undefined (infinite) when a candidate has too few residuals for
/// its parameter count. If that holds for every converged candidate the
/// ranking falls back to AIC.
fn select_best(
    fits: impl IntoIterator<Item = (ArimaOrder, Result<TrainedArimaModel>)>,
    criterion: InformationCriterion,
    d: usize,
) -> Result<Selection> {
    let fits: Vec<(ArimaOrder, Option<TrainedArimaModel>)> = fits
        .into_iter()
        .map(|(order, fit)| match fit {
            Ok(fitted) => (order, Some(fitted)),
            Err(err) => {
                warn!(%order, error = %err, "skipping ARIMA candidate");
                (order, None)
            }
        })
        .collect();

    if fits.iter().all(|(_, fit)| fit.is_none()) {
        return Err(ForecastError::ModelFit(format!(
            "No ARIMA candidate with d={} converged ({} tried)",
            d,
            fits.len()
        )));
    }

    let defined = fits
        .iter()
        .filter_map(|(_, fit)| fit.as_ref())
        .any(|fit| fit.scores().get(criterion).is_finite());
    let criterion = if defined {
        criterion
    } else {
        warn!(
            ?criterion,
            "no candidate has a finite score, ranking by AIC instead"
        );
        InformationCriterion::Aic
    };

    let mut best: Option<(f64, &TrainedArimaModel)> = None;
    let mut candidates = Vec::with_capacity(fits.len());
    for (order, fit) in &fits {
        let score = fit.as_ref().map(|fitted| fitted.scores().get(criterion));
        candidates.push(CandidateScore {
            order: *order,
            score,
        });
        if let (Some(fitted), Some(score)) = (fit, score) {
            let improves = score.is_finite()
                && best.map_or(true, |(incumbent, _)| score < incumbent);
            if improves {
                best = Some((score, fitted));
            }
        }
    }

    match best {
        Some((score, selected)) => Ok(Selection {
            score,
            selected: selected.clone(),
            criterion,
            candidates,
        }),
        None => Err(ForecastError::ModelFit(format!(
            "No converged ARIMA candidate with d={} has a finite {:?} score",
            d, criterion
        ))),
    }
}

impl TrainedAutoArima {
    /// Order of the winning model
    pub fn selected_order(&self) -> ArimaOrder {
        self.selected.order()
    }

    pub fn selected(&self) -> &TrainedArimaModel {
        &self.selected
    }

    /// Criterion the candidate scores were ranked by
    pub fn criterion(&self) -> InformationCriterion {
        self.criterion
    }

    /// Every candidate tried, in visiting order
    pub fn candidates(&self) -> &[CandidateScore] {
        &self.candidates
    }
}

impl TrainedForecastModel for TrainedAutoArima {
    fn forecast(&self, horizon: usize) -> Result<Prediction> {
        self.selected.forecast(horizon)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
