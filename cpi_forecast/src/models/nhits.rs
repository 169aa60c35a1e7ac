//! N-HiTS neural forecaster
//!
//! A stack of MLP blocks, each looking at a max-pooled view of the lookback
//! window. Every block emits a backcast, subtracted from the input seen by
//! the next block, and a low-resolution set of forecast coefficients that
//! is linearly interpolated up to the horizon. Block forecasts are summed.
//! The whole horizon is predicted in one pass.

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, Prediction, TrainedForecastModel};
use forecast_math::interpolation::{interpolate, linear_weights};
use forecast_math::neural::{
    max_pool, max_pool_backward, relu, relu_backward, Adam, Dense, DenseGrads,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Network shape and training schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NHitsConfig {
    /// Lookback window in months
    pub input_size: usize,
    /// Max-pool kernel per stack
    pub pool_kernel_sizes: Vec<usize>,
    /// Forecast coefficient downsampling per stack
    pub downsample_factors: Vec<usize>,
    /// Width of the two hidden layers in every block
    pub hidden_size: usize,
    pub max_steps: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Seed for weight initialisation and batch sampling
    pub seed: u64,
}

impl Default for NHitsConfig {
    fn default() -> Self {
        Self {
            input_size: 24,
            pool_kernel_sizes: vec![2, 2, 1],
            downsample_factors: vec![4, 2, 1],
            hidden_size: 32,
            max_steps: 300,
            batch_size: 16,
            learning_rate: 1e-3,
            seed: 1,
        }
    }
}

impl NHitsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.input_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "N-HiTS input size must be positive".to_string(),
            ));
        }
        if self.pool_kernel_sizes.is_empty()
            || self.pool_kernel_sizes.len() != self.downsample_factors.len()
        {
            return Err(ForecastError::InvalidParameter(
                "N-HiTS needs one pool kernel and one downsample factor per stack".to_string(),
            ));
        }
        if self.pool_kernel_sizes.iter().chain(&self.downsample_factors).any(|&k| k == 0) {
            return Err(ForecastError::InvalidParameter(
                "N-HiTS kernels and downsample factors must be positive".to_string(),
            ));
        }
        if self.hidden_size == 0 || self.batch_size == 0 || self.max_steps == 0 {
            return Err(ForecastError::InvalidParameter(
                "N-HiTS hidden size, batch size and step count must be positive".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0) {
            return Err(ForecastError::InvalidParameter(
                "N-HiTS learning rate must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Untrained N-HiTS specification
#[derive(Debug, Clone)]
pub struct NHits {
    name: String,
    config: NHitsConfig,
}

/// Trained network for one horizon
#[derive(Debug, Clone)]
pub struct TrainedNHits {
    name: String,
    horizon: usize,
    network: Network,
    /// Standardisation applied to inputs and undone on outputs
    mean: f64,
    scale: f64,
    /// Last `input_size` observations, standardised
    last_window: Vec<f64>,
    /// Mean batch loss per training step
    losses: Vec<f64>,
}

#[derive(Debug, Clone)]
struct Block {
    pool_kernel: usize,
    layers: [Dense; 3],
    /// `horizon x n_theta` interpolation weights
    interpolation: Vec<Vec<f64>>,
}

/// Activations kept from a block's forward pass
struct BlockTrace {
    input: Vec<f64>,
    pooled: Vec<f64>,
    winners: Vec<usize>,
    pre1: Vec<f64>,
    act1: Vec<f64>,
    pre2: Vec<f64>,
    act2: Vec<f64>,
}

#[derive(Debug, Clone)]
struct Network {
    input_size: usize,
    blocks: Vec<Block>,
}

impl NHits {
    pub fn new(config: NHitsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            name: "NHITS".to_string(),
            config,
        })
    }

    pub fn config(&self) -> &NHitsConfig {
        &self.config
    }
}

impl Default for NHits {
    fn default() -> Self {
        Self {
            name: "NHITS".to_string(),
            config: NHitsConfig::default(),
        }
    }
}

impl ForecastModel for NHits {
    type Trained = TrainedNHits;

    fn train(&self, data: &TimeSeries, horizon: usize) -> Result<TrainedNHits> {
        let config = &self.config;
        let needed = self.min_history(horizon);
        if data.len() < needed {
            return Err(ForecastError::InsufficientHistory {
                model: self.name.clone(),
                needed,
                got: data.len(),
            });
        }

        let values = data.values();
        let mean = forecast_math::mean(values).unwrap_or(0.0);
        let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64).sqrt();
        let scale = if std > 1e-12 { std } else { 1.0 };
        let scaled: Vec<f64> = values.iter().map(|v| (v - mean) / scale).collect();

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut network = Network::new(config, horizon, &mut rng)?;
        let mut adam = Adam::new(config.learning_rate);

        let l = config.input_size;
        // Left-pad with l - 1 months at the standardised mean (zero) so that
        // every month after the first is a target, even when the history is
        // exactly one lookback long.
        let mut padded = vec![0.0; l - 1];
        padded.extend_from_slice(&scaled);
        let window_count = padded.len() - l;
        let mut grads = network.zero_grads();
        let mut losses = Vec::with_capacity(config.max_steps);

        for _ in 0..config.max_steps {
            grads.iter_mut().flatten().for_each(DenseGrads::zero);
            let mut batch_loss = 0.0;

            for _ in 0..config.batch_size {
                let start = rng.gen_range(0..window_count);
                let input = &padded[start..start + l];
                let end = (start + l + horizon).min(padded.len());
                let targets = &padded[start + l..end];

                let (forecast, traces) = network.forward(input);
                let observed = targets.len() as f64;
                let mut grad_forecast = vec![0.0; horizon];
                for (i, (pred, target)) in forecast.iter().zip(targets).enumerate() {
                    let error = pred - target;
                    batch_loss += error.abs() / observed;
                    grad_forecast[i] = error.signum() / observed;
                }
                network.backward(&traces, &grad_forecast, &mut grads);
            }

            let batch = config.batch_size as f64;
            grads.iter_mut().flatten().for_each(|g| g.scale(1.0 / batch));
            network.apply(&mut adam, &grads);
            losses.push(batch_loss / batch);
        }

        debug!(
            horizon,
            windows = window_count,
            first_loss = losses.first().copied().unwrap_or(f64::NAN),
            final_loss = losses.last().copied().unwrap_or(f64::NAN),
            "trained N-HiTS"
        );

        Ok(TrainedNHits {
            name: self.name.clone(),
            horizon,
            network,
            mean,
            scale,
            last_window: scaled[scaled.len() - l..].to_vec(),
            losses,
        })
    }

    /// One full lookback window; at least two months so there is a target
    fn min_history(&self, _horizon: usize) -> usize {
        self.config.input_size.max(2)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedNHits {
    /// Horizon the network was trained for
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Mean absolute training loss per step, on the standardised scale
    pub fn losses(&self) -> &[f64] {
        &self.losses
    }
}

impl TrainedForecastModel for TrainedNHits {
    fn forecast(&self, horizon: usize) -> Result<Prediction> {
        if horizon != self.horizon {
            return Err(ForecastError::InvalidParameter(format!(
                "Network was trained for a {}-month horizon, not {}",
                self.horizon, horizon
            )));
        }
        let (forecast, _) = self.network.forward(&self.last_window);
        let values = forecast
            .into_iter()
            .map(|v| v * self.scale + self.mean)
            .collect();
        Ok(Prediction::new(values))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Block {
    fn new<R: Rng>(
        input_size: usize,
        hidden: usize,
        pool_kernel: usize,
        downsample: usize,
        horizon: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let pooled = (input_size + pool_kernel - 1) / pool_kernel;
        let n_theta = (horizon / downsample).max(1);
        let layers = [
            Dense::kaiming(pooled, hidden, rng)?,
            Dense::kaiming(hidden, hidden, rng)?,
            Dense::kaiming(hidden, input_size + n_theta, rng)?,
        ];
        Ok(Self {
            pool_kernel,
            layers,
            interpolation: linear_weights(n_theta, horizon),
        })
    }

    /// Returns (backcast, forecast, trace)
    fn forward(&self, input: &[f64]) -> (Vec<f64>, Vec<f64>, BlockTrace) {
        let (pooled, winners) = max_pool(input, self.pool_kernel);
        let pre1 = self.layers[0].forward(&pooled);
        let act1 = relu(&pre1);
        let pre2 = self.layers[1].forward(&act1);
        let act2 = relu(&pre2);
        let theta = self.layers[2].forward(&act2);

        let (backcast, coefficients) = theta.split_at(input.len());
        let forecast = interpolate(&self.interpolation, coefficients);
        let trace = BlockTrace {
            input: input.to_vec(),
            pooled,
            winners,
            pre1,
            act1,
            pre2,
            act2,
        };
        (backcast.to_vec(), forecast, trace)
    }

    /// Accumulate parameter gradients; returns the gradient on the block input
    fn backward(
        &self,
        trace: &BlockTrace,
        grad_backcast: &[f64],
        grad_forecast: &[f64],
        grads: &mut [DenseGrads; 3],
    ) -> Vec<f64> {
        let n_theta = self.interpolation.first().map_or(0, |row| row.len());
        let mut grad_theta = grad_backcast.to_vec();
        grad_theta.extend((0..n_theta).map(|j| {
            self.interpolation
                .iter()
                .zip(grad_forecast)
                .map(|(row, g)| row[j] * g)
                .sum::<f64>()
        }));

        let grad_act2 = self.layers[2].backward(&trace.act2, &grad_theta, &mut grads[2]);
        let grad_pre2 = relu_backward(&trace.pre2, &grad_act2);
        let grad_act1 = self.layers[1].backward(&trace.act1, &grad_pre2, &mut grads[1]);
        let grad_pre1 = relu_backward(&trace.pre1, &grad_act1);
        let grad_pooled = self.layers[0].backward(&trace.pooled, &grad_pre1, &mut grads[0]);
        max_pool_backward(&grad_pooled, &trace.winners, trace.input.len())
    }
}

impl Network {
    fn new<R: Rng>(config: &NHitsConfig, horizon: usize, rng: &mut R) -> Result<Self> {
        let blocks = config
            .pool_kernel_sizes
            .iter()
            .zip(&config.downsample_factors)
            .map(|(&kernel, &factor)| {
                Block::new(config.input_size, config.hidden_size, kernel, factor, horizon, &mut *rng)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            input_size: config.input_size,
            blocks,
        })
    }

    fn zero_grads(&self) -> Vec<[DenseGrads; 3]> {
        self.blocks
            .iter()
            .map(|b| {
                [
                    b.layers[0].zero_grads(),
                    b.layers[1].zero_grads(),
                    b.layers[2].zero_grads(),
                ]
            })
            .collect()
    }

    fn forward(&self, input: &[f64]) -> (Vec<f64>, Vec<BlockTrace>) {
        let mut residual = input.to_vec();
        let mut forecast: Vec<f64> = Vec::new();
        let mut traces = Vec::with_capacity(self.blocks.len());

        for block in &self.blocks {
            let (backcast, block_forecast, trace) = block.forward(&residual);
            residual
                .iter_mut()
                .zip(&backcast)
                .for_each(|(r, b)| *r -= b);
            if forecast.is_empty() {
                forecast = block_forecast;
            } else {
                forecast
                    .iter_mut()
                    .zip(&block_forecast)
                    .for_each(|(f, b)| *f += b);
            }
            traces.push(trace);
        }
        (forecast, traces)
    }

    fn backward(&self, traces: &[BlockTrace], grad_forecast: &[f64], grads: &mut [[DenseGrads; 3]]) {
        // Gradient on the residual leaving the current block
        let mut grad_residual = vec![0.0; self.input_size];
        for (b, block) in self.blocks.iter().enumerate().rev() {
            let grad_backcast: Vec<f64> = grad_residual.iter().map(|g| -g).collect();
            let grad_input = block.backward(&traces[b], &grad_backcast, grad_forecast, &mut grads[b]);
            grad_residual
                .iter_mut()
                .zip(&grad_input)
                .for_each(|(g, d)| *g += d);
        }
    }

    fn apply(&mut self, adam: &mut Adam, grads: &[[DenseGrads; 3]]) {
        adam.begin_step();
        for (b, block) in self.blocks.iter_mut().enumerate() {
            for (l, layer) in block.layers.iter_mut().enumerate() {
                let slot = (b * 3 + l) * 2;
                let [weights, bias] = layer.parameters_mut();
                adam.update(slot, weights, &grads[b][l].weights);
                adam.update(slot + 1, bias, &grads[b][l].bias);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Forecaster;
    use chrono::{Months, NaiveDate};

    fn monthly(values: &[f64]) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2012, 1, 1).unwrap();
        TimeSeries::new(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| (start + Months::new(i as u32), v))
                .collect(),
        )
        .unwrap()
    }

    fn trend(n: usize) -> Vec<f64> {
        (0..n).map(|i| 230.0 + 0.5 * i as f64 + (i as f64 * 0.5).sin()).collect()
    }

    fn quick_config(seed: u64) -> NHitsConfig {
        NHitsConfig {
            hidden_size: 16,
            max_steps: 60,
            batch_size: 8,
            seed,
            ..Default::default()
        }
    }

    #[test]
    fn forecasts_full_horizon_in_one_pass() {
        let history = monthly(&trend(60));
        let model = NHits::new(quick_config(1)).unwrap();
        let result = model.forecast(&history, 12).unwrap();
        assert_eq!(result.horizon(), 12);
        assert!(result.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn same_seed_same_forecast() {
        let history = monthly(&trend(48));
        let a = NHits::new(quick_config(7)).unwrap().forecast(&history, 3).unwrap();
        let b = NHits::new(quick_config(7)).unwrap().forecast(&history, 3).unwrap();
        assert_eq!(a.values(), b.values());

        let c = NHits::new(quick_config(8)).unwrap().forecast(&history, 3).unwrap();
        assert_ne!(a.values(), c.values());
    }

    #[test]
    fn requires_one_full_lookback_window() {
        let history = monthly(&trend(23));
        let err = NHits::default().forecast(&history, 3).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InsufficientHistory { needed: 24, got: 23, .. }
        ));
    }

    #[test]
    fn forecasts_from_exactly_one_lookback_window() {
        let history = monthly(&trend(24));
        let result = NHits::new(quick_config(3)).unwrap().forecast(&history, 3).unwrap();
        assert_eq!(result.horizon(), 3);
        assert!(result.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn accepts_minimum_history_with_partial_targets() {
        let history = monthly(&trend(25));
        let result = NHits::new(quick_config(3)).unwrap().forecast(&history, 12).unwrap();
        assert_eq!(result.horizon(), 12);
    }

    #[test]
    fn tiny_lookback_still_needs_a_target_month() {
        let config = NHitsConfig {
            input_size: 1,
            ..quick_config(4)
        };
        let model = NHits::new(config).unwrap();
        assert_eq!(model.min_history(3), 2);
        let result = model.forecast(&monthly(&trend(2)), 3).unwrap();
        assert_eq!(result.horizon(), 3);
    }

    #[test]
    fn training_reduces_loss() {
        let history = monthly(&trend(72));
        let config = NHitsConfig {
            max_steps: 200,
            ..quick_config(5)
        };
        let trained = NHits::new(config).unwrap().train(&history, 3).unwrap();
        let losses = trained.losses();
        let early: f64 = losses[..10].iter().sum::<f64>() / 10.0;
        let late: f64 = losses[losses.len() - 10..].iter().sum::<f64>() / 10.0;
        assert!(late < early, "late loss {} not below early loss {}", late, early);
    }

    #[test]
    fn trained_network_is_tied_to_its_horizon() {
        let history = monthly(&trend(40));
        let trained = NHits::new(quick_config(2)).unwrap().train(&history, 3).unwrap();
        assert_eq!(trained.horizon(), 3);
        assert!(trained.forecast(3).is_ok());
        assert!(trained.forecast(4).is_err());
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let config = NHitsConfig {
            input_size: 6,
            pool_kernel_sizes: vec![2, 1],
            downsample_factors: vec![2, 1],
            hidden_size: 5,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(11);
        let mut network = Network::new(&config, 4, &mut rng).unwrap();
        let input = [0.3, -0.2, 0.5, 0.1, -0.4, 0.2];
        let weights = [1.0, -0.5, 0.25, 2.0];

        // Loss = weights . forecast, so dL/dforecast = weights
        let (_, traces) = network.forward(&input);
        let mut grads = network.zero_grads();
        network.backward(&traces, &weights, &mut grads);

        let loss = |net: &Network| -> f64 {
            let (f, _) = net.forward(&input);
            f.iter().zip(&weights).map(|(a, b)| a * b).sum()
        };
        let eps = 1e-6;
        for (b, l) in [(0, 0), (0, 2), (1, 1)] {
            let analytic = grads[b][l].bias[0];
            let base = loss(&network);
            network.blocks[b].layers[l].parameters_mut()[1][0] += eps;
            let bumped = loss(&network);
            network.blocks[b].layers[l].parameters_mut()[1][0] -= eps;
            let numeric = (bumped - base) / eps;
            assert!(
                (analytic - numeric).abs() < 1e-4,
                "block {} layer {}: analytic {} numeric {}",
                b,
                l,
                analytic,
                numeric
            );
        }
    }
}
