//! Dense network pieces for small forecasting networks
//!
//! Everything works on plain `f64` slices. Layers do not cache activations;
//! the caller keeps whatever the backward pass needs.

use crate::{MathError, Result};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Fully connected layer `y = W x + b`
#[derive(Debug, Clone)]
pub struct Dense {
    inputs: usize,
    /// Row-major `outputs x inputs`
    weights: Vec<f64>,
    bias: Vec<f64>,
}

/// Accumulated gradients for a [`Dense`] layer
#[derive(Debug, Clone)]
pub struct DenseGrads {
    pub weights: Vec<f64>,
    pub bias: Vec<f64>,
}

impl DenseGrads {
    /// Reset all gradients to zero
    pub fn zero(&mut self) {
        self.weights.iter_mut().for_each(|g| *g = 0.0);
        self.bias.iter_mut().for_each(|g| *g = 0.0);
    }

    /// Multiply all gradients by `factor`
    pub fn scale(&mut self, factor: f64) {
        self.weights.iter_mut().for_each(|g| *g *= factor);
        self.bias.iter_mut().for_each(|g| *g *= factor);
    }
}

impl Dense {
    /// Kaiming-normal initialised layer with zero bias (suited to ReLU)
    pub fn kaiming<R: Rng + ?Sized>(inputs: usize, outputs: usize, rng: &mut R) -> Result<Self> {
        if inputs == 0 || outputs == 0 {
            return Err(MathError::EmptyLayer { inputs, outputs });
        }
        let std = (2.0 / inputs as f64).sqrt();
        let normal =
            Normal::new(0.0, std).map_err(|e| MathError::Distribution(e.to_string()))?;
        let weights = (0..inputs * outputs).map(|_| normal.sample(rng)).collect();
        Self::from_parts(inputs, outputs, weights, vec![0.0; outputs])
    }

    /// Layer built from explicit parameters
    pub fn from_parts(inputs: usize, outputs: usize, weights: Vec<f64>, bias: Vec<f64>) -> Result<Self> {
        if weights.len() != inputs * outputs || bias.len() != outputs {
            return Err(MathError::ShapeMismatch {
                expected_weights: inputs * outputs,
                expected_bias: outputs,
                weights: weights.len(),
                bias: bias.len(),
            });
        }
        Ok(Self {
            inputs,
            weights,
            bias,
        })
    }

    /// Zeroed gradient buffers shaped like this layer
    pub fn zero_grads(&self) -> DenseGrads {
        DenseGrads {
            weights: vec![0.0; self.weights.len()],
            bias: vec![0.0; self.bias.len()],
        }
    }

    pub fn forward(&self, x: &[f64]) -> Vec<f64> {
        self.weights
            .chunks(self.inputs)
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(x).map(|(w, xi)| w * xi).sum::<f64>() + b)
            .collect()
    }

    /// Accumulate parameter gradients into `grads` and return the gradient
    /// with respect to the layer input.
    pub fn backward(&self, x: &[f64], grad_out: &[f64], grads: &mut DenseGrads) -> Vec<f64> {
        let mut grad_in = vec![0.0; self.inputs];
        for (o, &g) in grad_out.iter().enumerate() {
            if g == 0.0 {
                continue;
            }
            grads.bias[o] += g;
            let row = &self.weights[o * self.inputs..(o + 1) * self.inputs];
            let grad_row = &mut grads.weights[o * self.inputs..(o + 1) * self.inputs];
            for i in 0..self.inputs {
                grad_row[i] += g * x[i];
                grad_in[i] += g * row[i];
            }
        }
        grad_in
    }

    /// Mutable parameter slices in a fixed order: weights, then bias
    pub fn parameters_mut(&mut self) -> [&mut [f64]; 2] {
        [self.weights.as_mut_slice(), self.bias.as_mut_slice()]
    }
}

pub fn relu(x: &[f64]) -> Vec<f64> {
    x.iter().map(|v| v.max(0.0)).collect()
}

/// Gradient through ReLU given the pre-activation values
pub fn relu_backward(pre_activation: &[f64], grad: &[f64]) -> Vec<f64> {
    pre_activation
        .iter()
        .zip(grad)
        .map(|(&z, &g)| if z > 0.0 { g } else { 0.0 })
        .collect()
}

/// Non-overlapping max pooling with a partial final window.
///
/// Returns the pooled values and, for each, the input index that won.
pub fn max_pool(x: &[f64], kernel: usize) -> (Vec<f64>, Vec<usize>) {
    let kernel = kernel.max(1);
    let mut pooled = Vec::with_capacity(x.len().div_ceil(kernel));
    let mut winners = Vec::with_capacity(pooled.capacity());
    for (chunk_idx, chunk) in x.chunks(kernel).enumerate() {
        let (offset, value) = chunk
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc });
        pooled.push(value);
        winners.push(chunk_idx * kernel + offset);
    }
    (pooled, winners)
}

/// Route pooled gradients back to the winning inputs
pub fn max_pool_backward(grad: &[f64], winners: &[usize], input_len: usize) -> Vec<f64> {
    let mut grad_in = vec![0.0; input_len];
    for (&g, &idx) in grad.iter().zip(winners) {
        grad_in[idx] += g;
    }
    grad_in
}

/// Adam optimiser with per-slot moment buffers.
///
/// Call [`Adam::begin_step`] once per optimisation step, then
/// [`Adam::update`] for every parameter slice with a stable slot index.
#[derive(Debug, Clone)]
pub struct Adam {
    lr: f64,
    beta1: f64,
    beta2: f64,
    eps: f64,
    t: i32,
    m: Vec<Vec<f64>>,
    v: Vec<Vec<f64>>,
}

impl Adam {
    /// Default moments: beta1 = 0.9, beta2 = 0.999, eps = 1e-8
    pub fn new(lr: f64) -> Self {
        Self {
            lr,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    pub fn begin_step(&mut self) {
        self.t += 1;
    }

    pub fn update(&mut self, slot: usize, params: &mut [f64], grads: &[f64]) {
        if slot >= self.m.len() {
            self.m.resize(slot + 1, Vec::new());
            self.v.resize(slot + 1, Vec::new());
        }
        if self.m[slot].len() != params.len() {
            self.m[slot] = vec![0.0; params.len()];
            self.v[slot] = vec![0.0; params.len()];
        }

        let t = self.t.max(1);
        let bias_correction1 = 1.0 - self.beta1.powi(t);
        let bias_correction2 = 1.0 - self.beta2.powi(t);
        let m = &mut self.m[slot];
        let v = &mut self.v[slot];

        for i in 0..params.len() {
            let g = grads[i];
            m[i] = self.beta1 * m[i] + (1.0 - self.beta1) * g;
            v[i] = self.beta2 * v[i] + (1.0 - self.beta2) * g * g;
            let m_hat = m[i] / bias_correction1;
            let v_hat = v[i] / bias_correction2;
            params[i] -= self.lr * m_hat / (v_hat.sqrt() + self.eps);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn dense_forward_and_backward() {
        let layer = Dense::from_parts(2, 1, vec![2.0, -1.0], vec![0.5]).unwrap();
        let x = [3.0, 4.0];
        assert_eq!(layer.forward(&x), vec![2.5]);

        let mut grads = layer.zero_grads();
        let grad_in = layer.backward(&x, &[1.0], &mut grads);
        assert_eq!(grad_in, vec![2.0, -1.0]);
        assert_eq!(grads.weights, vec![3.0, 4.0]);
        assert_eq!(grads.bias, vec![1.0]);
    }

    #[test]
    fn from_parts_checks_shapes() {
        let err = Dense::from_parts(2, 2, vec![1.0; 3], vec![0.0; 2]).unwrap_err();
        assert_eq!(
            err,
            MathError::ShapeMismatch {
                expected_weights: 4,
                expected_bias: 2,
                weights: 3,
                bias: 2,
            }
        );
    }

    #[test]
    fn kaiming_rejects_empty_layers() {
        let err = Dense::kaiming(0, 4, &mut StdRng::seed_from_u64(1)).unwrap_err();
        assert_eq!(err, MathError::EmptyLayer { inputs: 0, outputs: 4 });
    }

    #[test]
    fn kaiming_is_seed_deterministic() {
        let a = Dense::kaiming(8, 4, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = Dense::kaiming(8, 4, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a.forward(&[1.0; 8]), b.forward(&[1.0; 8]));
    }

    #[test]
    fn max_pool_tracks_winners() {
        let (pooled, winners) = max_pool(&[1.0, 3.0, 2.0, 0.0, 5.0], 2);
        assert_eq!(pooled, vec![3.0, 2.0, 5.0]);
        assert_eq!(winners, vec![1, 2, 4]);

        let grad = max_pool_backward(&[1.0, 2.0, 3.0], &winners, 5);
        assert_eq!(grad, vec![0.0, 1.0, 2.0, 0.0, 3.0]);
    }

    #[test]
    fn relu_gradient_masks_negative_inputs() {
        assert_eq!(relu(&[-1.0, 2.0]), vec![0.0, 2.0]);
        assert_eq!(relu_backward(&[-1.0, 2.0], &[5.0, 5.0]), vec![0.0, 5.0]);
    }

    #[test]
    fn adam_descends_quadratic() {
        let mut adam = Adam::new(0.1);
        let mut x = vec![5.0];
        for _ in 0..500 {
            let grad = vec![2.0 * (x[0] - 1.0)];
            adam.begin_step();
            adam.update(0, &mut x, &grad);
        }
        assert_relative_eq!(x[0], 1.0, epsilon = 5e-2);
    }
}
