//! Two-layer feed-forward network with manual backpropagation.
//!
//! All matrices are flat row-major `f64` buffers. A batch of `b` inputs is a
//! `b x n_in` matrix; layer weights are `n_out x n_in`.

use orfeval_core::{OrfevalError, Result};
use serde::{Deserialize, Serialize};

use crate::rng::LcgRng;

// ---------------------------------------------------------------------------
// Linear layer
// ---------------------------------------------------------------------------

/// Fully connected layer `y = W x + b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Linear {
    pub n_in: usize,
    pub n_out: usize,
    /// Row-major `n_out x n_in`.
    pub weight: Vec<f64>,
    pub bias: Vec<f64>,
}

impl Linear {
    /// Weights and biases drawn uniformly from `[-1/sqrt(n_in), 1/sqrt(n_in))`.
    fn init(n_in: usize, n_out: usize, rng: &mut LcgRng) -> Self {
        let bound = 1.0 / (n_in as f64).sqrt();
        let weight = (0..n_in * n_out).map(|_| rng.next_symmetric(bound)).collect();
        let bias = (0..n_out).map(|_| rng.next_symmetric(bound)).collect();
        Self {
            n_in,
            n_out,
            weight,
            bias,
        }
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        let batch = input.len() / self.n_in;
        let mut out = Vec::with_capacity(batch * self.n_out);
        for x in input.chunks_exact(self.n_in) {
            for (w, &b) in self.weight.chunks_exact(self.n_in).zip(&self.bias) {
                out.push(b + w.iter().zip(x).map(|(wi, xi)| wi * xi).sum::<f64>());
            }
        }
        out
    }

    /// Parameter gradients given the layer input and the output gradient.
    fn backward(&self, input: &[f64], grad_out: &[f64]) -> LinearGrad {
        let mut weight = vec![0.0; self.weight.len()];
        let mut bias = vec![0.0; self.n_out];
        for (x, g) in input.chunks_exact(self.n_in).zip(grad_out.chunks_exact(self.n_out)) {
            for (o, &go) in g.iter().enumerate() {
                if go == 0.0 {
                    continue;
                }
                bias[o] += go;
                let row = &mut weight[o * self.n_in..(o + 1) * self.n_in];
                for (w, &xi) in row.iter_mut().zip(x) {
                    *w += go * xi;
                }
            }
        }
        LinearGrad { weight, bias }
    }

    /// Gradient with respect to the layer input.
    fn backward_input(&self, grad_out: &[f64]) -> Vec<f64> {
        let batch = grad_out.len() / self.n_out;
        let mut grad_in = vec![0.0; batch * self.n_in];
        for (gi, g) in grad_in
            .chunks_exact_mut(self.n_in)
            .zip(grad_out.chunks_exact(self.n_out))
        {
            for (w, &go) in self.weight.chunks_exact(self.n_in).zip(g) {
                for (d, &wi) in gi.iter_mut().zip(w) {
                    *d += go * wi;
                }
            }
        }
        grad_in
    }
}

/// Gradients of one [`Linear`] layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearGrad {
    pub weight: Vec<f64>,
    pub bias: Vec<f64>,
}

// ---------------------------------------------------------------------------
// Feed-forward network
// ---------------------------------------------------------------------------

/// `Linear(d0 -> d1) -> ReLU -> Linear(d1 -> d2)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedForward {
    pub hidden: Linear,
    pub output: Linear,
}

/// Intermediate values of a forward pass, kept for [`FeedForward::backward`].
#[derive(Debug, Clone)]
pub struct Activations {
    /// Post-ReLU hidden layer, `batch x d1`.
    pub hidden: Vec<f64>,
    /// Output logits, `batch x d2`.
    pub logits: Vec<f64>,
}

/// Parameter gradients for every layer of a [`FeedForward`].
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    pub hidden: LinearGrad,
    pub output: LinearGrad,
}

impl Gradients {
    /// Gradient buffers in the same order as [`FeedForward::params_mut`].
    pub fn as_slices(&self) -> [&[f64]; 4] {
        [
            &self.hidden.weight,
            &self.hidden.bias,
            &self.output.weight,
            &self.output.bias,
        ]
    }
}

impl FeedForward {
    /// Randomly initialise a network with layer widths `dims`.
    ///
    /// # Errors
    ///
    /// Returns an error if any width is zero.
    pub fn new(dims: [usize; 3], seed: u64) -> Result<Self> {
        if dims.contains(&0) {
            return Err(OrfevalError::InvalidInput(format!(
                "layer widths must be > 0, got {dims:?}"
            )));
        }
        let mut rng = LcgRng::new(seed);
        let hidden = Linear::init(dims[0], dims[1], &mut rng);
        let output = Linear::init(dims[1], dims[2], &mut rng);
        Ok(Self { hidden, output })
    }

    /// Layer widths `[d0, d1, d2]`.
    pub fn dims(&self) -> [usize; 3] {
        [self.hidden.n_in, self.hidden.n_out, self.output.n_out]
    }

    fn check_input(&self, input: &[f64]) -> Result<()> {
        if input.is_empty() || input.len() % self.hidden.n_in != 0 {
            return Err(OrfevalError::InvalidInput(format!(
                "input length {} is not a positive multiple of {}",
                input.len(),
                self.hidden.n_in
            )));
        }
        Ok(())
    }

    /// Output logits for a batch.
    pub fn forward(&self, input: &[f64]) -> Result<Vec<f64>> {
        Ok(self.forward_cached(input)?.logits)
    }

    /// Forward pass that keeps the hidden activations.
    pub fn forward_cached(&self, input: &[f64]) -> Result<Activations> {
        self.check_input(input)?;
        let mut hidden = self.hidden.forward(input);
        hidden.iter_mut().for_each(|h| *h = h.max(0.0));
        let logits = self.output.forward(&hidden);
        Ok(Activations { hidden, logits })
    }

    /// Backpropagate `grad_logits` (the loss gradient with respect to the
    /// logits) through the network.
    pub fn backward(&self, input: &[f64], cache: &Activations, grad_logits: &[f64]) -> Gradients {
        let output = self.output.backward(&cache.hidden, grad_logits);
        let mut grad_hidden = self.output.backward_input(grad_logits);
        for (g, &h) in grad_hidden.iter_mut().zip(&cache.hidden) {
            if h <= 0.0 {
                *g = 0.0;
            }
        }
        let hidden = self.hidden.backward(input, &grad_hidden);
        Gradients { hidden, output }
    }

    /// Parameter buffers in a fixed order for the optimizer.
    pub fn params_mut(&mut self) -> [&mut [f64]; 4] {
        [
            &mut self.hidden.weight,
            &mut self.hidden.bias,
            &mut self.output.weight,
            &mut self.output.bias,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> FeedForward {
        // d0 = 2, d1 = 2, d2 = 1
        FeedForward {
            hidden: Linear {
                n_in: 2,
                n_out: 2,
                weight: vec![1.0, 0.0, 0.0, -1.0],
                bias: vec![0.0, 0.0],
            },
            output: Linear {
                n_in: 2,
                n_out: 1,
                weight: vec![2.0, 3.0],
                bias: vec![0.5],
            },
        }
    }

    #[test]
    fn test_forward_relu() {
        let net = tiny();
        // hidden = relu([1, -2]) = [1, 0]; logit = 2 + 0 + 0.5
        let acts = net.forward_cached(&[1.0, 2.0]).unwrap();
        assert_eq!(acts.hidden, vec![1.0, 0.0]);
        assert_eq!(acts.logits, vec![2.5]);
        assert_eq!(net.forward(&[1.0, 2.0, -1.0, -1.0]).unwrap(), vec![2.5, 3.5]);
    }

    #[test]
    fn test_backward_matches_hand_computation() {
        let net = tiny();
        let x = [1.0, 2.0];
        let acts = net.forward_cached(&x).unwrap();
        let grads = net.backward(&x, &acts, &[1.0]);
        assert_eq!(grads.output.weight, vec![1.0, 0.0]);
        assert_eq!(grads.output.bias, vec![1.0]);
        // Second hidden unit is inactive, so only the first row gets gradient.
        assert_eq!(grads.hidden.weight, vec![2.0, 4.0, 0.0, 0.0]);
        assert_eq!(grads.hidden.bias, vec![2.0, 0.0]);
    }

    #[test]
    fn test_backward_matches_finite_differences() {
        let mut net = FeedForward::new([3, 4, 2], 11).unwrap();
        let x = [0.3, -1.2, 0.8, 1.1, 0.4, -0.5];
        // Loss = sum of logits, so the logit gradient is all ones.
        let acts = net.forward_cached(&x).unwrap();
        let grads = net.backward(&x, &acts, &vec![1.0; acts.logits.len()]);
        let analytic: Vec<Vec<f64>> = grads.as_slices().iter().map(|s| s.to_vec()).collect();

        let h = 1e-6;
        for (p, expected) in analytic.iter().enumerate() {
            for i in 0..expected.len() {
                let orig = net.params_mut()[p][i];
                net.params_mut()[p][i] = orig + h;
                let up: f64 = net.forward(&x).unwrap().iter().sum();
                net.params_mut()[p][i] = orig - h;
                let down: f64 = net.forward(&x).unwrap().iter().sum();
                net.params_mut()[p][i] = orig;
                let numeric = (up - down) / (2.0 * h);
                assert!(
                    (numeric - expected[i]).abs() < 1e-5,
                    "param {p}[{i}]: numeric {numeric} vs analytic {}",
                    expected[i]
                );
            }
        }
    }

    #[test]
    fn test_init_bounds_and_determinism() {
        let a = FeedForward::new([16, 8, 2], 42).unwrap();
        let b = FeedForward::new([16, 8, 2], 42).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.dims(), [16, 8, 2]);
        assert!(a.hidden.weight.iter().all(|w| w.abs() <= 0.25));
        assert!(FeedForward::new([0, 8, 2], 1).is_err());
    }

    #[test]
    fn test_rejects_ragged_input() {
        let net = tiny();
        assert!(net.forward(&[1.0, 2.0, 3.0]).is_err());
        assert!(net.forward(&[]).is_err());
    }
}
