//! Adam optimizer.

use orfeval_core::{OrfevalError, Result};
use serde::{Deserialize, Serialize};

/// Adam with bias-corrected first and second moment estimates.
///
/// Moment buffers are allocated on the first [`Adam::step`] to match the
/// parameter groups passed in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adam {
    pub lr: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
    t: u64,
    m: Vec<Vec<f64>>,
    v: Vec<Vec<f64>>,
}

impl Adam {
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

    /// Number of steps taken.
    pub fn steps(&self) -> u64 {
        self.t
    }

    /// Update every parameter group in place from its gradient.
    ///
    /// # Errors
    ///
    /// Returns an error if the groups do not match the gradients, or differ
    /// from the groups seen on earlier steps.
    pub fn step(&mut self, params: &mut [&mut [f64]], grads: &[&[f64]]) -> Result<()> {
        if params.len() != grads.len()
            || params.iter().zip(grads).any(|(p, g)| p.len() != g.len())
        {
            return Err(OrfevalError::InvalidInput(
                "parameter and gradient shapes differ".into(),
            ));
        }
        if self.m.is_empty() {
            self.m = grads.iter().map(|g| vec![0.0; g.len()]).collect();
            self.v = self.m.clone();
        } else if self.m.len() != grads.len()
            || self.m.iter().zip(grads).any(|(m, g)| m.len() != g.len())
        {
            return Err(OrfevalError::InvalidInput(
                "parameter groups changed between steps".into(),
            ));
        }

        self.t += 1;
        // Past i32::MAX both corrections are 1.0 to machine precision.
        let t = i32::try_from(self.t).unwrap_or(i32::MAX);
        let bc1 = 1.0 - self.beta1.powi(t);
        let bc2 = 1.0 - self.beta2.powi(t);

        for (((param, grad), m), v) in params
            .iter_mut()
            .zip(grads)
            .zip(&mut self.m)
            .zip(&mut self.v)
        {
            for (((p, &g), mi), vi) in param.iter_mut().zip(grad.iter()).zip(m).zip(v) {
                *mi = self.beta1 * *mi + (1.0 - self.beta1) * g;
                *vi = self.beta2 * *vi + (1.0 - self.beta2) * g * g;
                let m_hat = *mi / bc1;
                let v_hat = *vi / bc2;
                *p -= self.lr * m_hat / (v_hat.sqrt() + self.eps);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_step_moves_by_lr() {
        // With bias correction the first step is lr * sign(g).
        let mut opt = Adam::new(0.1);
        let mut w = vec![1.0, -1.0];
        let g = vec![2.0, -0.5];
        opt.step(&mut [w.as_mut_slice()], &[g.as_slice()]).unwrap();
        assert!((w[0] - 0.9).abs() < 1e-6);
        assert!((w[1] + 0.9).abs() < 1e-6);
        assert_eq!(opt.steps(), 1);
    }

    #[test]
    fn test_step_count_beyond_i32() {
        // Once both corrections saturate, a fresh moment estimate gives
        // lr * 0.1 / sqrt(0.001) per step.
        let mut opt = Adam::new(0.1);
        opt.t = u64::from(u32::MAX) + 5;
        let mut w = vec![0.0];
        let g = vec![1.0];
        opt.step(&mut [w.as_mut_slice()], &[g.as_slice()]).unwrap();
        let expected = -0.1 * 0.1 / 0.001f64.sqrt();
        assert!((w[0] - expected).abs() < 1e-6, "w = {}", w[0]);
        assert_eq!(opt.steps(), u64::from(u32::MAX) + 6);
    }

    #[test]
    fn test_minimizes_quadratic() {
        let mut opt = Adam::new(0.05);
        let mut x = vec![5.0];
        for _ in 0..1000 {
            let g = vec![2.0 * (x[0] - 3.0)];
            opt.step(&mut [x.as_mut_slice()], &[g.as_slice()]).unwrap();
        }
        assert!((x[0] - 3.0).abs() < 5e-2);
    }

    #[test]
    fn test_shape_mismatch() {
        let mut opt = Adam::new(0.1);
        let mut w = vec![0.0; 2];
        let (g1, g2, g3) = (vec![1.0], vec![1.0; 2], vec![1.0; 3]);
        assert!(opt.step(&mut [w.as_mut_slice()], &[g1.as_slice()]).is_err());
        opt.step(&mut [w.as_mut_slice()], &[g2.as_slice()]).unwrap();
        let mut other = vec![0.0; 3];
        assert!(opt.step(&mut [other.as_mut_slice()], &[g3.as_slice()]).is_err());
    }
}
