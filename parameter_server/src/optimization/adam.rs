use std::sync::atomic::{AtomicU64, Ordering};

use super::Optimizer;
use crate::storage::{Result, SizeMismatchErr, WildBuf};

/// Adam whose moment estimates and step counter are shared by every worker.
///
/// No lock guards an update: two workers stepping at once interleave their reads and writes of
/// the moments and parameters, and may bias-correct with the same step index.
#[derive(Debug)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    steps: AtomicU64,
    v: WildBuf,
    s: WildBuf,
}

impl Adam {
    pub const BETA1: f32 = 0.9;
    pub const BETA2: f32 = 0.999;
    pub const EPSILON: f32 = 1e-8;

    /// Creates a new `Adam` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `beta1`, `beta2`, `epsilon` - Hyperparameters to the optimization algorithm.
    ///
    /// # Returns
    /// A new `Adam` instance.
    pub fn new(len: usize, learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            steps: AtomicU64::new(0),
            v: WildBuf::zeros(len),
            s: WildBuf::zeros(len),
        }
    }

    /// Creates a new `Adam` optimizer with the usual betas and epsilon.
    pub fn with_lr(len: usize, learning_rate: f32) -> Self {
        Self::new(len, learning_rate, Self::BETA1, Self::BETA2, Self::EPSILON)
    }

    /// The amount of updates applied so far.
    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::Relaxed)
    }

    /// The first moment estimate.
    pub fn first_moment(&self) -> &WildBuf {
        &self.v
    }

    /// The second moment estimate.
    pub fn second_moment(&self) -> &WildBuf {
        &self.s
    }
}

impl Optimizer for Adam {
    fn update_params(&self, grad: &WildBuf, params: &WildBuf) -> Result<()> {
        SizeMismatchErr::check(grad.len(), params.len())?;
        SizeMismatchErr::check(params.len(), self.v.len())?;

        let Self {
            learning_rate: lr,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            ..
        } = *self;

        // The bias correction uses the step count including this step, so the first step has
        // t = 1. Concurrent callers may read the same moments but never the same t.
        let t = self.steps.fetch_add(1, Ordering::Relaxed) + 1;
        let bc1 = 1. - b1.powf(t as f32);
        let bc2 = 1. - b2.powf(t as f32);
        let step_size = lr * (bc2.sqrt() / bc1);

        for i in 0..params.len() {
            let g = grad.get(i);
            let v = b1 * self.v.get(i) + (1. - b1) * g;
            let s = b2 * self.s.get(i) + (1. - b2) * g * g;
            self.v.set(i, v);
            self.s.set(i, s);
            params.set(i, params.get(i) - step_size * v / (s.sqrt() + eps));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_grads_keep_params() {
        let adam = Adam::with_lr(3, 0.1);
        let params = WildBuf::new(&[1., -2., 0.5]);
        let grad = WildBuf::zeros(3);

        adam.update_params(&grad, &params).unwrap();
        adam.update_params(&grad, &params).unwrap();

        assert_eq!(params.to_vec(), [1., -2., 0.5]);
        assert_eq!(adam.steps(), 2);
    }

    #[test]
    fn first_step_moves_by_learning_rate() {
        let adam = Adam::with_lr(2, 0.01);
        let params = WildBuf::new(&[1., 1.]);
        let grad = WildBuf::new(&[3., -0.2]);

        adam.update_params(&grad, &params).unwrap();

        // The bias corrected first step is lr * g / |g|.
        let p = params.to_vec();
        assert!((p[0] - 0.99).abs() < 1e-5);
        assert!((p[1] - 1.01).abs() < 1e-5);
        assert!((adam.first_moment().get(0) - 0.3).abs() < 1e-6);
        assert!((adam.second_moment().get(0) - 0.009).abs() < 1e-6);
    }

    #[test]
    fn zero_learning_rate_freezes() {
        let adam = Adam::with_lr(1, 0.);
        let params = WildBuf::new(&[4.]);
        adam.update_params(&WildBuf::new(&[1.]), &params).unwrap();

        assert_eq!(params.to_vec(), [4.]);
        assert_eq!(adam.steps(), 1);
    }

    #[test]
    fn rejects_mismatched_grads() {
        let adam = Adam::with_lr(2, 0.1);
        let params = WildBuf::zeros(2);
        assert!(adam.update_params(&WildBuf::zeros(3), &params).is_err());
        assert_eq!(adam.steps(), 0);
    }
}
