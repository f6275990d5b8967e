use ndarray::{Array1, ArrayView1};
use rand::Rng;

/// A categorical distribution over the actions, parameterized by the policy head's logits.
#[derive(Debug, Clone)]
pub struct Categorical {
    log_probs: Array1<f32>,
}

impl Categorical {
    /// Creates a new `Categorical` distribution from unnormalized logits.
    ///
    /// # Arguments
    /// * `logits` - The policy head's output.
    ///
    /// # Returns
    /// A new `Categorical` instance.
    pub fn from_logits(logits: ArrayView1<f32>) -> Self {
        let max = logits.fold(f32::NEG_INFINITY, |m, &l| m.max(l));
        let log_sum = logits.mapv(|l| (l - max).exp()).sum().ln() + max;

        Self {
            log_probs: logits.mapv(|l| l - log_sum),
        }
    }

    /// The log-softmax of the logits.
    pub fn log_probs(&self) -> ArrayView1<'_, f32> {
        self.log_probs.view()
    }

    pub fn probs(&self) -> Array1<f32> {
        self.log_probs.mapv(f32::exp)
    }

    /// Draws an action proportionally to its probability.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> usize {
        let u: f32 = rng.random();
        let mut acc = 0.;

        for (action, lp) in self.log_probs.iter().enumerate() {
            acc += lp.exp();
            if u < acc {
                return action;
            }
        }

        // Rounding may leave the cumulative sum slightly under 1.
        self.log_probs.len().saturating_sub(1)
    }

    /// The most likely action, ties resolve to the lowest index.
    pub fn argmax(&self) -> usize {
        self.log_probs
            .iter()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |(best, best_lp), (a, &lp)| {
                if lp > best_lp { (a, lp) } else { (best, best_lp) }
            })
            .0
    }
}
