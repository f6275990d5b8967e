use ndarray::{Array2, Axis};

use super::{Segment, discount};

/// The scalar terms of the actor-critic loss for one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cost {
    pub policy_loss: f32,
    pub value_loss: f32,
    pub entropy_term: f32,
    pub total: f32,
}

/// The regression targets of a segment: GAE advantages and discounted returns.
///
/// Both are constants for the purpose of differentiation.
#[derive(Debug, Clone, PartialEq)]
pub struct Targets {
    pub advantages: Vec<f32>,
    pub returns: Vec<f32>,
}

/// The derivative of the total loss with respect to each step's outputs.
#[derive(Debug, Clone)]
pub struct CostGrad {
    pub d_values: Vec<f32>,
    pub d_logits: Array2<f32>,
}

/// Generalized advantage estimation actor-critic loss.
///
/// `total = policy_loss + value_coef * value_loss + entropy_coef * entropy_term` where
/// * `policy_loss = -sum_t log pi(a_t) * A_t`
/// * `value_loss = 0.5 * sum_t (R_t - V_t)^2`
/// * `entropy_term = sum_t sum_a pi(a) * log pi(a)`, the negated entropy.
#[derive(Debug, Clone, Copy)]
pub struct ActorCriticLoss {
    gamma: f32,
    tau: f32,
    value_coef: f32,
    entropy_coef: f32,
}

impl ActorCriticLoss {
    pub const VALUE_COEF: f32 = 0.5;
    pub const ENTROPY_COEF: f32 = 0.01;

    /// Creates a new `ActorCriticLoss` with the default coefficients.
    ///
    /// # Arguments
    /// * `gamma` - The reward discount.
    /// * `tau` - The GAE decay.
    ///
    /// # Returns
    /// A new `ActorCriticLoss` instance.
    pub fn new(gamma: f32, tau: f32) -> Self {
        Self {
            gamma,
            tau,
            value_coef: Self::VALUE_COEF,
            entropy_coef: Self::ENTROPY_COEF,
        }
    }

    /// Computes the advantages and returns of a segment.
    ///
    /// # Arguments
    /// * `segment` - A finished rollout segment.
    ///
    /// # Returns
    /// The segment's `Targets`.
    pub fn targets(&self, segment: &Segment) -> Targets {
        let values = segment.values();
        let rewards = segment.rewards();
        let len = segment.len();

        let deltas: Vec<f32> = (0..len)
            .map(|t| rewards[t] + self.gamma * values[t + 1] - values[t])
            .collect();
        let advantages = discount(&deltas, self.gamma * self.tau);

        let mut bootstrapped = rewards.to_vec();
        bootstrapped[len - 1] += self.gamma * segment.bootstrap();
        let returns = discount(&bootstrapped, self.gamma);

        Targets {
            advantages,
            returns,
        }
    }

    /// Computes the loss of a segment.
    pub fn cost(&self, segment: &Segment) -> Cost {
        let targets = self.targets(segment);
        self.cost_with(segment, &targets)
    }

    /// Computes the loss of a segment against precomputed targets.
    pub fn cost_with(&self, segment: &Segment, targets: &Targets) -> Cost {
        let log_probs = segment.log_probs();
        let values = segment.values();

        let policy_loss = -segment
            .actions()
            .iter()
            .zip(&targets.advantages)
            .enumerate()
            .map(|(t, (&a, adv))| log_probs[(t, a)] * adv)
            .sum::<f32>();

        let value_loss = 0.5
            * targets
                .returns
                .iter()
                .zip(values)
                .map(|(r, v)| (r - v).powi(2))
                .sum::<f32>();

        let entropy_term = log_probs.iter().map(|lp| lp.exp() * lp).sum::<f32>();

        Cost {
            policy_loss,
            value_loss,
            entropy_term,
            total: policy_loss + self.value_coef * value_loss + self.entropy_coef * entropy_term,
        }
    }

    /// Differentiates the total loss with respect to the values and logits of every step.
    ///
    /// The log probabilities are the log-softmax of the logits, the targets are held constant.
    ///
    /// # Arguments
    /// * `segment` - A finished rollout segment.
    /// * `targets` - The segment's targets.
    ///
    /// # Returns
    /// The per step derivatives.
    pub fn grad(&self, segment: &Segment, targets: &Targets) -> CostGrad {
        let log_probs = segment.log_probs();

        let d_values = targets
            .returns
            .iter()
            .zip(segment.values())
            .map(|(r, v)| self.value_coef * (v - r))
            .collect();

        let mut d_logits = log_probs.mapv(f32::exp);
        for (t, mut row) in d_logits.axis_iter_mut(Axis(0)).enumerate() {
            let lp = log_probs.row(t);
            let neg_entropy: f32 = row.iter().zip(lp).map(|(p, lp)| p * lp).sum();
            let adv = targets.advantages[t];
            let action = segment.actions()[t];

            for (a, (p, &lp)) in row.iter_mut().zip(lp).enumerate() {
                let prob = *p;
                let one_hot = if a == action { 1. } else { 0. };

                *p = -adv * (one_hot - prob) + self.entropy_coef * prob * (lp - neg_entropy);
            }
        }

        CostGrad { d_values, d_logits }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, array};

    use super::*;

    const EPS: f32 = 1e-5;

    fn segment(values: Vec<f32>, rewards: Vec<f32>) -> Segment {
        let len = rewards.len();
        let log_probs = Array2::from_elem((len, 2), 0.5f32.ln());
        Segment::new(values, log_probs, vec![0; len], rewards).unwrap()
    }

    #[test]
    fn single_step_gae_is_td_residual() {
        let loss = ActorCriticLoss::new(0.9, 0.7);
        let seg = segment(vec![0.3, 1.2], vec![0.5]);

        let targets = loss.targets(&seg);
        let td = 0.5 + 0.9 * 1.2 - 0.3;
        assert!((targets.advantages[0] - td).abs() < EPS);
    }

    #[test]
    fn undiscounted_gae_telescopes() {
        let loss = ActorCriticLoss::new(1., 1.);
        let values = vec![0.2, -0.4, 1.1, 0.7, 0.3];
        let rewards = vec![1., 0., -1., 0.5];
        let seg = segment(values.clone(), rewards.clone());

        let targets = loss.targets(&seg);
        let residuals: f32 = (0..4).map(|t| rewards[t] + values[t + 1] - values[t]).sum();

        // With gamma = tau = 1 the first advantage is the sum of every residual, which in turn
        // telescopes to the undiscounted rewards plus the bootstrap minus the first value.
        assert!((targets.advantages[0] - residuals).abs() < EPS);
        assert!((residuals - (0.5 + 0.3 - 0.2)).abs() < EPS);
    }

    #[test]
    fn zero_rewards_return_discounted_bootstrap() {
        let gamma = 0.9f32;
        let bootstrap = 2.;
        let len = 5;
        let loss = ActorCriticLoss::new(gamma, 1.);
        let mut values = vec![0.; len + 1];
        values[len] = bootstrap;
        let seg = segment(values, vec![0.; len]);

        let targets = loss.targets(&seg);
        for (t, r) in targets.returns.iter().enumerate() {
            let expected = gamma.powi((len - t) as i32) * bootstrap;
            assert!((r - expected).abs() < EPS, "t={t} got {r} expected {expected}");
        }
    }

    #[test]
    fn hand_computed_two_step_episode() {
        // Uniform policy over two actions, zero value estimates, an episode that ends after two
        // steps with rewards [1, -1] so the bootstrap value is zero.
        let loss = ActorCriticLoss::new(0.99, 1.);
        let log_probs = Array2::from_elem((2, 2), 0.5f32.ln());
        let seg = Segment::new(vec![0.; 3], log_probs, vec![1, 0], vec![1., -1.]).unwrap();

        let cost = loss.cost(&seg);
        let ln_half = 0.5f32.ln();

        // advantages = [1 - 0.99, -1], returns = [0.01, -1]
        let policy = -(ln_half * 0.01 + ln_half * -1.);
        let value = 0.5 * (0.01f32.powi(2) + 1.);
        let entropy = 2. * ln_half;

        assert!((cost.policy_loss - policy).abs() < EPS);
        assert!((cost.value_loss - value).abs() < EPS);
        assert!((cost.entropy_term - entropy).abs() < EPS);
        assert!((cost.total - (policy + 0.5 * value + 0.01 * entropy)).abs() < EPS);
    }

    #[test]
    fn cost_is_deterministic() {
        let loss = ActorCriticLoss::new(0.99, 0.95);
        let log_probs = array![[-0.2f32, -1.7], [-0.9, -0.52], [-2.3, -0.11]];
        let seg = Segment::new(
            vec![0.1, 0.4, -0.3, 0.8],
            log_probs,
            vec![0, 1, 1],
            vec![1., 0., -1.],
        )
        .unwrap();

        assert_eq!(loss.cost(&seg), loss.cost(&seg));
    }

    #[test]
    fn value_grad_points_to_returns() {
        let loss = ActorCriticLoss::new(0.5, 1.);
        let seg = segment(vec![3., 0., 0.], vec![1., 1.]);
        let targets = loss.targets(&seg);
        let grad = loss.grad(&seg, &targets);

        // R = [1.5, 1], V = [3, 0]
        assert!((grad.d_values[0] - 0.5 * 1.5).abs() < EPS);
        assert!((grad.d_values[1] - 0.5 * -1.).abs() < EPS);
    }

    #[test]
    fn logit_grad_matches_finite_differences() {
        use crate::arch::Categorical;

        let loss = ActorCriticLoss::new(0.99, 0.95);
        let logits = array![[0.3f32, -0.2, 0.9], [-1.1, 0.4, 0.2]];
        let actions = vec![2, 0];
        let values = vec![0.5, -0.1, 0.2];
        let rewards = vec![1., -1.];

        let build = |logits: &Array2<f32>| {
            let mut log_probs = Array2::zeros(logits.raw_dim());
            for (mut out, row) in log_probs.axis_iter_mut(Axis(0)).zip(logits.axis_iter(Axis(0))) {
                out.assign(&Categorical::from_logits(row).log_probs());
            }
            Segment::new(values.clone(), log_probs, actions.clone(), rewards.clone()).unwrap()
        };

        let seg = build(&logits);
        let targets = loss.targets(&seg);
        let grad = loss.grad(&seg, &targets);

        let h = 1e-2;
        for t in 0..2 {
            for a in 0..3 {
                let mut plus = logits.clone();
                plus[(t, a)] += h;
                let mut minus = logits.clone();
                minus[(t, a)] -= h;

                let numeric = (loss.cost_with(&build(&plus), &targets).total
                    - loss.cost_with(&build(&minus), &targets).total)
                    / (2. * h);

                assert!(
                    (numeric - grad.d_logits[(t, a)]).abs() < 1e-3,
                    "t={t} a={a} numeric={numeric} analytic={}",
                    grad.d_logits[(t, a)]
                );
            }
        }
    }
}
