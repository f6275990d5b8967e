use ndarray::Array1;
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::{Environment, Result, Transition, check_action, one_hot};

/// Shows a random target action every step and pays `1` for picking it, `-1` otherwise.
///
/// Episodes last a fixed amount of steps. A policy reading its observation can reach the maximum
/// reward, a uniformly random one averages `(2 - num_actions) / num_actions` per step.
#[derive(Debug, Clone)]
pub struct Target {
    num_actions: usize,
    episode_len: usize,
    t: usize,
    target: usize,
    rng: StdRng,
}

impl Target {
    pub const ID: &'static str = "target-v0";
    pub const NUM_ACTIONS: usize = 2;
    pub const EPISODE_LEN: usize = 10;

    /// Creates a new `Target` environment.
    ///
    /// # Arguments
    /// * `num_actions` - The amount of actions, at least one.
    /// * `episode_len` - The amount of steps per episode.
    /// * `seed` - The seed the targets are drawn with.
    ///
    /// # Returns
    /// A new `Target` instance.
    pub fn new(num_actions: usize, episode_len: usize, seed: u64) -> Self {
        Self {
            num_actions: num_actions.max(1),
            episode_len,
            t: 0,
            target: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn draw(&mut self) -> Array1<f32> {
        self.target = self.rng.random_range(0..self.num_actions);
        one_hot(self.target, self.num_actions)
    }
}

impl Environment for Target {
    type Observation = Array1<f32>;

    fn reset(&mut self) -> Result<Array1<f32>> {
        self.t = 0;
        Ok(self.draw())
    }

    fn step(&mut self, action: usize) -> Result<Transition<Array1<f32>>> {
        check_action(action, self.num_actions)?;

        let reward = if action == self.target { 1. } else { -1. };
        self.t += 1;

        Ok(Transition {
            observation: self.draw(),
            reward,
            done: self.t >= self.episode_len,
            info: None,
        })
    }

    fn num_actions(&self) -> usize {
        self.num_actions
    }

    fn observation_size(&self) -> usize {
        self.num_actions
    }

    fn render(&self) {
        log::info!("{}: t={} target={}", Self::ID, self.t, self.target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewards_the_shown_target() {
        let mut env = Target::new(3, 4, 1);
        let mut obs = env.reset().unwrap();
        let mut total = 0.;

        for t in 0..4 {
            let action = obs.iter().position(|&x| x == 1.).unwrap();
            let transition = env.step(action).unwrap();
            total += transition.reward;
            assert_eq!(transition.done, t == 3);
            obs = transition.observation;
        }

        assert_eq!(total, 4.);
    }

    #[test]
    fn same_seed_same_targets() {
        let mut a = Target::new(4, 10, 9);
        let mut b = Target::new(4, 10, 9);

        assert_eq!(a.reset().unwrap(), b.reset().unwrap());
        for _ in 0..5 {
            assert_eq!(a.step(0).unwrap(), b.step(0).unwrap());
        }
    }
}
