use ndarray::Array1;

use super::{Environment, Result, Transition, check_action, one_hot};

/// Two step episodes paying `1` and then `-1`, whatever the agent does.
#[derive(Debug, Clone, Default)]
pub struct Alternating {
    t: usize,
}

impl Alternating {
    pub const ID: &'static str = "alternating-v0";
    const REWARDS: [f32; 2] = [1., -1.];

    pub fn new() -> Self {
        Self::default()
    }
}

impl Environment for Alternating {
    type Observation = Array1<f32>;

    fn reset(&mut self) -> Result<Array1<f32>> {
        self.t = 0;
        Ok(one_hot(0, 2))
    }

    fn step(&mut self, action: usize) -> Result<Transition<Array1<f32>>> {
        check_action(action, self.num_actions())?;

        let reward = Self::REWARDS[self.t];
        self.t = (self.t + 1) % Self::REWARDS.len();

        Ok(Transition {
            observation: one_hot(self.t, 2),
            reward,
            done: self.t == 0,
            info: None,
        })
    }

    fn num_actions(&self) -> usize {
        2
    }

    fn observation_size(&self) -> usize {
        2
    }

    fn render(&self) {
        log::info!("{}: t={}", Self::ID, self.t);
    }
}
