use ndarray::Array1;

use super::{Environment, Result, Transition, check_action, one_hot};

/// A corridor the agent walks along, action `0` goes left and `1` goes right.
///
/// The episode ends with reward `1` once the right end is reached, every other step pays nothing.
#[derive(Debug, Clone)]
pub struct Corridor {
    len: usize,
    pos: usize,
}

impl Corridor {
    pub const ID: &'static str = "corridor-v0";
    pub const LEN: usize = 6;

    pub fn new(len: usize) -> Self {
        Self {
            len: len.max(2),
            pos: 0,
        }
    }
}

impl Environment for Corridor {
    type Observation = Array1<f32>;

    fn reset(&mut self) -> Result<Array1<f32>> {
        self.pos = 0;
        Ok(one_hot(self.pos, self.len))
    }

    fn step(&mut self, action: usize) -> Result<Transition<Array1<f32>>> {
        check_action(action, 2)?;

        self.pos = match action {
            0 => self.pos.saturating_sub(1),
            _ => (self.pos + 1).min(self.len - 1),
        };
        let done = self.pos == self.len - 1;

        Ok(Transition {
            observation: one_hot(self.pos, self.len),
            reward: if done { 1. } else { 0. },
            done,
            info: None,
        })
    }

    fn num_actions(&self) -> usize {
        2
    }

    fn observation_size(&self) -> usize {
        self.len
    }

    fn render(&self) {
        let cells: String = (0..self.len)
            .map(|i| if i == self.pos { '@' } else { '.' })
            .collect();
        log::info!("{}: {cells}", Self::ID);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_to_the_goal() {
        let mut env = Corridor::new(3);
        env.reset().unwrap();

        let t = env.step(0).unwrap();
        assert_eq!((t.reward, t.done), (0., false));
        assert_eq!(t.observation, one_hot(0, 3));

        env.step(1).unwrap();
        let t = env.step(1).unwrap();
        assert_eq!((t.reward, t.done), (1., true));
    }
}
