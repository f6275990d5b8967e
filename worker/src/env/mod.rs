mod alternating;
mod corridor;
mod error;
mod target;

use ndarray::Array1;

pub use alternating::Alternating;
pub use corridor::Corridor;
pub use error::EnvErr;
pub use target::Target;

/// The result type of environment calls.
pub type Result<T> = std::result::Result<T, EnvErr>;

/// What the environment answers to a single action.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<O> {
    pub observation: O,
    pub reward: f32,
    pub done: bool,
    pub info: Option<String>,
}

/// A simulator the agent interacts with, one instance per worker.
pub trait Environment: Send {
    type Observation;

    /// Starts a new episode.
    ///
    /// # Returns
    /// The first observation of the episode.
    fn reset(&mut self) -> Result<Self::Observation>;

    /// Advances the simulation by one action.
    ///
    /// # Arguments
    /// * `action` - An action in `0..num_actions()`.
    ///
    /// # Returns
    /// The next observation, the reward and whether the episode ended.
    fn step(&mut self, action: usize) -> Result<Transition<Self::Observation>>;

    /// The size of the discrete action space.
    fn num_actions(&self) -> usize;

    /// The length of the observation once flattened.
    fn observation_size(&self) -> usize;

    /// Shows the current state, a no-op by default.
    fn render(&self) {}
}

impl<E: Environment + ?Sized> Environment for Box<E> {
    type Observation = E::Observation;

    fn reset(&mut self) -> Result<Self::Observation> {
        (**self).reset()
    }

    fn step(&mut self, action: usize) -> Result<Transition<Self::Observation>> {
        (**self).step(action)
    }

    fn num_actions(&self) -> usize {
        (**self).num_actions()
    }

    fn observation_size(&self) -> usize {
        (**self).observation_size()
    }

    fn render(&self) {
        (**self).render()
    }
}

/// An environment with vector observations, as returned by `make`.
pub type BoxedEnv = Box<dyn Environment<Observation = Array1<f32>>>;

/// The identifiers `make` understands.
pub const ENV_IDS: [&str; 3] = [Alternating::ID, Target::ID, Corridor::ID];

/// Builds one of the built-in environments.
///
/// # Arguments
/// * `id` - The environment's identifier, case insensitive.
/// * `seed` - The seed of the environment's own randomness.
///
/// # Returns
/// The environment or `EnvErr::UnknownEnv`.
pub fn make(id: &str, seed: u64) -> Result<BoxedEnv> {
    let env: BoxedEnv = match id.to_lowercase().as_str() {
        Alternating::ID => Box::new(Alternating::new()),
        Target::ID => Box::new(Target::new(Target::NUM_ACTIONS, Target::EPISODE_LEN, seed)),
        Corridor::ID => Box::new(Corridor::new(Corridor::LEN)),
        _ => return Err(EnvErr::UnknownEnv(id.to_string())),
    };

    Ok(env)
}

pub(crate) fn check_action(action: usize, num_actions: usize) -> Result<()> {
    if action >= num_actions {
        return Err(EnvErr::InvalidAction {
            action,
            num_actions,
        });
    }

    Ok(())
}

pub(crate) fn one_hot(i: usize, len: usize) -> Array1<f32> {
    let mut x = Array1::zeros(len);
    if let Some(v) = x.get_mut(i) {
        *v = 1.;
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry() {
        for id in ENV_IDS {
            let mut env = make(id, 0).unwrap();
            let obs = env.reset().unwrap();
            assert_eq!(obs.len(), env.observation_size());
        }

        assert!(make("Target-V0", 0).is_ok());
        assert_eq!(
            make("pong-v4", 0).err(),
            Some(EnvErr::UnknownEnv("pong-v4".into()))
        );
    }
}
