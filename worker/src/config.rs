use std::{num::NonZeroUsize, time::Duration};

/// Immutable hyperparameters of a worker's training loop.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// The reward discount.
    pub gamma: f32,
    /// The GAE decay.
    pub tau: f32,
    /// The amount of steps rolled out between updates.
    pub segment_len: NonZeroUsize,
    /// The loop stops once the global frame count reaches this value.
    pub max_frames: u64,
    /// Episodes are cut after this amount of steps.
    pub max_episode_len: u64,
    /// The maximum global norm of the local gradient.
    pub grad_clip: f32,
    /// Picks the most likely action instead of sampling one.
    pub test: bool,
    pub render: bool,
    /// A checkpoint is saved whenever the global episode count is a multiple of this, zero
    /// disables them.
    pub checkpoint_every: u64,
    /// The minimum time between two status lines.
    pub log_interval: Duration,
    /// The base seed, every worker offsets it by its rank.
    pub seed: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            tau: 1.,
            segment_len: NonZeroUsize::new(20).unwrap_or(NonZeroUsize::MIN),
            max_frames: 40_000_000,
            max_episode_len: 10_000,
            grad_clip: 40.,
            test: false,
            render: false,
            checkpoint_every: 10_000,
            log_interval: Duration::from_secs(60),
            seed: 0,
        }
    }
}
