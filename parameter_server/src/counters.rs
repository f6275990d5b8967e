use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// A point in time copy of the `GlobalCounters`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterSnapshot {
    pub frames: u64,
    pub episodes: u64,
    pub run_reward: f32,
    pub run_loss: f32,
}

/// The training progress shared by every worker.
///
/// Frames and episodes are atomic counters. The running averages are updated with a plain load
/// followed by a store, two workers finishing an episode at once may lose one of the updates.
#[derive(Debug)]
pub struct GlobalCounters {
    frames: AtomicU64,
    episodes: AtomicU64,
    run_reward: AtomicU32,
    run_loss: AtomicU32,
    decay: f32,
}

impl GlobalCounters {
    pub const DECAY: f32 = 0.98;

    /// Creates a new `GlobalCounters` starting at zero.
    ///
    /// # Arguments
    /// * `decay` - The weight the running averages give to their previous value.
    ///
    /// # Returns
    /// A new `GlobalCounters` instance.
    pub fn new(decay: f32) -> Self {
        Self::resume(decay, 0)
    }

    /// Creates a new `GlobalCounters` picking up at a previous episode count.
    pub fn resume(decay: f32, episodes: u64) -> Self {
        Self {
            frames: AtomicU64::new(0),
            episodes: AtomicU64::new(episodes),
            run_reward: AtomicU32::new(0f32.to_bits()),
            run_loss: AtomicU32::new(0f32.to_bits()),
            decay,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn episodes(&self) -> u64 {
        self.episodes.load(Ordering::Relaxed)
    }

    pub fn run_reward(&self) -> f32 {
        f32::from_bits(self.run_reward.load(Ordering::Relaxed))
    }

    pub fn run_loss(&self) -> f32 {
        f32::from_bits(self.run_loss.load(Ordering::Relaxed))
    }

    /// Records a finished episode.
    ///
    /// The episode's length is added to the frame count and the running averages move towards
    /// the episode's reward and loss.
    ///
    /// # Arguments
    /// * `length` - The amount of steps the episode took.
    /// * `reward` - The episode's total clipped reward.
    /// * `loss` - The episode's accumulated loss.
    ///
    /// # Returns
    /// The episode count including this one.
    pub fn finish_episode(&self, length: u64, reward: f32, loss: f32) -> u64 {
        self.frames.fetch_add(length, Ordering::Relaxed);
        let episodes = self.episodes.fetch_add(1, Ordering::Relaxed) + 1;

        self.smooth(&self.run_reward, reward);
        self.smooth(&self.run_loss, loss);

        episodes
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            frames: self.frames(),
            episodes: self.episodes(),
            run_reward: self.run_reward(),
            run_loss: self.run_loss(),
        }
    }

    fn smooth(&self, cell: &AtomicU32, x: f32) {
        let old = f32::from_bits(cell.load(Ordering::Relaxed));
        let new = self.decay * old + (1. - self.decay) * x;
        cell.store(new.to_bits(), Ordering::Relaxed);
    }
}

impl Default for GlobalCounters {
    fn default() -> Self {
        Self::new(Self::DECAY)
    }
}
