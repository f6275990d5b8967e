use std::{num::NonZeroUsize, time::Duration};

use machine_learning::arch::NetSpec;
use parameter_server::SlotPolicy;
use worker::WorkerConfig;

use super::{SlotPolicyConfig, TrainingConfig};
use crate::error::{OrchestratorError, Result};

impl From<SlotPolicyConfig> for SlotPolicy {
    fn from(value: SlotPolicyConfig) -> Self {
        match value {
            SlotPolicyConfig::ClearAfterStep => SlotPolicy::ClearAfterStep,
            SlotPolicyConfig::Persist => SlotPolicy::Persist,
        }
    }
}

/// Turns a validated `TrainingConfig` into the settings of every component.
pub struct Adapter;

impl Adapter {
    /// The hyperparameters every worker runs with.
    pub fn worker_config(training: &TrainingConfig) -> Result<WorkerConfig> {
        let segment_len = NonZeroUsize::new(training.segment_len).ok_or_else(|| {
            OrchestratorError::InvalidConfig("segment_len must be at least 1".into())
        })?;

        Ok(WorkerConfig {
            gamma: training.gamma,
            tau: training.tau,
            segment_len,
            max_frames: training.max_frames,
            max_episode_len: training.max_episode_len,
            grad_clip: training.grad_clip,
            test: training.test,
            render: training.render,
            checkpoint_every: training.checkpoint_every,
            log_interval: Duration::from_secs(training.log_interval_secs),
            seed: training.seed,
        })
    }

    /// The network's dimensions, the input and output sizes come from the environment.
    pub fn net_spec(training: &TrainingConfig, obs_size: usize, num_actions: usize) -> NetSpec {
        NetSpec {
            obs_size,
            hidden_size: training.model.hidden_size,
            lstm_size: training.model.lstm_size,
            num_actions,
        }
    }
}
