use std::{fs, path::{Path, PathBuf}};

use serde::{Deserialize, Serialize};
use worker::env::ENV_IDS;

use super::ModelConfig;
use crate::error::{OrchestratorError, Result};

/// What happens to a shared gradient slot after an optimizer step consumed it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotPolicyConfig {
    #[default]
    ClearAfterStep,
    Persist,
}

/// Every option of a training run.
///
/// Missing JSON fields take their default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainingConfig {
    /// The environment identifier.
    pub env: String,
    /// The amount of workers.
    pub processes: usize,
    pub render: bool,
    /// Test mode freezes the parameters, runs a single worker and picks the most likely actions.
    pub test: bool,
    /// The amount of steps per segment.
    #[serde(alias = "lstm_steps")]
    pub segment_len: usize,
    pub lr: f32,
    pub seed: u64,
    pub gamma: f32,
    pub tau: f32,
    pub max_frames: u64,
    pub max_episode_len: u64,
    pub grad_clip: f32,
    pub checkpoint_every: u64,
    pub log_interval_secs: u64,
    pub running_decay: f32,
    pub slot_policy: SlotPolicyConfig,
    pub model: ModelConfig,
    /// The run directory is `<run_root>/<env lowercased>/`.
    pub run_root: PathBuf,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            env: "target-v0".into(),
            processes: 20,
            render: false,
            test: false,
            segment_len: 20,
            lr: 1e-4,
            seed: 0,
            gamma: 0.99,
            tau: 1.,
            max_frames: 40_000_000,
            max_episode_len: 10_000,
            grad_clip: 40.,
            checkpoint_every: 10_000,
            log_interval_secs: 60,
            running_decay: 0.98,
            slot_policy: SlotPolicyConfig::default(),
            model: ModelConfig::default(),
            run_root: PathBuf::from("."),
        }
    }
}

impl TrainingConfig {
    pub const CONFIG_VAR: &'static str = "A3C_CONFIG";
    pub const ENV_VAR: &'static str = "A3C_ENV";
    pub const WORKERS_VAR: &'static str = "A3C_WORKERS";
    pub const TEST_VAR: &'static str = "A3C_TEST";

    /// Reads a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Overrides single fields from environment variables.
    ///
    /// # Arguments
    /// * `var` - Looks a variable up, `std::env::var` outside of tests.
    ///
    /// # Returns
    /// The updated configuration or `InvalidConfig` if a variable doesn't parse.
    pub fn with_env_overrides<F>(mut self, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(env) = var(Self::ENV_VAR) {
            self.env = env;
        }

        if let Some(processes) = var(Self::WORKERS_VAR) {
            self.processes = processes.trim().parse().map_err(|_| {
                OrchestratorError::InvalidConfig(format!(
                    "{} must be a positive integer, got {processes:?}",
                    Self::WORKERS_VAR
                ))
            })?;
        }

        if let Some(test) = var(Self::TEST_VAR) {
            self.test = match test.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                _ => {
                    return Err(OrchestratorError::InvalidConfig(format!(
                        "{} must be a boolean, got {test:?}",
                        Self::TEST_VAR
                    )));
                }
            };
        }

        Ok(self)
    }

    /// Checks every option is usable.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(OrchestratorError::InvalidConfig(msg));

        if !ENV_IDS.contains(&self.env.to_lowercase().as_str()) {
            return invalid(format!(
                "unknown environment {:?}, expected one of {ENV_IDS:?}",
                self.env
            ));
        }
        if self.processes == 0 {
            return invalid("processes must be at least 1".into());
        }
        if self.segment_len == 0 {
            return invalid("segment_len must be at least 1".into());
        }
        if !self.lr.is_finite() || self.lr < 0. {
            return invalid(format!("lr must be non negative, got {}", self.lr));
        }
        if !(0. ..=1.).contains(&self.gamma) {
            return invalid(format!("gamma must be in [0, 1], got {}", self.gamma));
        }
        if !(0. ..=1.).contains(&self.tau) {
            return invalid(format!("tau must be in [0, 1], got {}", self.tau));
        }
        if self.grad_clip.is_nan() || self.grad_clip <= 0. {
            return invalid(format!("grad_clip must be positive, got {}", self.grad_clip));
        }
        if !(0. ..1.).contains(&self.running_decay) {
            return invalid(format!(
                "running_decay must be in [0, 1), got {}",
                self.running_decay
            ));
        }
        if self.max_episode_len == 0 {
            return invalid("max_episode_len must be at least 1".into());
        }
        if self.model.hidden_size == 0 || self.model.lstm_size == 0 {
            return invalid("model widths must be at least 1".into());
        }

        Ok(())
    }

    /// Applies the effects of the test and render modes: a single worker and no learning.
    pub fn resolve(mut self) -> Self {
        if self.test || self.render {
            self.processes = 1;
            self.lr = 0.;
        }

        self
    }

    /// The directory holding the run's log and checkpoints.
    pub fn run_dir(&self) -> PathBuf {
        self.run_root.join(self.env.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: TrainingConfig =
            serde_json::from_str(r#"{ "env": "Corridor-v0", "lstm_steps": 5, "model": { "lstm_size": 8 } }"#)
                .unwrap();

        assert_eq!(config.env, "Corridor-v0");
        assert_eq!(config.segment_len, 5);
        assert_eq!(config.model.lstm_size, 8);
        assert_eq!(config.model.hidden_size, 64);
        assert_eq!(config.processes, 20);
        assert_eq!(config.slot_policy, SlotPolicyConfig::ClearAfterStep);
        assert!(config.validate().is_ok());
        assert_eq!(config.run_dir(), PathBuf::from("./corridor-v0"));
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(serde_json::from_str::<TrainingConfig>(r#"{ "epochs": 3 }"#).is_err());
    }

    #[test]
    fn slot_policy_names() {
        let config: TrainingConfig = serde_json::from_str(r#"{ "slot_policy": "persist" }"#).unwrap();
        assert_eq!(config.slot_policy, SlotPolicyConfig::Persist);
    }

    #[test]
    fn validation() {
        let bad = [
            TrainingConfig {
                processes: 0,
                ..Default::default()
            },
            TrainingConfig {
                segment_len: 0,
                ..Default::default()
            },
            TrainingConfig {
                gamma: 1.5,
                ..Default::default()
            },
            TrainingConfig {
                lr: -1.,
                ..Default::default()
            },
            TrainingConfig {
                grad_clip: 0.,
                ..Default::default()
            },
            TrainingConfig {
                env: "Breakout-v0".into(),
                ..Default::default()
            },
        ];

        assert!(TrainingConfig::default().validate().is_ok());
        for config in bad {
            assert!(
                matches!(config.validate(), Err(OrchestratorError::InvalidConfig(_))),
                "{config:?}"
            );
        }
    }

    #[test]
    fn test_mode_freezes_training() {
        let config = TrainingConfig {
            test: true,
            ..Default::default()
        }
        .resolve();

        assert_eq!(config.processes, 1);
        assert_eq!(config.lr, 0.);

        let config = TrainingConfig::default().resolve();
        assert_eq!(config.processes, 20);
        assert_eq!(config.lr, 1e-4);
    }

    #[test]
    fn env_overrides() {
        let vars = HashMap::from([
            (TrainingConfig::ENV_VAR, "corridor-v0"),
            (TrainingConfig::WORKERS_VAR, "3"),
            (TrainingConfig::TEST_VAR, "true"),
        ]);

        let config = TrainingConfig::default()
            .with_env_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.env, "corridor-v0");
        assert_eq!(config.processes, 3);
        assert!(config.test);

        let err = TrainingConfig::default()
            .with_env_overrides(|k| (k == TrainingConfig::WORKERS_VAR).then(|| "many".to_string()));
        assert!(err.is_err());
    }
}
