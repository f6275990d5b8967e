use serde::{Deserialize, Serialize};

/// The widths of the policy network's hidden layers.
///
/// The input and output sizes come from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub hidden_size: usize,
    pub lstm_size: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            hidden_size: 64,
            lstm_size: 64,
        }
    }
}
