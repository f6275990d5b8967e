mod adapter;
mod model;
mod training;

pub use adapter::Adapter;
pub use model::ModelConfig;
pub use training::{SlotPolicyConfig, TrainingConfig};
