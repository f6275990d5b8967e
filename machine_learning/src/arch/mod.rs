pub mod activations;
mod distribution;
pub mod layers;
mod layout;
pub mod loss;
mod network;

pub use distribution::Categorical;
pub use layout::{ParamLayout, TensorSpec};
pub use network::{NetSpec, PolicyNet, RecurrentState, StepCache, StepOutput};
