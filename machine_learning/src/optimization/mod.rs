mod clip;

pub use clip::{clip_grad_norm, grad_norm};
