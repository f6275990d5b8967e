mod error;
mod wild;

pub use error::{Result, SizeMismatchErr};
pub use wild::{GradSlot, ParameterStore, SlotPolicy, WildBuf, WildShard};
