mod buf;
mod shard;
mod slot;
mod store;

pub use buf::WildBuf;
pub use shard::WildShard;
pub use slot::{GradSlot, SlotPolicy};
pub use store::ParameterStore;
