//! The lock-free shared state of an asynchronous actor-critic run: the canonical parameters with
//! their gradient slots, the shared optimizer and the global progress counters.

mod counters;
pub mod optimization;
pub mod storage;

pub use counters::{CounterSnapshot, GlobalCounters};
pub use storage::{ParameterStore, SizeMismatchErr, SlotPolicy};
