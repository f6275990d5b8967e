use super::{GradSlot, SlotPolicy, WildBuf};
use crate::{optimization::Optimizer, storage::Result};

/// The shared state of a single parameter tensor: its values, its gradient slot and its own
/// optimizer instance.
#[derive(Debug)]
pub struct WildShard<O: Optimizer> {
    params: WildBuf,
    slot: GradSlot,
    optimizer: O,
}

impl<O: Optimizer> WildShard<O> {
    /// Creates a new `WildShard`.
    ///
    /// # Arguments
    /// * `params` - The initial state of the parameters.
    /// * `policy` - The gradient slot's reset policy.
    /// * `optimizer` - The optimization algorithm.
    ///
    /// # Returns
    /// A new `WildShard` instance.
    pub fn new(params: &[f32], policy: SlotPolicy, optimizer: O) -> Self {
        Self {
            params: WildBuf::new(params),
            slot: GradSlot::new(params.len(), policy),
            optimizer,
        }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn params(&self) -> &WildBuf {
        &self.params
    }

    pub fn slot(&self) -> &GradSlot {
        &self.slot
    }

    pub fn optimizer(&self) -> &O {
        &self.optimizer
    }

    /// Applies the optimizer with the slot's gradient, if there's one.
    ///
    /// # Returns
    /// Whether the parameters were updated.
    pub fn step(&self) -> Result<bool> {
        if !self.slot.is_full() {
            return Ok(false);
        }

        self.optimizer.update_params(self.slot.grad(), &self.params)?;
        self.slot.release();
        Ok(true)
    }
}
