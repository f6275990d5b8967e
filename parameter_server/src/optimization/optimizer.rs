use crate::storage::{Result, WildBuf};

/// Defines the strategy for updating shared parameters based on a shared gradient.
///
/// Implementations are called concurrently from every worker through a shared reference, any
/// state they keep must live in shared buffers.
pub trait Optimizer: Send + Sync {
    /// Updates the provided parameters in place using the gradient.
    ///
    /// # Arguments
    /// * `grad` - The gradient of the parameters.
    /// * `params` - The parameters to update.
    ///
    /// # Returns
    /// An error if there's a mismatch in the sizes of `grad` and `params`.
    fn update_params(&self, grad: &WildBuf, params: &WildBuf) -> Result<()>;
}
