use std::sync::Arc;

use machine_learning::{arch::ParamLayout, initialization::ParamGen};
use rayon::prelude::*;

use super::{SlotPolicy, WildShard};
use crate::{
    optimization::Optimizer,
    storage::{Result, SizeMismatchErr},
};

/// The canonical parameters every worker pulls from and pushes gradients to.
///
/// It holds one `WildShard` per tensor of the layout. Cloning the store is cheap and every clone
/// refers to the same shared state, no method takes a lock.
pub struct ParameterStore<O: Optimizer> {
    nparams: usize,
    layout: Arc<ParamLayout>,
    shards: Arc<[WildShard<O>]>,
    policy: SlotPolicy,
}

impl<O: Optimizer> Clone for ParameterStore<O> {
    fn clone(&self) -> Self {
        Self {
            nparams: self.nparams,
            layout: Arc::clone(&self.layout),
            shards: Arc::clone(&self.shards),
            policy: self.policy,
        }
    }
}

impl<O: Optimizer> ParameterStore<O> {
    /// Creates a new `ParameterStore`.
    ///
    /// # Arguments
    /// * `layout` - The tensors of the model.
    /// * `policy` - The gradient slots' reset policy.
    /// * `param_gen` - A parameter generator, sampled once per tensor in layout order.
    /// * `optimizer_factory` - An `Optimizer` factory closure, called with each tensor's size.
    ///
    /// # Returns
    /// A new `ParameterStore` instance or a `SizeMismatchErr` if the generator ran out early.
    pub fn new<PG, OF>(
        layout: ParamLayout,
        policy: SlotPolicy,
        mut param_gen: PG,
        mut optimizer_factory: OF,
    ) -> Result<Self>
    where
        PG: ParamGen,
        OF: FnMut(usize) -> O,
    {
        let mut nparams = 0;
        let mut shards = Vec::with_capacity(layout.tensors().len());

        for tensor in layout.tensors() {
            let params = param_gen.sample(tensor.len()).unwrap_or_default();
            SizeMismatchErr::check(params.len(), tensor.len())?;

            nparams += params.len();
            let optimizer = optimizer_factory(params.len());
            shards.push(WildShard::new(&params, policy, optimizer));
        }

        log::debug!(nparams = nparams, tensors = shards.len(); "parameter store ready");

        Ok(Self {
            nparams,
            layout: Arc::new(layout),
            shards: Arc::from(shards),
            policy,
        })
    }

    /// Returns the total amount of parameters.
    pub fn len(&self) -> usize {
        self.nparams
    }

    pub fn is_empty(&self) -> bool {
        self.nparams == 0
    }

    pub fn layout(&self) -> &ParamLayout {
        &self.layout
    }

    pub fn policy(&self) -> SlotPolicy {
        self.policy
    }

    pub fn shards(&self) -> &[WildShard<O>] {
        &self.shards
    }

    /// Copies the canonical parameters into the provided destination buffer.
    ///
    /// The copy may observe another worker's step halfway through.
    ///
    /// # Arguments
    /// * `out` - A mutable slice where the parameters will be copied.
    ///
    /// # Returns
    /// A `SizeMismatchErr` if `out` isn't the same size as this store.
    pub fn pull_params(&self, out: &mut [f32]) -> Result<()> {
        let chunks = self.split_mut(out)?;

        self.shards
            .par_iter()
            .zip(chunks)
            .try_for_each(|(shard, out)| shard.params().read_into(out))
    }

    /// Returns a copy of the canonical parameters.
    pub fn snapshot(&self) -> Vec<f32> {
        self.shards
            .iter()
            .flat_map(|shard| shard.params().to_vec())
            .collect()
    }

    /// Overwrites the canonical parameters, used to restore a checkpoint.
    ///
    /// # Returns
    /// A `SizeMismatchErr` if `params` isn't the same size as this store.
    pub fn assign(&self, params: &[f32]) -> Result<()> {
        SizeMismatchErr::check(params.len(), self.nparams)?;

        let mut rest = params;
        for shard in self.shards.iter() {
            let (chunk, tail) = rest.split_at(shard.len());
            shard.params().write_from(chunk)?;
            rest = tail;
        }

        Ok(())
    }

    /// Offers a worker's local gradient to every gradient slot.
    ///
    /// Each slot keeps the gradient only if it was empty, see `GradSlot::offer`.
    ///
    /// # Arguments
    /// * `rank` - The rank of the offering worker.
    /// * `grad` - The worker's full flat gradient.
    ///
    /// # Returns
    /// The amount of slots written or a `SizeMismatchErr`.
    pub fn offer_grads(&self, rank: usize, grad: &[f32]) -> Result<usize> {
        SizeMismatchErr::check(grad.len(), self.nparams)?;

        let mut written = 0;
        let mut rest = grad;
        for shard in self.shards.iter() {
            let (chunk, tail) = rest.split_at(shard.len());
            if shard.slot().offer(rank, chunk)? {
                written += 1;
            }
            rest = tail;
        }

        Ok(written)
    }

    /// Runs the optimizer over every tensor whose gradient slot is full.
    ///
    /// # Returns
    /// The amount of tensors updated.
    pub fn step(&self) -> Result<usize> {
        self.shards
            .par_iter()
            .map(|shard| shard.step().map(usize::from))
            .try_reduce(|| 0, |a, b| Ok(a + b))
    }

    fn split_mut<'a>(&self, mut out: &'a mut [f32]) -> Result<Vec<&'a mut [f32]>> {
        SizeMismatchErr::check(out.len(), self.nparams)?;

        let mut chunks = Vec::with_capacity(self.shards.len());
        for shard in self.shards.iter() {
            let chunk;
            (chunk, out) = out.split_at_mut(shard.len());
            chunks.push(chunk);
        }

        Ok(chunks)
    }
}
