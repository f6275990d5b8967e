use std::sync::atomic::{AtomicUsize, Ordering};

use super::WildBuf;
use crate::storage::{Result, SizeMismatchErr};

const EMPTY: usize = 0;

/// What happens to a gradient slot once the optimizer consumed it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SlotPolicy {
    /// The slot is emptied after every optimizer step, the next offer from any worker fills it.
    #[default]
    ClearAfterStep,
    /// The slot is never emptied. The worker that filled it first keeps overwriting it with its
    /// latest gradient, every other worker's gradient is ignored and a step reapplies whatever
    /// the slot holds.
    Persist,
}

/// A check-and-set gradient slot for a single parameter tensor.
///
/// The slot records the rank of the worker that filled it, offers from other workers are
/// dropped while it's full.
#[derive(Debug)]
pub struct GradSlot {
    owner: AtomicUsize,
    grad: WildBuf,
    policy: SlotPolicy,
}

impl GradSlot {
    /// Creates a new empty `GradSlot`.
    ///
    /// # Arguments
    /// * `len` - The size of the tensor.
    /// * `policy` - The reset policy.
    ///
    /// # Returns
    /// A new `GradSlot` instance.
    pub fn new(len: usize, policy: SlotPolicy) -> Self {
        Self {
            owner: AtomicUsize::new(EMPTY),
            grad: WildBuf::zeros(len),
            policy,
        }
    }

    /// Writes `grad` into the slot if it's empty, first writer wins.
    ///
    /// # Arguments
    /// * `rank` - The rank of the offering worker.
    /// * `grad` - The worker's local gradient for this tensor.
    ///
    /// # Returns
    /// Whether the gradient was written, or a `SizeMismatchErr`.
    pub fn offer(&self, rank: usize, grad: &[f32]) -> Result<bool> {
        SizeMismatchErr::check(grad.len(), self.grad.len())?;

        let me = rank + 1;
        let claimed = match self
            .owner
            .compare_exchange(EMPTY, me, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => true,
            Err(owner) => self.policy == SlotPolicy::Persist && owner == me,
        };

        if claimed {
            self.grad.write_from(grad)?;
        }

        Ok(claimed)
    }

    pub fn is_full(&self) -> bool {
        self.owner.load(Ordering::Acquire) != EMPTY
    }

    /// The rank of the worker holding the slot.
    pub fn owner(&self) -> Option<usize> {
        self.owner.load(Ordering::Acquire).checked_sub(1)
    }

    /// The gradient currently held, meaningful only while the slot is full.
    pub fn grad(&self) -> &WildBuf {
        &self.grad
    }

    /// Marks the held gradient as consumed by an optimizer step.
    pub fn release(&self) {
        if self.policy == SlotPolicy::ClearAfterStep {
            self.owner.store(EMPTY, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_writer_wins() {
        let slot = GradSlot::new(2, SlotPolicy::ClearAfterStep);
        assert!(!slot.is_full());

        assert!(slot.offer(3, &[1., 2.]).unwrap());
        assert!(!slot.offer(0, &[9., 9.]).unwrap());
        assert!(!slot.offer(3, &[5., 5.]).unwrap());

        assert_eq!(slot.owner(), Some(3));
        assert_eq!(slot.grad().to_vec(), [1., 2.]);
    }

    #[test]
    fn clear_after_step_reopens() {
        let slot = GradSlot::new(1, SlotPolicy::ClearAfterStep);
        slot.offer(0, &[1.]).unwrap();
        slot.release();

        assert!(!slot.is_full());
        assert!(slot.offer(1, &[2.]).unwrap());
        assert_eq!(slot.owner(), Some(1));
    }

    #[test]
    fn persist_keeps_owner() {
        let slot = GradSlot::new(1, SlotPolicy::Persist);
        slot.offer(2, &[1.]).unwrap();
        slot.release();

        assert!(slot.is_full());
        assert!(!slot.offer(0, &[7.]).unwrap());
        assert!(slot.offer(2, &[4.]).unwrap());
        assert_eq!(slot.grad().to_vec(), [4.]);
    }

    #[test]
    fn rejects_wrong_size() {
        let slot = GradSlot::new(2, SlotPolicy::default());
        assert!(slot.offer(0, &[1.]).is_err());
        assert!(!slot.is_full());
    }
}
