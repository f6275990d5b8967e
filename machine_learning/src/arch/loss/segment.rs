use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::{MlErr, Result};

/// A finished rollout segment of `L` steps.
///
/// Holds `L + 1` value estimates, the last one being the bootstrap value of the state right after
/// the segment, `[L, A]` log action probabilities, the chosen actions and the clipped rewards.
#[derive(Debug, Clone)]
pub struct Segment {
    values: Vec<f32>,
    log_probs: Array2<f32>,
    actions: Vec<usize>,
    rewards: Vec<f32>,
}

impl Segment {
    /// Creates a new `Segment`, validating the lengths of its parts.
    ///
    /// # Arguments
    /// * `values` - The `L + 1` value estimates.
    /// * `log_probs` - The `[L, A]` log probabilities.
    /// * `actions` - The `L` chosen actions.
    /// * `rewards` - The `L` clipped rewards.
    ///
    /// # Returns
    /// A new `Segment` or an error if the lengths don't agree or `L` is zero.
    pub fn new(
        values: Vec<f32>,
        log_probs: Array2<f32>,
        actions: Vec<usize>,
        rewards: Vec<f32>,
    ) -> Result<Self> {
        let len = rewards.len();

        if len == 0 {
            return Err(MlErr::EmptySegment);
        }

        let mismatch = |what, got| MlErr::SizeMismatch {
            what,
            got,
            expected: len,
        };

        if values.len() != len + 1 {
            return Err(MlErr::SizeMismatch {
                what: "segment values",
                got: values.len(),
                expected: len + 1,
            });
        }
        if log_probs.nrows() != len {
            return Err(mismatch("segment log probabilities", log_probs.nrows()));
        }
        if actions.len() != len {
            return Err(mismatch("segment actions", actions.len()));
        }
        if let Some(&action) = actions.iter().find(|&&a| a >= log_probs.ncols()) {
            return Err(MlErr::SizeMismatch {
                what: "action index",
                got: action,
                expected: log_probs.ncols(),
            });
        }

        Ok(Self {
            values,
            log_probs,
            actions,
            rewards,
        })
    }

    /// The amount of steps `L`.
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// The `L + 1` values, bootstrap included.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn bootstrap(&self) -> f32 {
        self.values[self.len()]
    }

    pub fn log_probs(&self) -> ArrayView2<'_, f32> {
        self.log_probs.view()
    }

    pub fn actions(&self) -> &[usize] {
        &self.actions
    }

    pub fn rewards(&self) -> &[f32] {
        &self.rewards
    }
}

/// Incrementally collects the steps of a segment while a worker rolls it out.
#[derive(Debug, Clone)]
pub struct SegmentBuilder {
    num_actions: usize,
    values: Vec<f32>,
    log_probs: Vec<f32>,
    actions: Vec<usize>,
    rewards: Vec<f32>,
}

impl SegmentBuilder {
    /// Creates a new `SegmentBuilder`.
    ///
    /// # Arguments
    /// * `num_actions` - The size of the action space.
    /// * `capacity` - The expected segment length.
    pub fn new(num_actions: usize, capacity: usize) -> Self {
        Self {
            num_actions,
            values: Vec::with_capacity(capacity + 1),
            log_probs: Vec::with_capacity(capacity * num_actions),
            actions: Vec::with_capacity(capacity),
            rewards: Vec::with_capacity(capacity),
        }
    }

    /// Records one step of the rollout.
    pub fn push(&mut self, value: f32, log_probs: ArrayView1<f32>, action: usize, reward: f32) {
        self.values.push(value);
        self.log_probs.extend(log_probs.iter());
        self.actions.push(action);
        self.rewards.push(reward);
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Closes the segment with the bootstrap value of the state after its last step.
    pub fn finish(mut self, bootstrap: f32) -> Result<Segment> {
        let len = self.len();
        let log_probs = Array2::from_shape_vec((len, self.num_actions), self.log_probs)?;

        self.values.push(bootstrap);
        Segment::new(self.values, log_probs, self.actions, self.rewards)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn builder() {
        let mut builder = SegmentBuilder::new(2, 2);
        builder.push(0.5, array![-0.1, -2.].view(), 0, 1.);
        builder.push(0.2, array![-3., -0.05].view(), 1, -1.);

        let segment = builder.finish(0.7).unwrap();
        assert_eq!(segment.len(), 2);
        assert_eq!(segment.values(), [0.5, 0.2, 0.7]);
        assert_eq!(segment.bootstrap(), 0.7);
        assert_eq!(segment.log_probs(), array![[-0.1, -2.], [-3., -0.05]]);
    }

    #[test]
    fn empty_builder() {
        let builder = SegmentBuilder::new(3, 4);
        assert!(matches!(builder.finish(0.), Err(MlErr::EmptySegment)));
    }

    #[test]
    fn action_out_of_range() {
        let log_probs = Array2::zeros((1, 2));
        assert!(Segment::new(vec![0., 0.], log_probs, vec![2], vec![0.]).is_err());
    }
}
