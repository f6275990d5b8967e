use std::{cell::RefCell, ops::Range, rc::Rc};

use ndarray::prelude::*;
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::{
    ParamLayout,
    activations::ActFn,
    layers::{Dense, LstmCache, LstmCell},
};
use crate::{
    MlErr, Result,
    initialization::{ChainedParamGen, ParamGen, RandParamGen},
};

/// The dimensions of a `PolicyNet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetSpec {
    pub obs_size: usize,
    pub hidden_size: usize,
    pub lstm_size: usize,
    pub num_actions: usize,
}

/// The `(hidden, cell)` pair carried by the LSTM between steps.
///
/// It's plain numeric data, no gradient ever flows into the state a segment starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrentState {
    hidden: Array1<f32>,
    cell: Array1<f32>,
}

impl RecurrentState {
    /// Creates an all zero state of the given width.
    pub fn zeros(width: usize) -> Self {
        Self {
            hidden: Array1::zeros(width),
            cell: Array1::zeros(width),
        }
    }

    pub fn hidden(&self) -> ArrayView1<'_, f32> {
        self.hidden.view()
    }

    pub fn cell(&self) -> ArrayView1<'_, f32> {
        self.cell.view()
    }

    pub fn is_zero(&self) -> bool {
        self.hidden.iter().chain(&self.cell).all(|&x| x == 0.)
    }
}

/// The result of a single forward pass.
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub value: f32,
    pub logits: Array1<f32>,
    pub state: RecurrentState,
}

/// Intermediate values of a forward pass kept for backpropagation.
#[derive(Debug, Clone)]
pub struct StepCache {
    obs: Array1<f32>,
    enc_z: Array1<f32>,
    lstm: LstmCache,
    h: Array1<f32>,
}

/// The recurrent actor-critic network.
///
/// `observation -> dense(elu) -> lstm -> (critic, actor)`. The network itself is stateless: its
/// parameters are always given as a flat slice following `PolicyNet::layout`.
#[derive(Debug, Clone)]
pub struct PolicyNet {
    spec: NetSpec,
    layout: ParamLayout,
    bounds: Vec<f32>,
    encoder: Dense,
    lstm: LstmCell,
    critic: Dense,
    actor: Dense,
    ranges: [Range<usize>; 4],
}

impl PolicyNet {
    /// Creates a new `PolicyNet`.
    ///
    /// # Arguments
    /// * `spec` - The network's dimensions.
    ///
    /// # Returns
    /// A new `PolicyNet` instance.
    pub fn new(spec: NetSpec) -> Self {
        let NetSpec {
            obs_size: n,
            hidden_size: e,
            lstm_size: h,
            num_actions: a,
        } = spec;

        let mut layout = ParamLayout::new();
        let mut bounds = Vec::new();
        let enc_k = 1. / (n as f32).sqrt();
        let rec_k = 1. / (h as f32).sqrt();

        let mut push = |name: &str, shape: &[usize], k: f32| {
            bounds.push(k);
            layout.push(name, shape)
        };

        let enc_start = push("encoder.weight", &[n, e], enc_k).start;
        let enc = enc_start..push("encoder.bias", &[e], enc_k).end;

        let lstm_start = push("lstm.weight_ih", &[e, 4 * h], rec_k).start;
        push("lstm.weight_hh", &[h, 4 * h], rec_k);
        let lstm = lstm_start..push("lstm.bias", &[4 * h], rec_k).end;

        let critic_start = push("critic.weight", &[h, 1], rec_k).start;
        let critic = critic_start..push("critic.bias", &[1], rec_k).end;

        let actor_start = push("actor.weight", &[h, a], rec_k).start;
        let actor = actor_start..push("actor.bias", &[a], rec_k).end;

        Self {
            spec,
            layout,
            bounds,
            encoder: Dense::new((n, e), Some(ActFn::elu(1.))),
            lstm: LstmCell::new(e, h),
            critic: Dense::new((h, 1), None),
            actor: Dense::new((h, a), None),
            ranges: [enc, lstm, critic, actor],
        }
    }

    pub fn spec(&self) -> NetSpec {
        self.spec
    }

    pub fn layout(&self) -> &ParamLayout {
        &self.layout
    }

    /// Returns the amount of parameters in the network.
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    /// Builds the parameter generator used to initialize the network.
    ///
    /// Every tensor is drawn from `U(-k, k)` with `k = 1/sqrt(fan_in)`, the recurrent cell and
    /// the heads use the cell's width as their fan in.
    ///
    /// # Arguments
    /// * `rng` - The random number generator shared by every tensor.
    ///
    /// # Returns
    /// A chained generator yielding the whole parameter vector in layout order.
    pub fn param_gen<R: Rng + 'static>(&self, rng: Rc<RefCell<R>>) -> Result<ChainedParamGen> {
        let param_gens = self
            .layout
            .tensors()
            .iter()
            .zip(&self.bounds)
            .map(|(tensor, &k)| {
                let param_gen = RandParamGen::uniform(Rc::clone(&rng), tensor.len(), -k, k)?;
                Ok(Box::new(param_gen) as Box<dyn ParamGen>)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ChainedParamGen::new(param_gens))
    }

    /// Draws a fresh parameter vector from a seeded generator.
    pub fn init_params(&self, seed: u64) -> Result<Vec<f32>> {
        let rng = Rc::new(RefCell::new(StdRng::seed_from_u64(seed)));
        let mut param_gen = self.param_gen(rng)?;
        param_gen
            .sample_exact(self.size())
            .ok_or(MlErr::SizeMismatch {
                what: "initial parameters",
                got: 0,
                expected: self.size(),
            })
    }

    /// Makes a forward pass through the network.
    ///
    /// # Arguments
    /// * `params` - The network's parameters.
    /// * `obs` - The preprocessed observation.
    /// * `state` - The recurrent state coming from the previous step.
    ///
    /// # Returns
    /// The value estimate, the action logits, the next recurrent state and the cache for
    /// `PolicyNet::backward`.
    pub fn forward(
        &self,
        params: &[f32],
        obs: ArrayView1<f32>,
        state: &RecurrentState,
    ) -> Result<(StepOutput, StepCache)> {
        let [enc_p, lstm_p, critic_p, actor_p] = self.split_params(params)?;

        let (enc_z, x) = self.encoder.forward(enc_p, obs)?;
        let (h, c, lstm) = self
            .lstm
            .forward(lstm_p, x.view(), state.hidden(), state.cell())?;
        let (_, value) = self.critic.forward(critic_p, h.view())?;
        let (_, logits) = self.actor.forward(actor_p, h.view())?;

        let output = StepOutput {
            value: value[0],
            logits,
            state: RecurrentState {
                hidden: h.clone(),
                cell: c,
            },
        };

        let cache = StepCache {
            obs: obs.to_owned(),
            enc_z,
            lstm,
            h,
        };

        Ok((output, cache))
    }

    /// Returns the value estimate of `obs` without keeping anything for backpropagation.
    pub fn value(&self, params: &[f32], obs: ArrayView1<f32>, state: &RecurrentState) -> Result<f32> {
        self.forward(params, obs, state).map(|(output, _)| output.value)
    }

    /// Backpropagates through a whole segment of forward steps.
    ///
    /// The gradient is **accumulated** into `grad`, so it has to be zeroed beforehand. The state
    /// the segment started from is treated as a constant.
    ///
    /// # Arguments
    /// * `params` - The network's parameters used on the forward passes.
    /// * `grad` - The gradient buffer.
    /// * `caches` - The caches of every step, in order.
    /// * `d_values` - The derivative of the loss with respect to each step's value.
    /// * `d_logits` - The derivative of the loss with respect to each step's logits.
    pub fn backward(
        &self,
        params: &[f32],
        grad: &mut [f32],
        caches: &[StepCache],
        d_values: &[f32],
        d_logits: ArrayView2<f32>,
    ) -> Result<()> {
        if d_values.len() != caches.len() || d_logits.nrows() != caches.len() {
            return Err(MlErr::SizeMismatch {
                what: "segment derivatives",
                got: d_values.len().min(d_logits.nrows()),
                expected: caches.len(),
            });
        }

        let [enc_p, lstm_p, critic_p, actor_p] = self.split_params(params)?;
        let [enc_g, lstm_g, critic_g, actor_g] = self.split_grad(grad)?;

        let width = self.lstm.hidden();
        let mut dh_next = Array1::zeros(width);
        let mut dc_next = Array1::zeros(width);

        for (t, cache) in caches.iter().enumerate().rev() {
            // The heads are linear, their pre-activation is never read.
            let h = cache.h.view();
            let dh_critic = self
                .critic
                .backward(critic_p, critic_g, h, h, array![d_values[t]])?;
            let dh_actor = self
                .actor
                .backward(actor_p, actor_g, h, h, d_logits.row(t).to_owned())?;

            let dh = dh_critic + dh_actor + &dh_next;
            let (dx, dh_prev, dc_prev) =
                self.lstm
                    .backward(lstm_p, lstm_g, &cache.lstm, dh.view(), dc_next.view())?;

            self.encoder.backward(
                enc_p,
                enc_g,
                cache.obs.view(),
                cache.enc_z.view(),
                dx,
            )?;

            dh_next = dh_prev;
            dc_next = dc_prev;
        }

        Ok(())
    }

    fn split_params<'a>(&self, params: &'a [f32]) -> Result<[&'a [f32]; 4]> {
        self.check(params.len())?;
        Ok(self.ranges.clone().map(|range| &params[range]))
    }

    fn split_grad<'a>(&self, grad: &'a mut [f32]) -> Result<[&'a mut [f32]; 4]> {
        self.check(grad.len())?;

        let (enc, rest) = grad.split_at_mut(self.ranges[0].len());
        let (lstm, rest) = rest.split_at_mut(self.ranges[1].len());
        let (critic, actor) = rest.split_at_mut(self.ranges[2].len());
        Ok([enc, lstm, critic, actor])
    }

    fn check(&self, len: usize) -> Result<()> {
        if len != self.size() {
            return Err(MlErr::SizeMismatch {
                what: "network parameters",
                got: len,
                expected: self.size(),
            });
        }

        Ok(())
    }
}
