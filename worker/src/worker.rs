use std::{path::PathBuf, sync::Arc};

use log::{debug, info};
use machine_learning::{
    arch::{
        Categorical, PolicyNet, RecurrentState,
        loss::{ActorCriticLoss, Cost, SegmentBuilder},
    },
    checkpoint,
    optimization::clip_grad_norm,
    preprocess::Preprocess,
};
use ndarray::Array1;
use parameter_server::{GlobalCounters, ParameterStore, optimization::Optimizer};
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    WorkerConfig,
    env::Environment,
    error::Result,
    metrics::{EpisodeStats, StatusLog, WorkerReport},
};

/// The state every worker shares with the others.
pub struct Shared<O: Optimizer> {
    pub store: ParameterStore<O>,
    pub counters: Arc<GlobalCounters>,
    pub run_dir: PathBuf,
    pub log: StatusLog,
}

impl<O: Optimizer> Clone for Shared<O> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            counters: Arc::clone(&self.counters),
            run_dir: self.run_dir.clone(),
            log: self.log.clone(),
        }
    }
}

/// A single actor-learner.
///
/// It plays its own environment with a private copy of the canonical parameters and pushes the
/// resulting gradients into the shared store, without ever waiting on other workers.
pub struct Worker<E, P, O>
where
    E: Environment,
    P: Preprocess<E::Observation>,
    O: Optimizer,
{
    rank: usize,
    config: WorkerConfig,
    net: PolicyNet,
    loss: ActorCriticLoss,
    env: E,
    preprocess: P,
    shared: Shared<O>,
    rng: StdRng,
}

/// The recurrent context a worker carries from one segment to the next.
struct Rollout {
    params: Vec<f32>,
    grad: Vec<f32>,
    obs: Array1<f32>,
    state: RecurrentState,
    episode: EpisodeStats,
    done: bool,
}

impl<E, P, O> Worker<E, P, O>
where
    E: Environment,
    P: Preprocess<E::Observation>,
    O: Optimizer,
{
    /// Creates a new `Worker`.
    ///
    /// # Arguments
    /// * `rank` - The worker's index, rank 0 writes the status lines.
    /// * `config` - The loop's hyperparameters.
    /// * `net` - The network, its layout must match the store's.
    /// * `env` - The worker's own environment.
    /// * `preprocess` - The observation transform.
    /// * `shared` - The canonical parameters, counters and run directory.
    ///
    /// # Returns
    /// A new `Worker` instance.
    pub fn new(
        rank: usize,
        config: WorkerConfig,
        net: PolicyNet,
        env: E,
        preprocess: P,
        shared: Shared<O>,
    ) -> Self {
        let rng = StdRng::seed_from_u64(config.seed.wrapping_add(rank as u64));
        let loss = ActorCriticLoss::new(config.gamma, config.tau);

        Self {
            rank,
            config,
            net,
            loss,
            env,
            preprocess,
            shared,
            rng,
        }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Runs segments until the global frame count reaches its ceiling.
    ///
    /// # Returns
    /// What this worker did, or the error that stopped it.
    pub fn run(mut self) -> Result<WorkerReport> {
        info!(rank = self.rank; "worker started");

        let mut rollout = self.start()?;

        let mut report = WorkerReport {
            rank: self.rank,
            ..Default::default()
        };

        while self.shared.counters.frames() < self.config.max_frames {
            let (cost, episodes) = self.segment(&mut rollout)?;
            report.segments += 1;
            report.episodes += episodes;

            debug!(
                rank = self.rank,
                total = cost.total;
                "segment done"
            );
        }

        info!(rank = self.rank, segments = report.segments; "worker finished");
        Ok(report)
    }

    /// Resets the environment and builds the context of the first segment.
    fn start(&mut self) -> Result<Rollout> {
        let size = self.net.size();
        let obs = self.env.reset()?;

        Ok(Rollout {
            params: vec![0.; size],
            grad: vec![0.; size],
            obs: self.preprocess.apply(&obs),
            state: RecurrentState::zeros(self.net.spec().lstm_size),
            episode: EpisodeStats::default(),
            done: true,
        })
    }

    /// Pulls the canonical parameters. A segment following a finished episode starts from a zero
    /// state, otherwise it carries on from the previous segment's last state.
    fn begin_segment(&self, rollout: &mut Rollout) -> Result<()> {
        self.shared.store.pull_params(&mut rollout.params)?;
        if rollout.done {
            rollout.state = RecurrentState::zeros(self.net.spec().lstm_size);
        }

        Ok(())
    }

    /// Rolls out one segment and applies its update.
    ///
    /// # Returns
    /// The segment's loss and the amount of episodes it finished.
    fn segment(&mut self, rollout: &mut Rollout) -> Result<(Cost, u64)> {
        let len = self.config.segment_len.get();
        let num_actions = self.net.spec().num_actions;

        self.begin_segment(rollout)?;

        let mut builder = SegmentBuilder::new(num_actions, len);
        let mut caches = Vec::with_capacity(len);
        let mut finished = 0;

        for _ in 0..len {
            rollout.episode.length += 1;

            let (out, cache) = self
                .net
                .forward(&rollout.params, rollout.obs.view(), &rollout.state)?;
            let dist = Categorical::from_logits(out.logits.view());
            let action = if self.config.test {
                dist.argmax()
            } else {
                dist.sample(&mut self.rng)
            };

            let transition = self.env.step(action)?;
            if self.config.render {
                self.env.render();
            }

            rollout.obs = self.preprocess.apply(&transition.observation);
            let reward = transition.reward.clamp(-1., 1.);
            rollout.episode.reward += reward;
            rollout.done =
                transition.done || rollout.episode.length >= self.config.max_episode_len;
            rollout.state = out.state;

            if rollout.done {
                self.finish_episode(rollout.episode)?;
                rollout.episode = EpisodeStats::default();
                let obs = self.env.reset()?;
                rollout.obs = self.preprocess.apply(&obs);
                finished += 1;
            }

            builder.push(out.value, dist.log_probs(), action, reward);
            caches.push(cache);
        }

        let bootstrap = if rollout.done {
            0.
        } else {
            self.net
                .value(&rollout.params, rollout.obs.view(), &rollout.state)?
        };

        let segment = builder.finish(bootstrap)?;
        let targets = self.loss.targets(&segment);
        let cost = self.loss.cost_with(&segment, &targets);
        let cost_grad = self.loss.grad(&segment, &targets);
        rollout.episode.loss += cost.total;

        rollout.grad.fill(0.);
        self.net.backward(
            &rollout.params,
            &mut rollout.grad,
            &caches,
            &cost_grad.d_values,
            cost_grad.d_logits.view(),
        )?;
        clip_grad_norm(&mut rollout.grad, self.config.grad_clip);

        self.shared.store.offer_grads(self.rank, &rollout.grad)?;
        self.shared.store.step()?;

        Ok((cost, finished))
    }

    /// Publishes a finished episode, maybe writing a status line and a checkpoint.
    fn finish_episode(&mut self, episode: EpisodeStats) -> Result<()> {
        let counters = &self.shared.counters;
        let episodes = counters.finish_episode(episode.length, episode.reward, episode.loss);

        if self.rank == 0 && self.shared.log.is_due() {
            self.shared.log.report(&counters.snapshot())?;
        }

        let every = self.config.checkpoint_every;
        if every > 0 && episodes % every == 0 {
            let params = self.shared.store.snapshot();
            checkpoint::save(
                &self.shared.run_dir,
                episodes,
                self.shared.store.layout(),
                &params,
            )?;
            self.shared
                .log
                .write(&format!("\tepisode {episodes}: saved model"))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        num::NonZeroUsize,
        time::{Duration, Instant},
    };

    use machine_learning::{arch::NetSpec, initialization::ConstParamGen, preprocess::Identity};
    use parameter_server::{SlotPolicy, optimization::Adam};

    use super::*;
    use crate::env::{self, BoxedEnv};

    /// A frozen worker with random parameters.
    fn frozen(env_id: &str, segment_len: usize) -> Worker<BoxedEnv, Identity, Adam> {
        let env = env::make(env_id, 0).unwrap();
        let net = PolicyNet::new(NetSpec {
            obs_size: env.observation_size(),
            hidden_size: 4,
            lstm_size: 3,
            num_actions: env.num_actions(),
        });

        let store = ParameterStore::new(
            net.layout().clone(),
            SlotPolicy::ClearAfterStep,
            ConstParamGen::zeros(net.size()),
            |len| Adam::with_lr(len, 0.),
        )
        .unwrap();
        store.assign(&net.init_params(7).unwrap()).unwrap();

        let run_dir = std::env::temp_dir();
        let shared = Shared {
            store,
            counters: Arc::new(GlobalCounters::default()),
            log: StatusLog::new(&run_dir, Instant::now(), Duration::from_secs(60)),
            run_dir,
        };

        let config = WorkerConfig {
            segment_len: NonZeroUsize::new(segment_len).unwrap(),
            checkpoint_every: 0,
            ..Default::default()
        };

        Worker::new(0, config, net, env, Identity, shared)
    }

    #[test]
    fn first_segment_starts_from_zero_state() {
        let mut worker = frozen("target-v0", 5);
        let mut rollout = worker.start().unwrap();

        assert!(rollout.done);
        worker.begin_segment(&mut rollout).unwrap();
        assert!(rollout.state.is_zero());
        assert_eq!(rollout.params, worker.shared.store.snapshot());
    }

    #[test]
    fn state_carries_over_until_an_episode_ends() {
        // Episodes of target-v0 last 10 steps, the second segment of 5 ends one.
        let mut worker = frozen("target-v0", 5);
        let mut rollout = worker.start().unwrap();

        worker.segment(&mut rollout).unwrap();
        assert!(!rollout.done);
        assert!(!rollout.state.is_zero());

        let carried = rollout.state.clone();
        worker.begin_segment(&mut rollout).unwrap();
        assert_eq!(rollout.state, carried);

        worker.segment(&mut rollout).unwrap();
        assert!(rollout.done);
        assert!(!rollout.state.is_zero());
        assert_eq!(worker.shared.counters.episodes(), 1);

        worker.begin_segment(&mut rollout).unwrap();
        assert!(rollout.state.is_zero());
    }
}
