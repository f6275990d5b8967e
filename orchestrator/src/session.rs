use std::{
    cell::RefCell,
    fs,
    path::Path,
    rc::Rc,
    sync::Arc,
    time::{Duration, Instant},
};

use machine_learning::{arch::PolicyNet, checkpoint, preprocess::Identity};
use parameter_server::{CounterSnapshot, GlobalCounters, ParameterStore, optimization::Adam};
use rand::{SeedableRng, rngs::StdRng};
use tokio::{runtime::Runtime, signal, task::JoinSet};
use worker::{Shared, StatusLog, Worker, WorkerConfig, WorkerReport, env};

use crate::{
    configs::{Adapter, TrainingConfig},
    error::{OrchestratorError, Result},
};

type WorkerSet = JoinSet<(usize, worker::Result<WorkerReport>)>;

/// How a training session ended.
#[derive(Debug)]
pub struct Summary {
    pub snapshot: CounterSnapshot,
    pub reports: Vec<WorkerReport>,
    pub failures: Vec<OrchestratorError>,
}

impl Summary {
    /// The ranks of the workers that stopped with an error, in ascending order.
    pub fn failed_ranks(&self) -> Vec<usize> {
        let mut ranks: Vec<_> = self
            .failures
            .iter()
            .filter_map(|e| match e {
                OrchestratorError::Worker { rank, .. } => Some(*rank),
                _ => None,
            })
            .collect();

        ranks.sort_unstable();
        ranks
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Represents a training run: the shared state every worker plays against.
///
/// Creating it builds the canonical network once, picking up the latest checkpoint of the run
/// directory if there's one. Waiting on it runs the workers until the frame budget is spent.
pub struct Session {
    runtime: Runtime,
    config: TrainingConfig,
    net: PolicyNet,
    shared: Shared<Adam>,
    worker_config: WorkerConfig,
    resumed_from: Option<u64>,
}

impl Session {
    /// Creates a new `Session`.
    ///
    /// # Arguments
    /// * `config` - The run's configuration, validated and resolved here.
    ///
    /// # Returns
    /// A new `Session` instance or the error that prevented building the shared state.
    pub fn new(config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        let config = config.resolve();
        let worker_config = Adapter::worker_config(&config)?;

        let runtime = Runtime::new()?;
        let run_dir = config.run_dir();
        fs::create_dir_all(&run_dir)?;

        let probe = env::make(&config.env, config.seed)?;
        let spec = Adapter::net_spec(&config, probe.observation_size(), probe.num_actions());
        let net = PolicyNet::new(spec);

        let rng = Rc::new(RefCell::new(StdRng::seed_from_u64(config.seed)));
        let param_gen = net.param_gen(rng)?;
        let lr = config.lr;
        let store = ParameterStore::new(
            net.layout().clone(),
            config.slot_policy.into(),
            param_gen,
            |len| Adam::with_lr(len, lr),
        )?;

        let log = StatusLog::new(
            &run_dir,
            Instant::now(),
            Duration::from_secs(config.log_interval_secs),
        );

        let resumed_from = match checkpoint::load_latest(&run_dir, store.layout())? {
            Some((episodes, params)) => {
                store.assign(&params)?;
                Some(episodes)
            }
            None => {
                log.truncate()?;
                None
            }
        };

        let counters = Arc::new(GlobalCounters::resume(
            config.running_decay,
            resumed_from.unwrap_or(0),
        ));

        log::info!(
            env = config.env.as_str(),
            workers = config.processes,
            params = store.len(),
            test = config.test;
            "session ready in {}",
            run_dir.display()
        );

        Ok(Self {
            runtime,
            config,
            net,
            shared: Shared {
                store,
                counters,
                run_dir,
                log,
            },
            worker_config,
            resumed_from,
        })
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn store(&self) -> &ParameterStore<Adam> {
        &self.shared.store
    }

    pub fn counters(&self) -> &GlobalCounters {
        &self.shared.counters
    }

    pub fn run_dir(&self) -> &Path {
        &self.shared.run_dir
    }

    /// The episode count of the checkpoint this session started from, if any.
    pub fn resumed_from(&self) -> Option<u64> {
        self.resumed_from
    }

    /// Runs every worker and waits until the whole training is finished.
    ///
    /// # Returns
    /// The final counters, every worker's report and the failures of the others.
    pub fn wait(self) -> Summary {
        let mut failures = Vec::new();
        let set = self.spawn_workers(&mut failures);
        let counters = Arc::clone(&self.shared.counters);

        let reports = self
            .runtime
            .block_on(Self::join_workers(set, &mut failures));

        Self::summarize(&counters, reports, failures)
    }

    /// Like `wait`, but gives up on the workers once the process receives a ctrl-c.
    ///
    /// # Returns
    /// The `Summary` or `None` if training was interrupted.
    pub fn wait_or_interrupt(self) -> Option<Summary> {
        let mut failures = Vec::new();
        let set = self.spawn_workers(&mut failures);
        let counters = Arc::clone(&self.shared.counters);

        let reports = self.runtime.block_on(async {
            tokio::select! {
                reports = Self::join_workers(set, &mut failures) => Some(reports),
                Ok(()) = signal::ctrl_c() => None,
            }
        });

        match reports {
            Some(reports) => Some(Self::summarize(&counters, reports, failures)),
            None => {
                log::warn!(
                    frames = counters.frames(),
                    episodes = counters.episodes();
                    "training interrupted"
                );
                // The workers are blocking threads, they can't be cancelled.
                self.runtime.shutdown_background();
                None
            }
        }
    }

    /// Builds every worker and starts it on its own blocking thread.
    ///
    /// Workers whose environment can't be created are recorded as failures and never started.
    fn spawn_workers(&self, failures: &mut Vec<OrchestratorError>) -> WorkerSet {
        let mut set = JoinSet::new();

        for rank in 0..self.config.processes {
            let env = match env::make(&self.config.env, self.config.seed.wrapping_add(rank as u64)) {
                Ok(env) => env,
                Err(e) => {
                    log::error!(rank = rank; "failed to create the environment: {e}");
                    failures.push(OrchestratorError::Worker {
                        rank,
                        source: e.into(),
                    });
                    continue;
                }
            };

            let worker = Worker::new(
                rank,
                self.worker_config.clone(),
                self.net.clone(),
                env,
                Identity,
                self.shared.clone(),
            );

            set.spawn_blocking_on(move || (rank, worker.run()), self.runtime.handle());
        }

        set
    }

    /// Joins every worker, a failed worker doesn't stop the others.
    async fn join_workers(
        mut set: WorkerSet,
        failures: &mut Vec<OrchestratorError>,
    ) -> Vec<WorkerReport> {
        let mut reports = Vec::new();

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, Ok(report))) => reports.push(report),
                Ok((rank, Err(source))) => {
                    log::error!(rank = rank; "worker failed: {source}");
                    failures.push(OrchestratorError::Worker { rank, source });
                }
                Err(e) => {
                    log::error!("worker thread failed: {e}");
                    failures.push(e.into());
                }
            }
        }

        reports.sort_unstable_by_key(|r| r.rank);
        reports
    }

    fn summarize(
        counters: &GlobalCounters,
        reports: Vec<WorkerReport>,
        failures: Vec<OrchestratorError>,
    ) -> Summary {
        let snapshot = counters.snapshot();

        log::info!(
            frames = snapshot.frames,
            episodes = snapshot.episodes,
            run_reward = snapshot.run_reward,
            run_loss = snapshot.run_loss,
            failed = failures.len();
            "training finished"
        );

        Summary {
            snapshot,
            reports,
            failures,
        }
    }
}
