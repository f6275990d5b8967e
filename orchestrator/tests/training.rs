use std::{env, fs, path::PathBuf};

use machine_learning::checkpoint;
use orchestrator::{
    OrchestratorError, Session, train,
    configs::{ModelConfig, TrainingConfig},
};

fn scratch(name: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!("a3c-session-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn small(env: &str, run_root: PathBuf) -> TrainingConfig {
    TrainingConfig {
        env: env.into(),
        processes: 1,
        segment_len: 5,
        max_frames: 1_000,
        checkpoint_every: 0,
        model: ModelConfig {
            hidden_size: 16,
            lstm_size: 16,
        },
        run_root,
        ..Default::default()
    }
}

#[test]
fn hogwild_workers_learn_target() {
    let _ = env_logger::builder().is_test(true).try_init();
    let root = scratch("learn");

    let config = TrainingConfig {
        processes: 2,
        lr: 5e-3,
        max_frames: 30_000,
        ..small("target-v0", root.clone())
    };
    let summary = train(config).unwrap();

    assert!(summary.is_success(), "{:?}", summary.failures);
    assert_eq!(summary.reports.len(), 2);
    assert!(summary.snapshot.frames >= 30_000);
    // A random policy averages 0 per episode, a perfect one 10.
    assert!(
        summary.snapshot.run_reward > 2.,
        "run reward {}",
        summary.snapshot.run_reward
    );

    fs::remove_dir_all(root).unwrap();
}

#[test]
fn resumes_from_latest_checkpoint() {
    let root = scratch("resume");
    let config = TrainingConfig {
        segment_len: 2,
        max_frames: 200,
        checkpoint_every: 50,
        lr: 1e-3,
        ..small("alternating-v0", root.clone())
    };

    let session = Session::new(config.clone()).unwrap();
    assert_eq!(session.resumed_from(), None);
    let run_dir = session.run_dir().to_path_buf();
    let layout = session.store().layout().clone();
    let summary = session.wait();

    assert!(summary.is_success());
    assert_eq!(summary.snapshot.episodes, 100);
    assert!(run_dir.join("model.50.safetensors").exists());

    let session = Session::new(config).unwrap();
    let (episodes, params) = checkpoint::load_latest(&run_dir, &layout).unwrap().unwrap();
    assert_eq!(episodes, 100);
    assert_eq!(session.resumed_from(), Some(100));
    assert_eq!(session.counters().episodes(), 100);
    assert_eq!(session.store().snapshot(), params);

    let summary = session.wait();
    assert_eq!(summary.snapshot.episodes, 200);
    assert_eq!(
        checkpoint::latest(&run_dir).unwrap().map(|(n, _)| n),
        Some(200)
    );

    let log = fs::read_to_string(run_dir.join("log.txt")).unwrap();
    assert_eq!(log.lines().filter(|l| l.ends_with("saved model")).count(), 4);

    fs::remove_dir_all(root).unwrap();
}

#[test]
fn test_mode_runs_single_frozen_worker() {
    let root = scratch("test-mode");
    let config = TrainingConfig {
        processes: 4,
        test: true,
        lr: 1e-2,
        // The untrained greedy policy may never reach the goal.
        max_episode_len: 20,
        ..small("corridor-v0", root.clone())
    };

    let session = Session::new(config).unwrap();
    assert_eq!(session.config().processes, 1);
    assert_eq!(session.config().lr, 0.);
    assert_eq!(session.run_dir(), root.join("corridor-v0"));

    let before = session.store().snapshot();
    let store = session.store().clone();
    let summary = session.wait();

    assert!(summary.is_success());
    assert_eq!(summary.reports.len(), 1);
    assert_eq!(store.snapshot(), before);

    fs::remove_dir_all(root).unwrap();
}

#[test]
fn invalid_config_never_starts() {
    let root = scratch("invalid");
    let config = TrainingConfig {
        env: "Pong-v4".into(),
        ..small("target-v0", root.clone())
    };

    assert!(matches!(
        Session::new(config),
        Err(OrchestratorError::InvalidConfig(_))
    ));
    assert!(!root.join("pong-v4").exists());

    fs::remove_dir_all(root).unwrap();
}
