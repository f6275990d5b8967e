use std::{env, path::PathBuf, process::ExitCode};

use orchestrator::{Result, Session, configs::TrainingConfig};

fn load_config() -> Result<TrainingConfig> {
    let path = env::args()
        .nth(1)
        .or_else(|| env::var(TrainingConfig::CONFIG_VAR).ok())
        .map(PathBuf::from);

    let config = match path {
        Some(path) => {
            log::info!("reading config from {}", path.display());
            TrainingConfig::from_json_file(&path)?
        }
        None => TrainingConfig::default(),
    };

    config.with_env_overrides(|var| env::var(var).ok())
}

fn main() -> ExitCode {
    env_logger::init();

    let session = match load_config().and_then(Session::new) {
        Ok(session) => session,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(episodes) = session.resumed_from() {
        log::info!(episodes = episodes; "resuming training");
    }

    let Some(summary) = session.wait_or_interrupt() else {
        return ExitCode::FAILURE;
    };

    for report in &summary.reports {
        log::info!(
            rank = report.rank,
            segments = report.segments,
            episodes = report.episodes;
            "worker report"
        );
    }

    if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        log::error!("failed workers: {:?}", summary.failed_ranks());
        ExitCode::FAILURE
    }
}
