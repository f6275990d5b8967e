use std::{fmt, io};

use machine_learning::{MlErr, checkpoint::CheckpointErr};
use parameter_server::SizeMismatchErr;
use tokio::task::JoinError;
use worker::{WorkerErr, env::EnvErr};

/// The orchestrator's result type.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// All errors that can occur in the orchestrator.
#[derive(Debug)]
pub enum OrchestratorError {
    /// Invalid configuration, caught before any worker starts.
    InvalidConfig(String),
    Io(io::Error),
    Json(serde_json::Error),
    Checkpoint(CheckpointErr),
    Model(MlErr),
    Store(SizeMismatchErr),
    Env(EnvErr),
    /// A worker stopped with an unrecoverable error.
    Worker { rank: usize, source: WorkerErr },
    /// A worker thread panicked or was cancelled.
    Join(JoinError),
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Json(e) => write!(f, "malformed config file: {e}"),
            Self::Checkpoint(e) => write!(f, "checkpoint error: {e}"),
            Self::Model(e) => write!(f, "model error: {e}"),
            Self::Store(e) => write!(f, "parameter store error: {e}"),
            Self::Env(e) => write!(f, "environment error: {e}"),
            Self::Worker { rank, source } => write!(f, "worker {rank} error: {source}"),
            Self::Join(e) => write!(f, "worker thread failed: {e}"),
        }
    }
}

impl std::error::Error for OrchestratorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidConfig(_) => None,
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Checkpoint(e) => Some(e),
            Self::Model(e) => Some(e),
            Self::Store(e) => Some(e),
            Self::Env(e) => Some(e),
            Self::Worker { source, .. } => Some(source),
            Self::Join(e) => Some(e),
        }
    }
}

impl From<io::Error> for OrchestratorError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for OrchestratorError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<CheckpointErr> for OrchestratorError {
    fn from(e: CheckpointErr) -> Self {
        Self::Checkpoint(e)
    }
}

impl From<MlErr> for OrchestratorError {
    fn from(e: MlErr) -> Self {
        Self::Model(e)
    }
}

impl From<SizeMismatchErr> for OrchestratorError {
    fn from(e: SizeMismatchErr) -> Self {
        Self::Store(e)
    }
}

impl From<EnvErr> for OrchestratorError {
    fn from(e: EnvErr) -> Self {
        Self::Env(e)
    }
}

impl From<JoinError> for OrchestratorError {
    fn from(e: JoinError) -> Self {
        Self::Join(e)
    }
}
