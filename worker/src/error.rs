use std::{error::Error, fmt, io};

use machine_learning::{MlErr, checkpoint::CheckpointErr};
use parameter_server::SizeMismatchErr;

use crate::env::EnvErr;

/// The worker module's result type.
pub type Result<T> = std::result::Result<T, WorkerErr>;

/// Failures that terminate a worker.
#[derive(Debug)]
pub enum WorkerErr {
    Env(EnvErr),
    Checkpoint(CheckpointErr),
    Model(MlErr),
    Store(SizeMismatchErr),
    Io(io::Error),
}

impl fmt::Display for WorkerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerErr::Env(e) => write!(f, "environment error: {e}"),
            WorkerErr::Checkpoint(e) => write!(f, "checkpoint error: {e}"),
            WorkerErr::Model(e) => write!(f, "model error: {e}"),
            WorkerErr::Store(e) => write!(f, "parameter store error: {e}"),
            WorkerErr::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for WorkerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorkerErr::Env(e) => Some(e),
            WorkerErr::Checkpoint(e) => Some(e),
            WorkerErr::Model(e) => Some(e),
            WorkerErr::Store(e) => Some(e),
            WorkerErr::Io(e) => Some(e),
        }
    }
}

impl From<EnvErr> for WorkerErr {
    fn from(value: EnvErr) -> Self {
        Self::Env(value)
    }
}

impl From<CheckpointErr> for WorkerErr {
    fn from(value: CheckpointErr) -> Self {
        Self::Checkpoint(value)
    }
}

impl From<MlErr> for WorkerErr {
    fn from(value: MlErr) -> Self {
        Self::Model(value)
    }
}

impl From<SizeMismatchErr> for WorkerErr {
    fn from(value: SizeMismatchErr) -> Self {
        Self::Store(value)
    }
}

impl From<io::Error> for WorkerErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
