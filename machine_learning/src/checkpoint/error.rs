use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use safetensors::SafeTensorError;

/// The result type of the checkpoint module.
pub type Result<T> = std::result::Result<T, CheckpointErr>;

/// Failures reading or writing checkpoint files.
#[derive(Debug)]
pub enum CheckpointErr {
    Io(io::Error),
    Format(SafeTensorError),
    MissingTensor(String),
    TensorShape {
        name: String,
        got: Vec<usize>,
        expected: Vec<usize>,
    },
    Dtype(String),
}

impl Display for CheckpointErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "checkpoint io error: {e}"),
            Self::Format(e) => write!(f, "malformed checkpoint: {e}"),
            Self::MissingTensor(name) => write!(f, "checkpoint is missing tensor {name}"),
            Self::TensorShape {
                name,
                got,
                expected,
            } => write!(
                f,
                "checkpoint tensor {name} has shape {got:?}, expected {expected:?}"
            ),
            Self::Dtype(name) => write!(f, "checkpoint tensor {name} isn't stored as f32"),
        }
    }
}

impl Error for CheckpointErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Format(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CheckpointErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<SafeTensorError> for CheckpointErr {
    fn from(value: SafeTensorError) -> Self {
        Self::Format(value)
    }
}
