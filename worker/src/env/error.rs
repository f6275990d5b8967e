use std::{
    error::Error,
    fmt::{self, Display},
};

/// Failures coming from an environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvErr {
    UnknownEnv(String),
    InvalidAction { action: usize, num_actions: usize },
    Simulator(String),
}

impl Display for EnvErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownEnv(id) => write!(f, "unknown environment {id:?}"),
            Self::InvalidAction {
                action,
                num_actions,
            } => write!(
                f,
                "action {action} is out of range for {num_actions} actions"
            ),
            Self::Simulator(detail) => write!(f, "simulator failure: {detail}"),
        }
    }
}

impl Error for EnvErr {}
