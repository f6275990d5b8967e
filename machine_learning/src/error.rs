use std::{
    error::Error,
    fmt::{self, Display},
};

use ndarray::ShapeError;

use crate::initialization::RandErr;

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    Shape(ShapeError),
    Init(RandErr),
    EmptySegment,
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch in {what}, got {got} and expected {expected}"
            ),
            MlErr::Shape(e) => write!(f, "Failed to view a parameter slice: {e}"),
            MlErr::Init(e) => write!(f, "Failed to create a parameter generator: {e}"),
            MlErr::EmptySegment => f.write_str("A rollout segment needs at least one step"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Shape(e) => Some(e),
            MlErr::Init(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShapeError> for MlErr {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}

impl From<RandErr> for MlErr {
    fn from(value: RandErr) -> Self {
        Self::Init(value)
    }
}
