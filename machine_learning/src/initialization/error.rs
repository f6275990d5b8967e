use std::{
    error::Error,
    fmt::{self, Display},
};

use rand_distr::uniform::Error as UniformError;

/// The specific result type for the different instances of `RandParamGen` generators.
pub type Result<T> = std::result::Result<T, RandErr>;

/// Error returned by the `RandParamGen` constructors whenever the requested distribution can't
/// be built.
#[derive(Debug)]
pub struct RandErr(String);

impl From<UniformError> for RandErr {
    fn from(value: UniformError) -> Self {
        Self(value.to_string())
    }
}

impl Display for RandErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for RandErr {}
