use std::{
    error::Error,
    fmt::{self, Display},
};

/// The specific result type for size mismatch checks inside the storage module.
pub type Result<T> = std::result::Result<T, SizeMismatchErr>;

/// Error returned by the shared buffers and the `ParameterStore` whenever there is a size
/// mismatch between gradients, parameters and external buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeMismatchErr {
    pub got: usize,
    pub expected: usize,
}

impl SizeMismatchErr {
    /// Fails unless `got` equals `expected`.
    pub fn check(got: usize, expected: usize) -> Result<()> {
        if got != expected {
            return Err(Self { got, expected });
        }

        Ok(())
    }
}

impl Display for SizeMismatchErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ParameterStore error: the provided buffer has {} values but {} were expected",
            self.got, self.expected
        )
    }
}

impl Error for SizeMismatchErr {}
