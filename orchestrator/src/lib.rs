//! Builds the shared state of an asynchronous actor-critic run and drives its workers.

pub mod configs;
pub mod error;
mod session;

pub use error::{OrchestratorError, Result};
pub use session::{Session, Summary};

use crate::configs::TrainingConfig;

/// Trains a model with the given configuration until the frame budget is spent.
///
/// # Errors
/// Returns an `OrchestratorError` if the configuration is invalid or the shared state couldn't be
/// built. Worker failures are reported in the `Summary` instead.
pub fn train(config: TrainingConfig) -> Result<Summary> {
    log::info!("creating session");
    let session = Session::new(config)?;
    Ok(session.wait())
}
