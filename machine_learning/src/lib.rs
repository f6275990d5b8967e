pub mod arch;
pub mod checkpoint;
pub mod error;
pub mod initialization;
pub mod optimization;
pub mod preprocess;
mod test;

pub use error::{MlErr, Result};
