mod dense;
mod lstm;

pub use dense::Dense;
pub use lstm::{LstmCache, LstmCell};
