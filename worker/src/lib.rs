pub mod config;
pub mod env;
pub mod error;
pub mod metrics;
pub mod worker;

pub use config::WorkerConfig;
pub use error::{Result, WorkerErr};
pub use metrics::{EpisodeStats, StatusLog, WorkerReport};
pub use worker::{Shared, Worker};
