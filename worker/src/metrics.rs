use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use parameter_server::CounterSnapshot;

/// Bookkeeping of the episode a worker is playing.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct EpisodeStats {
    pub length: u64,
    pub reward: f32,
    pub loss: f32,
}

/// What a worker did before leaving its loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub rank: usize,
    pub segments: u64,
    pub episodes: u64,
}

/// The run's append only text log.
///
/// Every line is also emitted through `log::info!`. Status lines are throttled per handle.
#[derive(Debug, Clone)]
pub struct StatusLog {
    path: PathBuf,
    start: Instant,
    interval: Duration,
    last: Instant,
}

impl StatusLog {
    pub const FILE_NAME: &'static str = "log.txt";

    /// Creates a new `StatusLog`.
    ///
    /// # Arguments
    /// * `run_dir` - The directory the log file lives in.
    /// * `start` - When the run started.
    /// * `interval` - The minimum time between two status lines.
    ///
    /// # Returns
    /// A new `StatusLog` instance.
    pub fn new(run_dir: &Path, start: Instant, interval: Duration) -> Self {
        Self {
            path: run_dir.join(Self::FILE_NAME),
            start,
            interval,
            last: start,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Empties the log file, creating it if needed.
    pub fn truncate(&self) -> io::Result<()> {
        File::create(&self.path).map(|_| ())
    }

    /// Appends a line to the log file.
    pub fn write(&self, line: &str) -> io::Result<()> {
        log::info!("{line}");

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }

    /// Whether enough time passed since the last status line.
    pub fn is_due(&self) -> bool {
        self.last.elapsed() >= self.interval
    }

    /// Writes a status line with the global progress.
    pub fn report(&mut self, snapshot: &CounterSnapshot) -> io::Result<()> {
        let line = status_line(self.start.elapsed(), snapshot);
        self.write(&line)?;
        self.last = Instant::now();
        Ok(())
    }
}

/// Formats the global progress as a single log line.
pub fn status_line(elapsed: Duration, snapshot: &CounterSnapshot) -> String {
    let secs = elapsed.as_secs();
    format!(
        "time {:02}h {:02}m {:02}s, episodes {}, frames {}, run epr {:.2}, run loss {:.2}",
        secs / 3600,
        secs / 60 % 60,
        secs % 60,
        snapshot.episodes,
        snapshot.frames,
        snapshot.run_reward,
        snapshot.run_loss,
    )
}
