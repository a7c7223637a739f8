//! Benchmark configuration and result types

use crate::benchmark::error::BenchmarkError;
use crate::config::BenchmarkSettings;
use crate::concurrency::ExecutionStrategy;
use crate::domain::{SampleInterval, TaskCount, WorkerThreads};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower bound (inclusive) of the simulated blocking delay, in milliseconds
pub const MIN_UNIT_DELAY_MS: u64 = 1;

/// Upper bound (exclusive) of the simulated blocking delay, in milliseconds
pub const MAX_UNIT_DELAY_MS: u64 = 10;

/// Parameters of one benchmark run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkConfig {
    pub strategy: ExecutionStrategy,
    pub task_count: TaskCount,
    pub sample_interval: SampleInterval,
    pub verbose: bool,
    /// Pool size carrying lightweight tasks; ignored by the heavyweight
    /// strategy
    pub worker_threads: WorkerThreads,
}

impl BenchmarkConfig {
    pub fn new(
        strategy: ExecutionStrategy,
        task_count: usize,
        sample_interval: usize,
    ) -> Result<Self, BenchmarkError> {
        Ok(Self {
            strategy,
            task_count: TaskCount::from(task_count),
            sample_interval: SampleInterval::try_new(sample_interval)
                .map_err(|e| BenchmarkError::configuration(format!("sample interval: {e}")))?,
            verbose: false,
            worker_threads: WorkerThreads::available()
                .map_err(|e| BenchmarkError::configuration(format!("worker threads: {e}")))?,
        })
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_worker_threads(mut self, workers: usize) -> Result<Self, BenchmarkError> {
        self.worker_threads = WorkerThreads::try_new(workers)
            .map_err(|e| BenchmarkError::configuration(format!("worker threads: {e}")))?;
        Ok(self)
    }
}

impl TryFrom<&BenchmarkSettings> for BenchmarkConfig {
    type Error = BenchmarkError;

    fn try_from(settings: &BenchmarkSettings) -> Result<Self, Self::Error> {
        let strategy = settings
            .strategy
            .parse::<ExecutionStrategy>()
            .map_err(|e| BenchmarkError::configuration(e.to_string()))?;

        let config = Self::new(strategy, settings.task_count, settings.sample_interval)?
            .with_verbose(settings.verbose);

        match settings.worker_threads {
            Some(workers) => config.with_worker_threads(workers),
            None => Ok(config),
        }
    }
}

/// How a single unit ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    Completed,
    /// The unit observed shutdown during its sleep and exited early
    Interrupted,
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkResult {
    pub strategy: ExecutionStrategy,
    pub task_count: usize,
    pub elapsed_millis: u64,
    pub peak_memory_bytes: u64,
    pub peak_os_thread_count: usize,
    pub units_completed: usize,
    pub units_interrupted: usize,
}

impl BenchmarkResult {
    /// Units that reached a terminal state
    pub fn units_finished(&self) -> usize {
        self.units_completed + self.units_interrupted
    }

    pub fn peak_memory_mb(&self) -> f64 {
        self.peak_memory_bytes as f64 / (1024.0 * 1024.0)
    }
}

impl fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: completed {} units in {} ms (interrupted: {}, peak memory: {:.2} MB, peak OS threads: {})",
            self.strategy,
            self.units_completed,
            self.elapsed_millis,
            self.units_interrupted,
            self.peak_memory_mb(),
            self.peak_os_thread_count
        )
    }
}
