use thiserror::Error;

/// Failures of a benchmark run
#[derive(Error, Debug)]
pub enum BenchmarkError {
    /// The run was described with values no run can use
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to start the task runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// The OS refused a new thread after `launched` units were already running
    #[error("Failed to spawn unit {launched}: {source}")]
    Spawn {
        launched: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Resource sampling unavailable: {0}")]
    Sampler(String),
}

impl BenchmarkError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
