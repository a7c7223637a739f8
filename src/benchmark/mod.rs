//! Thread-versus-task spawning benchmark
//!
//! Compares the resource cost of running many short blocking units on one OS
//! thread each against running them as tokio tasks on a small carrier pool.
//! Both strategies share the same unit semantics and completion guarantee;
//! only elapsed time, memory and OS thread counts differ.

pub mod error;
pub mod runner;
pub mod sampler;
pub mod shutdown;
pub mod types;

pub use error::BenchmarkError;
pub use runner::{run, BenchmarkRunner};
pub use sampler::{PeakUsage, ResourceSample, ResourceSampler, SysinfoSampler};
pub use shutdown::ShutdownSignal;
pub use types::{BenchmarkConfig, BenchmarkResult, UnitOutcome};
