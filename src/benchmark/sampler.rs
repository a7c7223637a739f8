//! Process resource sampling
//!
//! Samples are folded into a [`PeakUsage`] accumulator owned by the run that
//! takes them; nothing is kept beyond the running maxima.

use crate::benchmark::error::BenchmarkError;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Point-in-time view of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceSample {
    pub tasks_launched: usize,
    pub memory_used_bytes: u64,
    /// OS-backed threads only; lightweight tasks never show up here
    pub os_thread_count: usize,
}

impl ResourceSample {
    pub fn memory_used_mb(&self) -> f64 {
        self.memory_used_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Running maxima over the samples of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeakUsage {
    pub peak_memory_bytes: u64,
    pub peak_os_threads: usize,
    pub samples_taken: usize,
}

impl PeakUsage {
    pub fn record(self, sample: &ResourceSample) -> Self {
        Self {
            peak_memory_bytes: self.peak_memory_bytes.max(sample.memory_used_bytes),
            peak_os_threads: self.peak_os_threads.max(sample.os_thread_count),
            samples_taken: self.samples_taken + 1,
        }
    }
}

/// Source of resource samples
///
/// Samplers are `Send` because the lightweight strategy samples from its
/// driver thread.
pub trait ResourceSampler: Send {
    fn sample(&mut self, tasks_launched: usize) -> ResourceSample;
}

/// Samples the current process through `sysinfo`
///
/// OS threads are counted from the process task list, which `sysinfo`
/// reads on Linux. Other platforms report zero threads.
pub struct SysinfoSampler {
    system: System,
    pid: Pid,
}

impl SysinfoSampler {
    pub fn new() -> Result<Self, BenchmarkError> {
        let pid = sysinfo::get_current_pid().map_err(|e| BenchmarkError::Sampler(e.to_string()))?;
        Ok(Self {
            system: System::new(),
            pid,
        })
    }
}

impl ResourceSampler for SysinfoSampler {
    fn sample(&mut self, tasks_launched: usize) -> ResourceSample {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            true,
            ProcessRefreshKind::nothing().with_memory().with_tasks(),
        );

        let (memory_used_bytes, os_thread_count) = self
            .system
            .process(self.pid)
            .map(|process| {
                let threads = process.tasks().map_or(0, |tasks| tasks.len());
                (process.memory(), threads)
            })
            .unwrap_or((0, 0));

        ResourceSample {
            tasks_launched,
            memory_used_bytes,
            os_thread_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(memory: u64, threads: usize) -> ResourceSample {
        ResourceSample {
            tasks_launched: 0,
            memory_used_bytes: memory,
            os_thread_count: threads,
        }
    }

    #[test]
    fn peaks_track_independent_maxima() {
        let peak = PeakUsage::default()
            .record(&sample(100, 9))
            .record(&sample(300, 2))
            .record(&sample(200, 4));

        assert_eq!(peak.peak_memory_bytes, 300);
        assert_eq!(peak.peak_os_threads, 9);
        assert_eq!(peak.samples_taken, 3);
    }

    #[test]
    fn sysinfo_sampler_sees_this_process() {
        let mut sampler = SysinfoSampler::new().unwrap();
        let taken = sampler.sample(7);

        assert_eq!(taken.tasks_launched, 7);
        assert!(taken.memory_used_bytes > 0);
        #[cfg(target_os = "linux")]
        assert!(taken.os_thread_count >= 1);
    }

    proptest! {
        #[test]
        fn fold_equals_componentwise_max(
            samples in prop::collection::vec((0u64..1 << 40, 0usize..100_000), 1..50)
        ) {
            let peak = samples
                .iter()
                .fold(PeakUsage::default(), |acc, (m, t)| acc.record(&sample(*m, *t)));

            prop_assert_eq!(peak.peak_memory_bytes, samples.iter().map(|s| s.0).max().unwrap());
            prop_assert_eq!(peak.peak_os_threads, samples.iter().map(|s| s.1).max().unwrap());
            prop_assert_eq!(peak.samples_taken, samples.len());
        }
    }
}
