//! Bulk spawning benchmark
//!
//! Launches `task_count` units of simulated blocking work with the selected
//! strategy, sampling the process every `sample_interval` launches on the
//! launching control flow. Samples therefore interleave with launches in
//! program order and the peak accumulator needs no synchronisation.

use crate::benchmark::error::BenchmarkError;
use crate::benchmark::sampler::{PeakUsage, ResourceSample, ResourceSampler, SysinfoSampler};
use crate::benchmark::shutdown::ShutdownSignal;
use crate::benchmark::types::{
    BenchmarkConfig, BenchmarkResult, UnitOutcome, MAX_UNIT_DELAY_MS, MIN_UNIT_DELAY_MS,
};
use crate::concurrency::{ExecutionContext, ExecutionStrategy};
use rand::Rng;
use std::io;
use std::thread;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument};

/// Run a benchmark with a fresh process sampler
pub fn run(config: &BenchmarkConfig) -> Result<BenchmarkResult, BenchmarkError> {
    BenchmarkRunner::new()?.run(config)
}

/// Executes benchmark runs; every run starts from empty peaks
pub struct BenchmarkRunner<S = SysinfoSampler> {
    sampler: S,
    shutdown: ShutdownSignal,
}

impl BenchmarkRunner<SysinfoSampler> {
    pub fn new() -> Result<Self, BenchmarkError> {
        Ok(Self::with_sampler(SysinfoSampler::new()?))
    }
}

impl<S: ResourceSampler> BenchmarkRunner<S> {
    pub fn with_sampler(sampler: S) -> Self {
        Self {
            sampler,
            shutdown: ShutdownSignal::new(),
        }
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    #[instrument(skip_all, fields(strategy = %config.strategy, tasks = %config.task_count))]
    pub fn run(&mut self, config: &BenchmarkConfig) -> Result<BenchmarkResult, BenchmarkError> {
        let total = *config.task_count.as_ref();
        info!(
            "Starting benchmark with {} units using '{}'",
            total, config.strategy
        );

        let baseline = self.sampler.sample(0);
        log_sample("Before launching units", &baseline);
        let peak = PeakUsage::default().record(&baseline);

        let finished = match config.strategy {
            ExecutionStrategy::Heavyweight => {
                self.run_heavyweight(config, peak, spawn_unit_thread)?
            }
            ExecutionStrategy::Lightweight => self.run_lightweight(config, peak)?,
        };

        // Memory at completion can exceed every sampled point
        let last = self.sampler.sample(total);
        log_sample("After units completed", &last);
        let peak = finished.peak.record(&last);

        let result = BenchmarkResult {
            strategy: config.strategy,
            task_count: total,
            elapsed_millis: u64::try_from(finished.elapsed.as_millis()).unwrap_or(u64::MAX),
            peak_memory_bytes: peak.peak_memory_bytes,
            peak_os_thread_count: peak.peak_os_threads,
            units_completed: finished.tally.completed,
            units_interrupted: finished.tally.interrupted,
        };
        info!(samples = peak.samples_taken, "{result}");
        Ok(result)
    }

    fn run_heavyweight<F>(
        &mut self,
        config: &BenchmarkConfig,
        mut peak: PeakUsage,
        mut spawn: F,
    ) -> Result<Finished, BenchmarkError>
    where
        F: FnMut(usize, Unit) -> io::Result<UnitHandle>,
    {
        let total = *config.task_count.as_ref();
        let interval = *config.sample_interval.as_ref();
        let root = ExecutionContext::heavyweight("bench");
        let mut rng = rand::thread_rng();
        let mut handles = Vec::with_capacity(total);

        let started = Instant::now();
        for ordinal in 0..total {
            let unit = Unit::new(&root, ordinal, &mut rng, config.verbose, &self.shutdown);

            match spawn(ordinal, unit) {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    join_threads(handles);
                    return Err(BenchmarkError::Spawn {
                        launched: ordinal,
                        source,
                    });
                }
            }

            let launched = ordinal + 1;
            if launched % interval == 0 {
                peak = sample_progress(&mut self.sampler, launched, total, peak);
            }
        }

        let tally = join_threads(handles);
        Ok(Finished {
            tally,
            peak,
            elapsed: started.elapsed(),
        })
    }

    /// Drives a fresh runtime from a dedicated thread, so callers may
    /// themselves run inside a tokio runtime
    fn run_lightweight(
        &mut self,
        config: &BenchmarkConfig,
        peak: PeakUsage,
    ) -> Result<Finished, BenchmarkError> {
        thread::scope(|scope| {
            let driver = thread::Builder::new()
                .name("bench-driver".to_string())
                .spawn_scoped(scope, move || self.drive_lightweight(config, peak))
                .map_err(BenchmarkError::Runtime)?;

            match driver.join() {
                Ok(finished) => finished,
                Err(payload) => std::panic::resume_unwind(payload),
            }
        })
    }

    fn drive_lightweight(
        &mut self,
        config: &BenchmarkConfig,
        peak: PeakUsage,
    ) -> Result<Finished, BenchmarkError> {
        let total = *config.task_count.as_ref();
        let interval = *config.sample_interval.as_ref();
        let workers = *config.worker_threads.as_ref();

        // A runtime per run keeps carrier threads from leaking between runs
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(workers)
            .thread_name("bench-carrier")
            .enable_time()
            .build()
            .map_err(BenchmarkError::Runtime)?;
        debug!(workers, "lightweight runtime started");

        let root = ExecutionContext::lightweight("bench");
        let sampler = &mut self.sampler;
        let shutdown = &self.shutdown;

        let finished = runtime.block_on(async move {
            let mut peak = peak;
            let mut rng = rand::thread_rng();
            let mut units = JoinSet::new();

            let started = Instant::now();
            for ordinal in 0..total {
                let unit = Unit::new(&root, ordinal, &mut rng, config.verbose, shutdown);
                units.spawn(unit.run());

                let launched = ordinal + 1;
                if launched % interval == 0 {
                    peak = sample_progress(sampler, launched, total, peak);
                }
            }

            let mut tally = Tally::default();
            while let Some(joined) = units.join_next().await {
                match joined {
                    Ok(outcome) => tally = tally.add(outcome),
                    Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                    Err(_) => tally = tally.add(UnitOutcome::Interrupted),
                }
            }

            Finished {
                tally,
                peak,
                elapsed: started.elapsed(),
            }
        });

        Ok(finished)
    }
}

/// What a strategy hands back once every unit is terminal
struct Finished {
    tally: Tally,
    peak: PeakUsage,
    elapsed: Duration,
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    completed: usize,
    interrupted: usize,
}

impl Tally {
    fn add(self, outcome: UnitOutcome) -> Self {
        match outcome {
            UnitOutcome::Completed => Self {
                completed: self.completed + 1,
                ..self
            },
            UnitOutcome::Interrupted => Self {
                interrupted: self.interrupted + 1,
                ..self
            },
        }
    }
}

/// One unit of simulated blocking work
struct Unit {
    context: ExecutionContext,
    delay: Duration,
    verbose: bool,
    shutdown: ShutdownSignal,
}

impl Unit {
    fn new(
        root: &ExecutionContext,
        ordinal: usize,
        rng: &mut impl Rng,
        verbose: bool,
        shutdown: &ShutdownSignal,
    ) -> Self {
        Self {
            context: root.child("unit", ordinal),
            delay: Duration::from_millis(rng.gen_range(MIN_UNIT_DELAY_MS..MAX_UNIT_DELAY_MS)),
            verbose,
            shutdown: shutdown.clone(),
        }
    }

    fn run_blocking(self) -> UnitOutcome {
        let interrupted = self.shutdown.sleep_blocking(self.delay);
        self.finish(interrupted)
    }

    async fn run(self) -> UnitOutcome {
        let interrupted = self.shutdown.sleep(self.delay).await;
        self.finish(interrupted)
    }

    fn finish(&self, interrupted: bool) -> UnitOutcome {
        if interrupted {
            debug!(unit = %self.context, "unit observed shutdown, exiting");
            return UnitOutcome::Interrupted;
        }
        if self.verbose {
            info!(unit = %self.context, delay_ms = self.delay.as_millis() as u64, "unit finished");
        }
        UnitOutcome::Completed
    }
}

type UnitHandle = thread::JoinHandle<UnitOutcome>;

fn spawn_unit_thread(ordinal: usize, unit: Unit) -> io::Result<UnitHandle> {
    thread::Builder::new()
        .name(format!("bench-unit-{ordinal}"))
        .spawn(move || unit.run_blocking())
}

fn join_threads(handles: Vec<UnitHandle>) -> Tally {
    handles
        .into_iter()
        .fold(Tally::default(), |tally, handle| match handle.join() {
            Ok(outcome) => tally.add(outcome),
            Err(payload) => std::panic::resume_unwind(payload),
        })
}

fn sample_progress<S: ResourceSampler>(
    sampler: &mut S,
    launched: usize,
    total: usize,
    peak: PeakUsage,
) -> PeakUsage {
    let sample = sampler.sample(launched);
    info!(
        "Launched {}/{} units, memory used: {:.2} MB, OS threads: {}",
        launched,
        total,
        sample.memory_used_mb(),
        sample.os_thread_count
    );
    peak.record(&sample)
}

fn log_sample(label: &str, sample: &ResourceSample) {
    info!(
        "[{}] Memory used: {:.2} MB, OS threads: {}",
        label,
        sample.memory_used_mb(),
        sample.os_thread_count
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Sampler reporting a fixed series so peak folding can be checked
    struct ScriptedSampler {
        calls: Vec<usize>,
    }

    impl ResourceSampler for ScriptedSampler {
        fn sample(&mut self, tasks_launched: usize) -> ResourceSample {
            self.calls.push(tasks_launched);
            ResourceSample {
                tasks_launched,
                memory_used_bytes: 1_000 + tasks_launched as u64,
                os_thread_count: 1 + tasks_launched % 7,
            }
        }
    }

    fn config(strategy: ExecutionStrategy, tasks: usize, interval: usize) -> BenchmarkConfig {
        BenchmarkConfig::new(strategy, tasks, interval)
            .unwrap()
            .with_worker_threads(2)
            .unwrap()
    }

    #[test]
    fn samples_follow_launch_order() {
        for strategy in [ExecutionStrategy::Heavyweight, ExecutionStrategy::Lightweight] {
            let mut runner = BenchmarkRunner::with_sampler(ScriptedSampler { calls: Vec::new() });
            let result = runner.run(&config(strategy, 10, 3)).unwrap();

            assert_eq!(runner.sampler.calls, vec![0, 3, 6, 9, 10]);
            assert_eq!(result.units_completed, 10);
            // Final sample reports the largest memory figure
            assert_eq!(result.peak_memory_bytes, 1_010);
            assert_eq!(result.peak_os_thread_count, 7);
        }
    }

    #[test]
    fn zero_tasks_only_take_baseline_and_final_samples() {
        let mut runner = BenchmarkRunner::with_sampler(ScriptedSampler { calls: Vec::new() });
        let result = runner
            .run(&config(ExecutionStrategy::Lightweight, 0, 1))
            .unwrap();

        assert_eq!(runner.sampler.calls, vec![0, 0]);
        assert_eq!(result.units_finished(), 0);
    }

    #[test]
    fn triggered_shutdown_interrupts_every_unit() {
        for strategy in [ExecutionStrategy::Heavyweight, ExecutionStrategy::Lightweight] {
            let mut runner = BenchmarkRunner::with_sampler(ScriptedSampler { calls: Vec::new() });
            runner.shutdown_signal().trigger();

            let result = runner.run(&config(strategy, 25, 10)).unwrap();
            assert_eq!(result.units_interrupted, 25);
            assert_eq!(result.units_completed, 0);
        }
    }

    #[test]
    fn unit_delay_stays_in_range() {
        let root = ExecutionContext::heavyweight("bench");
        let shutdown = ShutdownSignal::new();
        let mut rng = rand::thread_rng();
        for ordinal in 0..500 {
            let unit = Unit::new(&root, ordinal, &mut rng, false, &shutdown);
            let ms = unit.delay.as_millis() as u64;
            assert!((MIN_UNIT_DELAY_MS..MAX_UNIT_DELAY_MS).contains(&ms));
        }
    }

    #[test]
    fn tally_counts_each_outcome() {
        let tally = Tally::default()
            .add(UnitOutcome::Completed)
            .add(UnitOutcome::Interrupted)
            .add(UnitOutcome::Completed);
        assert_eq!(tally.completed, 2);
        assert_eq!(tally.interrupted, 1);
    }

    #[test]
    fn refused_spawn_joins_launched_units_first() {
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&finished);
        let mut runner = BenchmarkRunner::with_sampler(ScriptedSampler { calls: Vec::new() });

        let err = runner
            .run_heavyweight(
                &config(ExecutionStrategy::Heavyweight, 10, 100),
                PeakUsage::default(),
                move |ordinal, unit| {
                    if ordinal == 4 {
                        return Err(io::Error::other("refused"));
                    }
                    let counter = Arc::clone(&counter);
                    thread::Builder::new().spawn(move || {
                        let outcome = unit.run_blocking();
                        counter.fetch_add(1, Ordering::SeqCst);
                        outcome
                    })
                },
            )
            .err()
            .unwrap();

        assert!(matches!(err, BenchmarkError::Spawn { launched: 4, .. }), "{err:?}");
        assert_eq!(finished.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn lightweight_run_works_inside_a_runtime() {
        let mut runner = BenchmarkRunner::with_sampler(ScriptedSampler { calls: Vec::new() });
        let result = runner
            .run(&config(ExecutionStrategy::Lightweight, 10, 5))
            .unwrap();

        assert_eq!(result.units_completed, 10);
        assert_eq!(runner.sampler.calls, vec![0, 5, 10, 10]);
    }
}
