//! Heavyweight and lightweight runs compared on the same unit count
//!
//! Kept in its own test binary so that no sibling test adds threads to the
//! process while the comparison samples it.

#![cfg(target_os = "linux")]

use order_scope::benchmark::{self, BenchmarkConfig};
use order_scope::concurrency::ExecutionStrategy;

const UNITS: usize = 2000;

#[test]
fn lightweight_peaks_at_fewer_os_threads_than_heavyweight() {
    let config = |strategy| {
        BenchmarkConfig::new(strategy, UNITS, 100)
            .unwrap()
            .with_worker_threads(2)
            .unwrap()
    };

    let light = benchmark::run(&config(ExecutionStrategy::Lightweight)).unwrap();
    let heavy = benchmark::run(&config(ExecutionStrategy::Heavyweight)).unwrap();

    assert_eq!(light.units_completed, UNITS);
    assert_eq!(heavy.units_completed, UNITS);

    // Carrier pool plus test harness and blocking helpers; exact figures
    // depend on scheduling
    assert!(light.peak_os_thread_count < 64, "{light}");
    assert!(
        light.peak_os_thread_count < heavy.peak_os_thread_count,
        "light: {light}, heavy: {heavy}"
    );
}
