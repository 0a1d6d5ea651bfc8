//! # Per-task timing statistics and fault accounting.
//!
//! [`RoutineMonitor`] tracks two measurements for one periodically executed
//! routine:
//!
//! - **duration**: wall time from a [`start`](RoutineMonitor::start) to its
//!   matching [`stop`](RoutineMonitor::stop);
//! - **interval**: wall time from the previous `start` to the current one.
//!
//! For each, the monitor keeps the last sample plus sticky min/max
//! high-water marks, and counts samples outside the tolerance as faults.
//! Interval samples only exist from the second iteration on; until the first
//! iteration completes they are neither recorded nor scored.
//!
//! All fields are atomics, so accessors may be called from any thread while
//! the owning worker keeps sampling. `start`/`stop` themselves must only be
//! called by the single owning thread.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

const NANOS_PER_MICRO: u64 = 1_000;

/// Tolerance is a tenth of the expected value, but never tighter than this
/// floor. Sub-millisecond periods would otherwise count scheduler jitter as
/// faults.
const DEVIATION_DIVISOR: u64 = 10;
const DEVIATION_FLOOR_MICROS: u64 = 200;

/// # Timing monitor for one periodic routine.
///
/// Duration faults are overrun-only: a routine finishing early is on budget,
/// one exceeding `expected + deviation` is not. Interval faults are
/// two-sided: a tick arriving early or late by more than the deviation is a
/// cadence error either way.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use tickvisor::RoutineMonitor;
///
/// let monitor = RoutineMonitor::new(Duration::from_millis(50), Duration::from_millis(50));
/// monitor.start();
/// // ... routine body ...
/// monitor.stop();
///
/// assert!(monitor.is_first_loop_done());
/// assert_eq!(monitor.duration_fault_count(), 0);
/// ```
pub struct RoutineMonitor {
    /// All instants are stored as nanoseconds since this anchor so they fit
    /// in atomics.
    anchor: Instant,

    duration_expected: u64,
    interval_expected: u64,
    duration_deviation: u64,
    interval_deviation: u64,

    duration_cur: AtomicU64,
    duration_min: AtomicU64,
    duration_max: AtomicU64,
    interval_cur: AtomicU64,
    interval_min: AtomicU64,
    interval_max: AtomicU64,

    duration_faults: AtomicU64,
    interval_faults: AtomicU64,

    start_ns: AtomicU64,
    first_loop_done: AtomicBool,
}

impl RoutineMonitor {
    /// Creates a monitor for a routine expected to take `expected_duration`
    /// per iteration, with `expected_interval` between iteration starts.
    ///
    /// The tolerances are derived once: a tenth of the expected value,
    /// clamped to a 200 µs floor.
    pub fn new(expected_duration: Duration, expected_interval: Duration) -> Self {
        let duration_expected = expected_duration.as_micros() as u64;
        let interval_expected = expected_interval.as_micros() as u64;
        Self {
            anchor: Instant::now(),
            duration_expected,
            interval_expected,
            duration_deviation: deviation_for(duration_expected),
            interval_deviation: deviation_for(interval_expected),
            duration_cur: AtomicU64::new(0),
            duration_min: AtomicU64::new(0),
            duration_max: AtomicU64::new(0),
            interval_cur: AtomicU64::new(0),
            interval_min: AtomicU64::new(0),
            interval_max: AtomicU64::new(0),
            duration_faults: AtomicU64::new(0),
            interval_faults: AtomicU64::new(0),
            start_ns: AtomicU64::new(0),
            first_loop_done: AtomicBool::new(false),
        }
    }

    /// Stamps the start of an iteration.
    ///
    /// From the second iteration on this also records the interval since the
    /// previous start and scores it against the tolerance.
    pub fn start(&self) {
        let now = self.now_ns();
        let prev = self.start_ns.swap(now, Ordering::Relaxed);

        if self.first_loop_done.load(Ordering::Relaxed) {
            let interval = now.saturating_sub(prev) / NANOS_PER_MICRO;
            self.interval_cur.store(interval, Ordering::Relaxed);
            update_min(&self.interval_min, interval);
            update_max(&self.interval_max, interval);
            if interval.abs_diff(self.interval_expected) > self.interval_deviation {
                self.interval_faults.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Stamps the end of an iteration, records its duration, scores it, and
    /// marks the first loop as done.
    pub fn stop(&self) {
        let now = self.now_ns();
        let started = self.start_ns.load(Ordering::Relaxed);
        let duration = now.saturating_sub(started) / NANOS_PER_MICRO;

        self.duration_cur.store(duration, Ordering::Relaxed);
        update_min(&self.duration_min, duration);
        update_max(&self.duration_max, duration);
        if duration > self.duration_expected + self.duration_deviation {
            self.duration_faults.fetch_add(1, Ordering::Relaxed);
        }

        self.first_loop_done.store(true, Ordering::Relaxed);
    }

    /// Duration of the most recent completed iteration.
    pub fn duration_cur(&self) -> Duration {
        Duration::from_micros(self.duration_cur.load(Ordering::Relaxed))
    }

    /// Shortest completed iteration since construction (or the last reset).
    pub fn duration_min(&self) -> Duration {
        Duration::from_micros(self.duration_min.load(Ordering::Relaxed))
    }

    /// Longest completed iteration since construction (or the last reset).
    pub fn duration_max(&self) -> Duration {
        Duration::from_micros(self.duration_max.load(Ordering::Relaxed))
    }

    /// Interval between the two most recent iteration starts.
    pub fn interval_cur(&self) -> Duration {
        Duration::from_micros(self.interval_cur.load(Ordering::Relaxed))
    }

    /// Shortest recorded interval since construction (or the last reset).
    pub fn interval_min(&self) -> Duration {
        Duration::from_micros(self.interval_min.load(Ordering::Relaxed))
    }

    /// Longest recorded interval since construction (or the last reset).
    pub fn interval_max(&self) -> Duration {
        Duration::from_micros(self.interval_max.load(Ordering::Relaxed))
    }

    /// Number of duration samples that overran the tolerance. Never resets.
    pub fn duration_fault_count(&self) -> u64 {
        self.duration_faults.load(Ordering::Relaxed)
    }

    /// Number of interval samples outside the tolerance. Never resets.
    pub fn interval_fault_count(&self) -> u64 {
        self.interval_faults.load(Ordering::Relaxed)
    }

    /// Expected iteration duration.
    pub fn duration_expected(&self) -> Duration {
        Duration::from_micros(self.duration_expected)
    }

    /// Expected interval between iteration starts.
    pub fn interval_expected(&self) -> Duration {
        Duration::from_micros(self.interval_expected)
    }

    /// True once the first iteration has completed.
    pub fn is_first_loop_done(&self) -> bool {
        self.first_loop_done.load(Ordering::Relaxed)
    }

    /// Whether the most recent duration sample overran the tolerance.
    pub fn is_duration_timeout(&self) -> bool {
        self.duration_cur.load(Ordering::Relaxed) > self.duration_expected + self.duration_deviation
    }

    /// Whether the most recent interval sample is outside the tolerance.
    /// False while no interval has been recorded yet.
    pub fn is_interval_timeout(&self) -> bool {
        let cur = self.interval_cur.load(Ordering::Relaxed);
        cur != 0 && cur.abs_diff(self.interval_expected) > self.interval_deviation
    }

    /// When `reset` is true, zeroes the duration cur/min/max samples. Fault
    /// counters are untouched.
    pub fn reset_elapsed_timing(&self, reset: bool) {
        if reset {
            self.duration_cur.store(0, Ordering::Relaxed);
            self.duration_min.store(0, Ordering::Relaxed);
            self.duration_max.store(0, Ordering::Relaxed);
        }
    }

    /// When `reset` is true, zeroes the interval cur/min/max samples. Fault
    /// counters are untouched.
    pub fn reset_interval_timing(&self, reset: bool) {
        if reset {
            self.interval_cur.store(0, Ordering::Relaxed);
            self.interval_min.store(0, Ordering::Relaxed);
            self.interval_max.store(0, Ordering::Relaxed);
        }
    }

    fn now_ns(&self) -> u64 {
        self.anchor.elapsed().as_nanos() as u64
    }
}

fn deviation_for(expected: u64) -> u64 {
    (expected / DEVIATION_DIVISOR).max(DEVIATION_FLOOR_MICROS)
}

/// Min is tracked with `0` meaning "no sample yet"; resets restore that
/// state. Single writer, so load+store suffices.
fn update_min(slot: &AtomicU64, sample: u64) {
    let cur = slot.load(Ordering::Relaxed);
    if cur == 0 || sample < cur {
        slot.store(sample, Ordering::Relaxed);
    }
}

fn update_max(slot: &AtomicU64, sample: u64) {
    if sample > slot.load(Ordering::Relaxed) {
        slot.store(sample, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn monitor_ms(expected_ms: u64) -> RoutineMonitor {
        let expected = Duration::from_millis(expected_ms);
        RoutineMonitor::new(expected, expected)
    }

    #[test]
    fn tolerance_has_a_floor() {
        assert_eq!(deviation_for(10), DEVIATION_FLOOR_MICROS);
        assert_eq!(deviation_for(100_000), 10_000);
    }

    #[test]
    fn first_iteration_records_duration_but_no_interval() {
        let m = monitor_ms(50);
        assert!(!m.is_first_loop_done());

        m.start();
        sleep(Duration::from_millis(5));
        m.stop();

        assert!(m.is_first_loop_done());
        assert!(m.duration_cur() >= Duration::from_millis(5));
        assert_eq!(m.interval_cur(), Duration::ZERO);
        assert_eq!(m.interval_fault_count(), 0);
        // An early finish is on budget.
        assert_eq!(m.duration_fault_count(), 0);
        assert!(!m.is_duration_timeout());
    }

    #[test]
    fn overrun_scores_a_duration_fault() {
        let m = monitor_ms(10);
        m.start();
        sleep(Duration::from_millis(30));
        m.stop();

        assert_eq!(m.duration_fault_count(), 1);
        assert!(m.is_duration_timeout());
    }

    #[test]
    fn off_cadence_interval_scores_a_fault() {
        let m = monitor_ms(10);
        m.start();
        m.stop();
        sleep(Duration::from_millis(40));
        m.start();

        assert!(m.interval_cur() >= Duration::from_millis(40));
        assert_eq!(m.interval_fault_count(), 1);
        assert!(m.is_interval_timeout());
    }

    #[test]
    fn min_cur_max_invariant_holds_across_iterations() {
        let m = monitor_ms(50);
        for pause in [2u64, 8, 4] {
            m.start();
            sleep(Duration::from_millis(pause));
            m.stop();
            sleep(Duration::from_millis(3));
        }

        assert!(m.duration_min() <= m.duration_cur());
        assert!(m.duration_cur() <= m.duration_max());
        assert!(m.interval_min() <= m.interval_cur());
        assert!(m.interval_cur() <= m.interval_max());
        assert!(m.duration_min() >= Duration::from_millis(2));
        assert!(m.duration_max() >= Duration::from_millis(8));
    }

    #[test]
    fn resets_zero_samples_but_keep_fault_counts() {
        let m = monitor_ms(10);
        m.start();
        sleep(Duration::from_millis(30));
        m.stop();
        sleep(Duration::from_millis(40));
        m.start();
        m.stop();

        assert_eq!(m.duration_fault_count(), 1);
        assert_eq!(m.interval_fault_count(), 1);

        m.reset_elapsed_timing(false);
        assert!(m.duration_max() > Duration::ZERO);

        m.reset_elapsed_timing(true);
        m.reset_interval_timing(true);
        assert_eq!(m.duration_cur(), Duration::ZERO);
        assert_eq!(m.duration_min(), Duration::ZERO);
        assert_eq!(m.duration_max(), Duration::ZERO);
        assert_eq!(m.interval_max(), Duration::ZERO);
        assert_eq!(m.duration_fault_count(), 1);
        assert_eq!(m.interval_fault_count(), 1);
    }

    #[test]
    fn expected_values_are_immutable_accessors() {
        let m = RoutineMonitor::new(Duration::from_millis(20), Duration::from_millis(100));
        assert_eq!(m.duration_expected(), Duration::from_millis(20));
        assert_eq!(m.interval_expected(), Duration::from_millis(100));
    }
}
