//! Experiment State - process-lifetime sampling counters
//!
//! Every sampled invocation records a run before the decision is made and a
//! hit when candidates are selected. The decision keeps the cumulative
//! hit-rate at or under the configured percentage:
//!
//! ```text
//! hit_rate = hits / runs * 100
//! sample in  <=>  test_mode || runs == 0 || hit_rate <= percentage
//! ```
//!
//! The decision is evaluated exactly as `hits * 100 <= percentage * runs`;
//! the floating-point rate is only reported.
//!
//! The rate is cumulative rather than windowed, so drift early in an
//! experiment's life takes longer to wash out.

use std::sync::atomic::{AtomicU64, Ordering};

/// Sampling decision over a counter snapshot.
///
/// ## Example
///
/// ```rust
/// use trueno_experiment::experiment::should_run;
///
/// assert!(should_run(0, 0, 10, false)); // bootstrap
/// assert!(should_run(1, 2, 50, false)); // 50% <= 50%
/// assert!(!should_run(2, 3, 50, false)); // 66% > 50%
/// assert!(should_run(7, 100, 7, false)); // exactly at the ceiling
/// assert!(should_run(3, 3, 0, true)); // test mode
/// ```
#[must_use]
pub fn should_run(hits: u64, runs: u64, percentage: u8, test_mode: bool) -> bool {
    if test_mode || runs == 0 {
        return true;
    }

    u128::from(hits) * 100 <= u128::from(percentage) * u128::from(runs)
}

#[allow(clippy::cast_precision_loss)]
fn hit_rate(hits: u64, runs: u64) -> f64 {
    if runs == 0 {
        return 0.0;
    }
    (hits as f64 / runs as f64) * 100.0
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateSnapshot {
    /// Invocations that sampled candidates in.
    pub hits: u64,
    /// Invocations that consulted sampling.
    pub runs: u64,
}

impl StateSnapshot {
    /// Cumulative hit-rate as a percentage (0 before the first run).
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        hit_rate(self.hits, self.runs)
    }
}

/// Shared counters for one experiment.
///
/// `runs` is always bumped before `hits`, and snapshots read `hits` before
/// `runs`, so every observer sees `hits <= runs`.
#[derive(Debug, Default)]
pub struct ExperimentState {
    name: String,
    hits: AtomicU64,
    runs: AtomicU64,
}

impl ExperimentState {
    /// Create zeroed counters for the named experiment.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hits: AtomicU64::new(0),
            runs: AtomicU64::new(0),
        }
    }

    /// Experiment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Count one sampled invocation.
    pub fn record_run(&self) {
        self.runs.fetch_add(1, Ordering::SeqCst);
    }

    /// Count one invocation that sampled candidates in.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }

    /// Read both counters.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        let hits = self.hits.load(Ordering::SeqCst);
        let runs = self.runs.load(Ordering::SeqCst);
        StateSnapshot { hits, runs }
    }

    /// Sampling decision against the current counters.
    #[must_use]
    pub fn should_run(&self, percentage: u8, test_mode: bool) -> bool {
        let snapshot = self.snapshot();
        should_run(snapshot.hits, snapshot.runs, percentage, test_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_should_run_bootstrap() {
        assert!(should_run(0, 0, 0, false));
        assert!(should_run(0, 0, 100, false));
    }

    #[test]
    fn test_should_run_at_boundary() {
        assert!(should_run(1, 2, 50, false));
        assert!(!should_run(2, 3, 50, false));
        assert!(should_run(1, 10, 10, false));
        assert!(!should_run(2, 10, 10, false));
    }

    #[test]
    fn test_should_run_exact_ceiling_samples_in() {
        // 7/100 * 100 is 7.000000000000001 in f64
        assert!(should_run(7, 100, 7, false));
        assert!(should_run(14, 200, 7, false));
        assert!(should_run(7, 50, 14, false));
        assert!(should_run(21, 150, 14, false));
        assert!(!should_run(8, 100, 7, false));
    }

    #[test]
    fn test_should_run_large_counters() {
        assert!(should_run(u64::MAX / 10, u64::MAX, 10, false));
        assert!(!should_run(u64::MAX, u64::MAX, 99, false));
    }

    #[test]
    fn test_should_run_test_mode_ignores_rate() {
        assert!(should_run(100, 100, 0, true));
    }

    #[test]
    fn test_state_counters() {
        let state = ExperimentState::new("exp");
        assert_eq!(state.name(), "exp");
        assert_eq!(state.snapshot(), StateSnapshot::default());

        state.record_run();
        state.record_hit();
        state.record_run();

        let snapshot = state.snapshot();
        assert_eq!(snapshot.runs, 2);
        assert_eq!(snapshot.hits, 1);
        assert!((snapshot.hit_rate() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_percentage_fifty_sequence() {
        // run -> decide -> (hit): in, in, out
        let state = ExperimentState::new("seq");
        let mut decisions = Vec::new();
        for _ in 0..3 {
            state.record_run();
            let selected = state.should_run(50, false);
            if selected {
                state.record_hit();
            }
            decisions.push(selected);
        }
        assert_eq!(decisions, vec![true, true, false]);
        assert_eq!(state.snapshot(), StateSnapshot { hits: 2, runs: 3 });
    }

    #[test]
    fn test_concurrent_updates_preserve_invariant() {
        let state = Arc::new(ExperimentState::new("concurrent"));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = Arc::clone(&state);
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        state.record_run();
                        if state.should_run(30, false) {
                            state.record_hit();
                        }
                        let snapshot = state.snapshot();
                        assert!(snapshot.hits <= snapshot.runs);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(state.snapshot().runs, 8_000);
    }
}
