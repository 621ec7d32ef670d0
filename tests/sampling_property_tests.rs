//! Property-based tests for the sampling decision
//!
//! Following ruchy/trueno/aprender pattern:
//! - Test mathematical invariants
//! - Run with ProptestConfig::with_cases(256)
//! - Must complete in <30 seconds for pre-commit hook

use proptest::prelude::*;
use trueno_experiment::experiment::{should_run, ExperimentState};

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// Generate (hits, runs) with 0 < runs and hits <= runs
fn arb_counters() -> impl Strategy<Value = (u64, u64)> {
    (1u64..10_000).prop_flat_map(|runs| (0..=runs, Just(runs)))
}

/// Generate a configured percentage
fn arb_percentage() -> impl Strategy<Value = u8> {
    0u8..=100
}

/// Run `n` sampled invocations against fresh state, returning (hits, runs)
fn simulate(percentage: u8, n: usize) -> (u64, u64) {
    let state = ExperimentState::new("prop");
    for _ in 0..n {
        state.record_run();
        if state.should_run(percentage, false) {
            state.record_hit();
        }
    }
    let snapshot = state.snapshot();
    (snapshot.hits, snapshot.runs)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    // ========================================================================
    // Decision Properties
    // ========================================================================

    /// Property: samples in iff hits/runs*100 <= percentage, exactly
    #[test]
    fn prop_decision_matches_hit_rate(
        (hits, runs) in arb_counters(),
        percentage in arb_percentage()
    ) {
        let expected = hits * 100 <= u64::from(percentage) * runs;
        prop_assert_eq!(should_run(hits, runs, percentage, false), expected);
    }

    /// Property: a hit count exactly at the ceiling always samples in
    #[test]
    fn prop_exact_ceiling_samples_in(
        percentage in 1u8..=100,
        scale in 1u64..100
    ) {
        let runs = 100 * scale;
        let hits = u64::from(percentage) * scale;
        prop_assert!(should_run(hits, runs, percentage, false));
    }

    /// Property: first-ever invocation always samples in
    #[test]
    fn prop_bootstrap_always_runs(percentage in arb_percentage()) {
        prop_assert!(should_run(0, 0, percentage, false));
    }

    /// Property: test mode always samples in
    #[test]
    fn prop_test_mode_always_runs(
        (hits, runs) in arb_counters(),
        percentage in arb_percentage()
    ) {
        prop_assert!(should_run(hits, runs, percentage, true));
    }

    // ========================================================================
    // Control Loop Properties
    // ========================================================================

    /// Property: hits never exceed runs
    #[test]
    fn prop_hits_bounded_by_runs(percentage in arb_percentage(), n in 1usize..500) {
        let (hits, runs) = simulate(percentage, n);
        prop_assert_eq!(runs, n as u64);
        prop_assert!(hits <= runs);
    }

    /// Property: hit-rate overshoots the ceiling by at most one hit
    #[test]
    fn prop_hit_rate_stays_near_ceiling(percentage in arb_percentage(), n in 1usize..500) {
        let (hits, runs) = simulate(percentage, n);
        prop_assert!(hits * 100 <= u64::from(percentage) * runs + 100);
    }

    /// Property: a 100% ceiling samples every invocation in
    #[test]
    fn prop_full_percentage_runs_everything(n in 1usize..500) {
        let (hits, runs) = simulate(100, n);
        prop_assert_eq!(hits, runs);
    }
}
