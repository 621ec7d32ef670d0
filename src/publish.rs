//! Publishing evaluations
//!
//! A `Publisher` receives every evaluation produced by
//! `Experiment::publish`. Closures taking `&Evaluation` are publishers too.

use tracing::{info, warn};

use crate::experiment::Evaluation;

/// Sink for experiment evaluations.
pub trait Publisher: Send + Sync {
    /// Publish one evaluation.
    fn publish(&self, evaluation: &Evaluation);
}

impl<F> Publisher for F
where
    F: Fn(&Evaluation) + Send + Sync,
{
    fn publish(&self, evaluation: &Evaluation) {
        self(evaluation);
    }
}

/// Publishes evaluations as `tracing` events.
///
/// Successful evaluations are logged at `info`, anything with a mismatch or a
/// captured failure at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPublisher;

impl Publisher for TracingPublisher {
    fn publish(&self, evaluation: &Evaluation) {
        if evaluation.is_success() {
            info!(
                experiment = %evaluation.experiment(),
                candidates = evaluation.candidates().len(),
                control_us = evaluation.control_duration_us(),
                "experiment candidates matched control"
            );
        } else {
            warn!(
                experiment = %evaluation.experiment(),
                mismatched = ?evaluation.mismatched(),
                failed = ?evaluation.failed(),
                control_us = evaluation.control_duration_us(),
                "experiment candidates diverged from control"
            );
        }
    }
}
