//! Experiments: run candidate code paths alongside a trusted control
//!
//! ## Overview
//!
//! ```text
//! ExperimentBuilder ──build──> Experiment (Config + shared ExperimentState)
//!                                  │
//!                                  ├──runner(Behaviours)──> Runner (one per call site)
//!                                  │                           │
//!                                  │                           └──run(ctx)──> Observations
//!                                  │
//!                                  └──evaluate / publish(Observations)──> Evaluation
//! ```
//!
//! The control's result is authoritative. Candidates are observed, never
//! allowed to affect the caller.
//!
//! ## Usage
//!
//! ```rust
//! use trueno_experiment::{Behaviours, Experiment, TracingPublisher};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> trueno_experiment::Result<()> {
//! let experiment = Experiment::<u64, String>::builder("fibonacci")
//!     .percentage(100)
//!     .compare(|control, candidate| control.value() == candidate.value())
//!     .build()?;
//!
//! let behaviours = Behaviours::<u64, String>::new(|_ctx| async { Ok(55) })
//!     .candidate("iterative", |_ctx| async { Ok(55) })?;
//!
//! let mut runner = experiment.runner(behaviours);
//! let observations = runner.run(None).await;
//!
//! let evaluation = experiment.publish(&observations, &TracingPublisher)?;
//! assert!(evaluation.is_success());
//! assert_eq!(observations.into_control_result(), Some(Ok(55)));
//! # Ok(())
//! # }
//! ```

mod behaviour;
mod config;
mod evaluation;
mod observation;
mod runner;
mod state;

pub use behaviour::{Behaviour, Behaviours, Role, CONTROL};
pub use config::{BeforeFilter, Comparison, Config, ExperimentBuilder, DEFAULT_PERCENTAGE};
pub use evaluation::{CandidateOutcome, Evaluation, Verdict};
pub use observation::{CapturedFailure, Observation, Observations};
pub use runner::{Mode, Runner};
pub use state::{should_run, ExperimentState, StateSnapshot};

use std::fmt;
use std::sync::Arc;

use crate::publish::Publisher;
use crate::{Error, Result};

struct Shared<V, E> {
    config: Config<V, E>,
    state: ExperimentState,
}

/// A named experiment: immutable configuration plus shared sampling state.
///
/// Cloning is cheap and every clone shares the same counters.
pub struct Experiment<V, E> {
    shared: Arc<Shared<V, E>>,
}

impl<V, E> Experiment<V, E> {
    /// Start building an experiment.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ExperimentBuilder<V, E> {
        ExperimentBuilder::new(name)
    }

    pub(crate) fn from_config(config: Config<V, E>) -> Self {
        let state = ExperimentState::new(config.name.clone());
        Self {
            shared: Arc::new(Shared { config, state }),
        }
    }

    /// Experiment name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.shared.config.name()
    }

    /// Resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config<V, E> {
        &self.shared.config
    }

    /// Shared sampling counters.
    #[must_use]
    pub fn state(&self) -> &ExperimentState {
        &self.shared.state
    }

    /// Create a runner bound to `behaviours`.
    ///
    /// Take one runner per concurrent call site.
    #[must_use]
    pub fn runner(&self, behaviours: Behaviours<V, E>) -> Runner<V, E> {
        Runner::new(self.clone(), behaviours)
    }

    /// Compare every candidate observation against the control.
    ///
    /// Candidates with a captured panic are `Verdict::Failed` and are not
    /// passed to the comparison.
    ///
    /// # Errors
    ///
    /// - `Error::MissingComparison` if no comparison is configured
    /// - `Error::MissingControl` if `observations` has no control entry
    pub fn evaluate(&self, observations: &Observations<V, E>) -> Result<Evaluation> {
        let compare = self
            .shared
            .config
            .comparison()
            .ok_or(Error::MissingComparison)?;
        let control = observations.control().ok_or(Error::MissingControl)?;

        let candidates = observations
            .candidates()
            .map(|candidate| match candidate.panic() {
                Some(failure) => CandidateOutcome::new(
                    candidate.name(),
                    Verdict::Failed,
                    candidate.duration(),
                    Some(failure.message().to_string()),
                ),
                None => {
                    let verdict = if compare(control, candidate) {
                        Verdict::Matched
                    } else {
                        Verdict::Mismatched
                    };
                    CandidateOutcome::new(candidate.name(), verdict, candidate.duration(), None)
                }
            })
            .collect();

        Ok(Evaluation::new(self.name(), control.duration(), candidates))
    }

    /// Evaluate `observations` and hand the evaluation to `publisher`.
    ///
    /// # Errors
    ///
    /// Same as `evaluate`; nothing is published on error.
    pub fn publish(
        &self,
        observations: &Observations<V, E>,
        publisher: &dyn Publisher,
    ) -> Result<Evaluation> {
        let evaluation = self.evaluate(observations)?;
        publisher.publish(&evaluation);
        Ok(evaluation)
    }
}

impl<V, E> Clone for Experiment<V, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<V, E> fmt::Debug for Experiment<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Experiment")
            .field("config", &self.shared.config)
            .field("state", &self.shared.state.snapshot())
            .finish()
    }
}
