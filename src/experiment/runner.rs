//! Runner - executes one experiment invocation
//!
//! ## Invocation modes (highest priority first)
//!
//! | Mode        | Behaviours run     | State touched     |
//! |-------------|--------------------|-------------------|
//! | Disabled    | control            | none              |
//! | Forced      | control+candidates | none              |
//! | Sampled in  | control+candidates | `runs`, `hits`    |
//! | Sampled out | control            | `runs`            |
//!
//! ## Failure isolation
//!
//! Every selected behaviour runs in its own tokio task. Candidates outside
//! test mode are wrapped in `catch_unwind`; a panic is recorded on their
//! observation. The control, and every behaviour in test mode, runs
//! unguarded: its panic is resumed on the caller once the other tasks have
//! reported, with the original payload.

use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::behaviour::{Behaviour, Behaviours, Role, CONTROL};
use super::observation::{CapturedFailure, Observation, Observations};
use super::Experiment;
use crate::Context;

/// Mode chosen for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Only the control runs; sampling is not consulted.
    Disabled,
    /// Every behaviour runs; sampling is not consulted.
    Forced,
    /// Sampling selected the candidates.
    SampledIn,
    /// Sampling skipped the candidates.
    SampledOut,
}

impl Mode {
    /// Whether candidates execute in this mode.
    #[must_use]
    pub const fn runs_candidates(self) -> bool {
        matches!(self, Self::Forced | Self::SampledIn)
    }
}

/// Guard applied around one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Guard {
    /// Capture panics into the observation.
    Isolate,
    /// Let panics reach the caller.
    Propagate,
}

impl Guard {
    const fn for_role(role: Role, test_mode: bool) -> Self {
        match role {
            Role::Candidate if !test_mode => Self::Isolate,
            _ => Self::Propagate,
        }
    }
}

/// Executes an experiment against a fixed set of behaviours.
///
/// Runners are not meant to be shared across concurrent calls: each call site
/// takes its own from `Experiment::runner`. The experiment's counters are
/// shared by all of them.
///
/// ## Example
///
/// ```rust
/// use trueno_experiment::{Behaviours, Experiment};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> trueno_experiment::Result<()> {
/// let experiment = Experiment::<u32, String>::builder("sum").build()?;
/// let behaviours = Behaviours::<u32, String>::new(|_ctx| async { Ok(6) })
///     .candidate("fold", |_ctx| async { Ok(6) })?;
///
/// let mut runner = experiment.runner(behaviours);
/// runner.force(true);
/// let observations = runner.run(None).await;
///
/// assert_eq!(observations.len(), 2);
/// assert_eq!(observations.control().and_then(|o| o.value()), Some(&6));
/// # Ok(())
/// # }
/// ```
pub struct Runner<V, E> {
    experiment: Experiment<V, E>,
    behaviours: Behaviours<V, E>,
    disabled: bool,
    forced: bool,
    has_run: bool,
}

impl<V, E> Runner<V, E> {
    pub(crate) fn new(experiment: Experiment<V, E>, behaviours: Behaviours<V, E>) -> Self {
        Self {
            experiment,
            behaviours,
            disabled: false,
            forced: false,
            has_run: false,
        }
    }

    /// Only run the control. Overrules `force`.
    pub fn disable(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    /// Run every behaviour regardless of sampling, without counting the run.
    pub fn force(&mut self, forced: bool) {
        self.forced = forced;
    }

    /// Whether candidates executed on the most recent `run`.
    #[must_use]
    pub const fn has_run(&self) -> bool {
        self.has_run
    }

    /// Whether `disable(true)` is in effect.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Whether `force(true)` is in effect.
    #[must_use]
    pub const fn is_forced(&self) -> bool {
        self.forced
    }

    /// Behaviours this runner is bound to.
    #[must_use]
    pub const fn behaviours(&self) -> &Behaviours<V, E> {
        &self.behaviours
    }

    /// Pick the mode for the next invocation, updating shared state when
    /// sampling is consulted.
    fn select_mode(&self) -> Mode {
        let config = self.experiment.config();
        if self.disabled || !config.enabled() {
            return Mode::Disabled;
        }
        if self.forced {
            return Mode::Forced;
        }

        let state = self.experiment.state();
        state.record_run();
        if state.should_run(config.percentage(), config.test_mode()) {
            state.record_hit();
            Mode::SampledIn
        } else {
            Mode::SampledOut
        }
    }
}

impl<V, E> Runner<V, E>
where
    V: Send + 'static,
    E: Send + 'static,
{
    /// Run the experiment once.
    ///
    /// `ctx` falls back to the experiment's configured context, then goes
    /// through every before-filter. Waits for every selected behaviour.
    ///
    /// # Panics
    ///
    /// Resumes the control's panic, or any behaviour's panic in test mode.
    /// Candidate panics outside test mode never escape.
    ///
    /// Also panics if the tokio runtime shuts down and cancels the control's
    /// task before it reports, since no control observation exists then. A
    /// cancelled candidate is only logged and left out of the set.
    pub async fn run(&mut self, ctx: Option<Context>) -> Observations<V, E> {
        let config = self.experiment.config();
        let ctx = config.apply_filters(ctx.unwrap_or_else(|| config.context().clone()));

        let mode = self.select_mode();
        self.has_run = mode.runs_candidates();

        let snapshot = self.experiment.state().snapshot();
        debug!(
            experiment = %self.experiment.name(),
            ?mode,
            hits = snapshot.hits,
            runs = snapshot.runs,
            percentage = config.percentage(),
            "experiment mode selected"
        );

        let selected: Vec<Behaviour<V, E>> = if mode.runs_candidates() {
            self.behaviours.iter().cloned().collect()
        } else {
            vec![self.behaviours.control().clone()]
        };

        dispatch(selected, ctx, config.test_mode()).await
    }
}

/// Fan out one task per behaviour and fan the observations back in.
async fn dispatch<V, E>(
    selected: Vec<Behaviour<V, E>>,
    ctx: Context,
    test_mode: bool,
) -> Observations<V, E>
where
    V: Send + 'static,
    E: Send + 'static,
{
    let expected = selected.len();
    let (tx, mut rx) = mpsc::channel(expected);

    let units: Vec<(String, JoinHandle<()>)> = selected
        .into_iter()
        .map(|behaviour| {
            let guard = Guard::for_role(behaviour.role(), test_mode);
            let name = behaviour.name().to_string();
            let handle = tokio::spawn(observe(behaviour, ctx.clone(), guard, tx.clone()));
            (name, handle)
        })
        .collect();
    drop(tx);

    let mut observations = Observations::with_capacity(expected);
    while let Some(observation) = rx.recv().await {
        observations.insert(observation);
    }

    if observations.len() < expected {
        // Some unit died without reporting: an unguarded panic.
        for (name, handle) in units {
            match handle.await {
                Ok(()) => {}
                Err(err) if err.is_panic() => {
                    debug!(behaviour = %name, "resuming unguarded panic");
                    std::panic::resume_unwind(err.into_panic());
                }
                Err(err) => warn!(behaviour = %name, error = %err, "behaviour task cancelled"),
            }
        }

        // Only runtime shutdown cancels a unit; a set without the control is never returned.
        assert!(
            observations.contains(CONTROL),
            "control behaviour cancelled before reporting: tokio runtime is shutting down"
        );
    }

    observations
}

/// Run one behaviour and report its observation.
async fn observe<V, E>(
    behaviour: Behaviour<V, E>,
    ctx: Context,
    guard: Guard,
    tx: mpsc::Sender<Observation<V, E>>,
) {
    let name = behaviour.name().to_string();
    let start = Instant::now();

    let observation = match guard {
        Guard::Propagate => {
            let result = behaviour.call(ctx).await;
            Observation::returned(name, result, start.elapsed())
        }
        Guard::Isolate => {
            let unit = AssertUnwindSafe(async move { behaviour.call(ctx).await });
            match unit.catch_unwind().await {
                Ok(result) => Observation::returned(name, result, start.elapsed()),
                Err(payload) => {
                    let failure = CapturedFailure::from_payload(payload);
                    warn!(
                        behaviour = %name,
                        failure = %failure.message(),
                        "candidate panicked; failure captured"
                    );
                    Observation::panicked(name, failure, start.elapsed())
                }
            }
        }
    };

    trace!(behaviour = %observation.name(), duration = ?observation.duration(), "observation recorded");
    if tx.send(observation).await.is_err() {
        trace!("runner dropped before observation was collected");
    }
}
