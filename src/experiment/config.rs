//! Experiment configuration and its builder
//!
//! Configuration is resolved once by `ExperimentBuilder::build` and is
//! read-only afterwards. Each builder method is a pure transformation of the
//! previous value, applied on top of the defaults below.
//!
//! | Setting      | Default             |
//! |--------------|---------------------|
//! | `enabled`    | `true`              |
//! | `percentage` | `10`                |
//! | `test_mode`  | `false`             |
//! | `compare`    | none                |
//! | `before`     | none                |
//! | `context`    | `Context::default()`|

use std::fmt;
use std::sync::Arc;

use super::{Experiment, Observation};
use crate::{Context, Error, Result};

/// Default sampling percentage.
pub const DEFAULT_PERCENTAGE: u8 = 10;

/// Comparison of the control's observation against a candidate's.
pub type Comparison<V, E> = Arc<dyn Fn(&Observation<V, E>, &Observation<V, E>) -> bool + Send + Sync>;

/// Pre-execution transformation of the execution context.
pub type BeforeFilter = Arc<dyn Fn(Context) -> Context + Send + Sync>;

/// Resolved, immutable experiment settings.
pub struct Config<V, E> {
    pub(crate) name: String,
    pub(crate) enabled: bool,
    pub(crate) test_mode: bool,
    pub(crate) percentage: u8,
    pub(crate) comparison: Option<Comparison<V, E>>,
    pub(crate) before_filters: Vec<BeforeFilter>,
    pub(crate) context: Context,
}

impl<V, E> Config<V, E> {
    /// Experiment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether candidates may run at all.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether sampling and failure isolation are bypassed.
    #[must_use]
    pub const fn test_mode(&self) -> bool {
        self.test_mode
    }

    /// Sampling ceiling, 0 to 100.
    #[must_use]
    pub const fn percentage(&self) -> u8 {
        self.percentage
    }

    /// Configured comparison, if any.
    #[must_use]
    pub fn comparison(&self) -> Option<&Comparison<V, E>> {
        self.comparison.as_ref()
    }

    /// Number of before-filters.
    #[must_use]
    pub fn before_filter_count(&self) -> usize {
        self.before_filters.len()
    }

    /// Default execution context.
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.context
    }

    /// Run `ctx` through every before-filter in registration order.
    pub(crate) fn apply_filters(&self, ctx: Context) -> Context {
        self.before_filters.iter().fold(ctx, |ctx, filter| filter(ctx))
    }
}

impl<V, E> fmt::Debug for Config<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .field("test_mode", &self.test_mode)
            .field("percentage", &self.percentage)
            .field("comparison", &self.comparison.is_some())
            .field("before_filters", &self.before_filters.len())
            .field("context", &self.context)
            .finish()
    }
}

/// Builder for `Experiment`.
///
/// ## Example
///
/// ```rust
/// use trueno_experiment::{Context, Experiment};
///
/// # fn main() -> trueno_experiment::Result<()> {
/// let experiment = Experiment::<i32, String>::builder("checkout-totals")
///     .percentage(25)
///     .compare(|control, candidate| control.value() == candidate.value())
///     .before(|ctx: Context| ctx.with_value("source", "experiment"))
///     .build()?;
///
/// assert_eq!(experiment.config().percentage(), 25);
/// # Ok(())
/// # }
/// ```
pub struct ExperimentBuilder<V, E> {
    config: Config<V, E>,
}

impl<V, E> ExperimentBuilder<V, E> {
    /// Start from the defaults with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: Config {
                name: name.into(),
                enabled: true,
                test_mode: false,
                percentage: DEFAULT_PERCENTAGE,
                comparison: None,
                before_filters: Vec::new(),
                context: Context::default(),
            },
        }
    }

    /// Set the sampling ceiling (0 to 100).
    #[must_use]
    pub fn percentage(mut self, percentage: u8) -> Self {
        self.config.percentage = percentage;
        self
    }

    /// Enable or disable candidates for every runner of this experiment.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// Always sample in and let every panic reach the caller.
    #[must_use]
    pub fn test_mode(mut self, test_mode: bool) -> Self {
        self.config.test_mode = test_mode;
        self
    }

    /// Set the comparison used by `Experiment::evaluate`.
    #[must_use]
    pub fn compare<F>(mut self, comparison: F) -> Self
    where
        F: Fn(&Observation<V, E>, &Observation<V, E>) -> bool + Send + Sync + 'static,
    {
        self.config.comparison = Some(Arc::new(comparison));
        self
    }

    /// Append a before-filter. Filters run in the order they were added.
    #[must_use]
    pub fn before<F>(mut self, filter: F) -> Self
    where
        F: Fn(Context) -> Context + Send + Sync + 'static,
    {
        self.config.before_filters.push(Arc::new(filter));
        self
    }

    /// Set the context used when `Runner::run` receives none.
    #[must_use]
    pub fn context(mut self, context: Context) -> Self {
        self.config.context = context;
        self
    }

    /// Build the experiment.
    ///
    /// # Errors
    ///
    /// - `Error::NoName` if the name is empty
    /// - `Error::InvalidPercentage` if the percentage exceeds 100
    pub fn build(self) -> Result<Experiment<V, E>> {
        if self.config.name.trim().is_empty() {
            return Err(Error::NoName);
        }
        if self.config.percentage > 100 {
            return Err(Error::InvalidPercentage(self.config.percentage));
        }

        Ok(Experiment::from_config(self.config))
    }
}
