//! Observations - the recorded outcome of each behaviour execution

use std::any::Any;
use std::fmt;
use std::time::Duration;

use rustc_hash::FxHashMap;

use super::behaviour::CONTROL;

/// A panic intercepted from a candidate behaviour.
///
/// The original payload is kept as-is and can be downcast back to whatever
/// the candidate panicked with. `&str` and `String` payloads also yield a
/// readable message; anything else is described by a generic marker.
pub struct CapturedFailure {
    message: String,
    payload: Box<dyn Any + Send>,
}

impl CapturedFailure {
    /// Build from a panic payload as returned by `catch_unwind`.
    #[must_use]
    pub fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self { message, payload }
    }

    /// The panic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The original panic payload.
    #[must_use]
    pub fn payload(&self) -> &(dyn Any + Send) {
        self.payload.as_ref()
    }

    /// Downcast the payload to the type the candidate panicked with.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// Consume the failure, returning the payload (e.g. for `resume_unwind`).
    #[must_use]
    pub fn into_payload(self) -> Box<dyn Any + Send> {
        self.payload
    }
}

impl fmt::Debug for CapturedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedFailure")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for CapturedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panicked: {}", self.message)
    }
}

/// Outcome of running one behaviour.
///
/// A behaviour that returned normally has either `value` or `error` set. A
/// candidate that panicked outside test mode has neither, and `panic` holds
/// the captured failure instead.
#[derive(Debug)]
pub struct Observation<V, E> {
    name: String,
    value: Option<V>,
    error: Option<E>,
    panic: Option<CapturedFailure>,
    duration: Duration,
}

impl<V, E> Observation<V, E> {
    pub(crate) fn returned(
        name: impl Into<String>,
        result: Result<V, E>,
        duration: Duration,
    ) -> Self {
        let (value, error) = match result {
            Ok(v) => (Some(v), None),
            Err(e) => (None, Some(e)),
        };
        Self {
            name: name.into(),
            value,
            error,
            panic: None,
            duration,
        }
    }

    pub(crate) fn panicked(
        name: impl Into<String>,
        failure: CapturedFailure,
        duration: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            value: None,
            error: None,
            panic: Some(failure),
            duration,
        }
    }

    /// Behaviour name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value returned by the behaviour, if it returned `Ok`.
    #[must_use]
    pub const fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    /// Error returned by the behaviour, if it returned `Err`.
    #[must_use]
    pub const fn error(&self) -> Option<&E> {
        self.error.as_ref()
    }

    /// Captured panic, if the behaviour was an isolated candidate that panicked.
    #[must_use]
    pub const fn panic(&self) -> Option<&CapturedFailure> {
        self.panic.as_ref()
    }

    /// Check whether a panic was captured.
    #[must_use]
    pub const fn panicked_out(&self) -> bool {
        self.panic.is_some()
    }

    /// Wall-clock time spent inside the behaviour.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Check if this is the control's observation.
    #[must_use]
    pub fn is_control(&self) -> bool {
        self.name == CONTROL
    }

    /// Consume the observation, returning the behaviour's result.
    ///
    /// `None` when a panic was captured.
    #[must_use]
    pub fn into_result(self) -> Option<Result<V, E>> {
        match (self.value, self.error) {
            (Some(v), _) => Some(Ok(v)),
            (None, Some(e)) => Some(Err(e)),
            (None, None) => None,
        }
    }
}

/// Observations keyed by behaviour name.
///
/// Produced by `Runner::run`. The control's entry is present in every set the
/// runner returns.
#[derive(Debug)]
pub struct Observations<V, E> {
    entries: FxHashMap<String, Observation<V, E>>,
}

impl<V, E> Observations<V, E> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    pub(crate) fn insert(&mut self, observation: Observation<V, E>) {
        self.entries.insert(observation.name.clone(), observation);
    }

    /// The control's observation.
    ///
    /// `None` only for sets that were not produced by a runner.
    #[must_use]
    pub fn control(&self) -> Option<&Observation<V, E>> {
        self.entries.get(CONTROL)
    }

    /// Look up an observation by behaviour name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Observation<V, E>> {
        self.entries.get(name)
    }

    /// Check if a behaviour ran.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Iterate over candidate observations in unspecified order.
    pub fn candidates(&self) -> impl Iterator<Item = &Observation<V, E>> {
        self.entries.values().filter(|o| !o.is_control())
    }

    /// Behaviour names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Iterate over all observations in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Observation<V, E>> {
        self.entries.values()
    }

    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no behaviour ran.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the set, returning the control's result.
    ///
    /// This is what callers hand back to their own callers once the
    /// experiment has been evaluated.
    #[must_use]
    pub fn into_control_result(mut self) -> Option<Result<V, E>> {
        self.entries.remove(CONTROL).and_then(Observation::into_result)
    }
}
