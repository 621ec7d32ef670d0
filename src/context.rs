//! Execution context handed to every behaviour
//!
//! A `Context` is an immutable, cheaply cloned bag of typed values plus an
//! optional deadline. Before-filters derive new contexts from old ones; the
//! runner passes the final context unchanged to every selected behaviour.
//!
//! The runner never enforces the deadline. Behaviours that want to stop early
//! check `is_expired()` or `remaining()` themselves.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

type Value = Arc<dyn Any + Send + Sync>;

/// Execution context for one experiment invocation.
///
/// ## Example
///
/// ```rust
/// use trueno_experiment::Context;
///
/// let ctx = Context::new().with_value("user_id", 42_u64);
/// assert_eq!(ctx.value::<u64>("user_id"), Some(&42));
/// assert_eq!(ctx.value::<String>("user_id"), None);
/// ```
#[derive(Clone, Default)]
pub struct Context {
    values: Arc<FxHashMap<String, Value>>,
    deadline: Option<Instant>,
}

impl Context {
    /// Create an empty context with no values and no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a context carrying `value` under `key`.
    ///
    /// An existing value under the same key is shadowed in the derived
    /// context; the original context is left untouched.
    #[must_use]
    pub fn with_value<T>(&self, key: impl Into<String>, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        let mut values = (*self.values).clone();
        values.insert(key.into(), Arc::new(value));
        Self {
            values: Arc::new(values),
            deadline: self.deadline,
        }
    }

    /// Look up a value by key, returning `None` when absent or of another type.
    #[must_use]
    pub fn value<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Check whether a value is stored under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the context carries no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Derive a context with an absolute deadline.
    ///
    /// A parent deadline that is earlier wins.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        };
        Self {
            values: Arc::clone(&self.values),
            deadline: Some(deadline),
        }
    }

    /// Derive a context whose deadline is `timeout` from now.
    ///
    /// A timeout too large to represent leaves the deadline unchanged.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.clone(),
        }
    }

    /// The deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline. `None` without a deadline.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Check whether the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.values.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("Context")
            .field("keys", &keys)
            .field("deadline", &self.deadline)
            .finish()
    }
}
