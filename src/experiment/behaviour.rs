//! Behaviour registry - the control and its candidates

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::{Context, Error, Result};

/// Reserved name of the control behaviour.
pub const CONTROL: &str = "control";

type BehaviourFn<V, E> = dyn Fn(Context) -> BoxFuture<'static, std::result::Result<V, E>> + Send + Sync;

/// Role of a behaviour within an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The trusted, always executed path. Its failures reach the caller.
    Control,
    /// An experimental path. Its panics are captured outside test mode.
    Candidate,
}

/// A named unit of work.
pub struct Behaviour<V, E> {
    name: String,
    role: Role,
    function: Arc<BehaviourFn<V, E>>,
}

impl<V, E> Behaviour<V, E> {
    fn new<F, Fut>(name: String, role: Role, function: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
    {
        Self {
            name,
            role,
            function: Arc::new(move |ctx| function(ctx).boxed()),
        }
    }

    /// Behaviour name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Behaviour role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Check if this is the control behaviour.
    #[must_use]
    pub fn is_control(&self) -> bool {
        self.role == Role::Control
    }

    /// Start the behaviour with `ctx`.
    pub(crate) fn call(&self, ctx: Context) -> BoxFuture<'static, std::result::Result<V, E>> {
        (self.function)(ctx)
    }
}

impl<V, E> Clone for Behaviour<V, E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            role: self.role,
            function: Arc::clone(&self.function),
        }
    }
}

impl<V, E> fmt::Debug for Behaviour<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Behaviour")
            .field("name", &self.name)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Fixed set of behaviours a `Runner` is bound to.
///
/// The control is supplied up front, so every registry has exactly one.
/// Candidates keep their registration order. Cloning is cheap: functions
/// are shared, which lets each call site build its own runner.
///
/// ## Example
///
/// ```rust
/// use trueno_experiment::Behaviours;
///
/// # fn main() -> trueno_experiment::Result<()> {
/// let behaviours = Behaviours::<u32, String>::new(|_ctx| async { Ok(1) })
///     .candidate("faster", |_ctx| async { Ok(1) })?
///     .candidate("smaller", |_ctx| async { Ok(2) })?;
///
/// assert_eq!(behaviours.len(), 3);
/// assert_eq!(behaviours.candidate_names(), vec!["faster", "smaller"]);
/// # Ok(())
/// # }
/// ```
pub struct Behaviours<V, E> {
    control: Behaviour<V, E>,
    candidates: Vec<Behaviour<V, E>>,
}

impl<V, E> Behaviours<V, E> {
    /// Create a registry around the control behaviour.
    #[must_use]
    pub fn new<F, Fut>(control: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
    {
        Self {
            control: Behaviour::new(CONTROL.to_string(), Role::Control, control),
            candidates: Vec::new(),
        }
    }

    /// Register a candidate behaviour.
    ///
    /// # Errors
    ///
    /// - `Error::ReservedName` if `name` is `"control"`
    /// - `Error::EmptyBehaviourName` if `name` is empty
    /// - `Error::DuplicateBehaviour` if a candidate with `name` exists
    pub fn candidate<F, Fut>(mut self, name: impl Into<String>, function: F) -> Result<Self>
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
    {
        let name = name.into();
        if name == CONTROL {
            return Err(Error::ReservedName);
        }
        if name.trim().is_empty() {
            return Err(Error::EmptyBehaviourName);
        }
        if self.candidates.iter().any(|c| c.name == name) {
            return Err(Error::DuplicateBehaviour(name));
        }

        self.candidates
            .push(Behaviour::new(name, Role::Candidate, function));
        Ok(self)
    }

    /// The control behaviour.
    #[must_use]
    pub const fn control(&self) -> &Behaviour<V, E> {
        &self.control
    }

    /// Candidates in registration order.
    #[must_use]
    pub fn candidates(&self) -> &[Behaviour<V, E>] {
        &self.candidates
    }

    /// Candidate names in registration order.
    #[must_use]
    pub fn candidate_names(&self) -> Vec<&str> {
        self.candidates.iter().map(Behaviour::name).collect()
    }

    /// Look up a behaviour by name (control included).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Behaviour<V, E>> {
        self.iter().find(|b| b.name == name)
    }

    /// Iterate control first, then candidates.
    pub fn iter(&self) -> impl Iterator<Item = &Behaviour<V, E>> {
        std::iter::once(&self.control).chain(self.candidates.iter())
    }

    /// Total number of behaviours, control included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len() + 1
    }

    /// Always false: a registry holds at least the control.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

impl<V, E> Clone for Behaviours<V, E> {
    fn clone(&self) -> Self {
        Self {
            control: self.control.clone(),
            candidates: self.candidates.clone(),
        }
    }
}

impl<V, E> fmt::Debug for Behaviours<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter().map(Behaviour::name)).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Behaviours<i32, String> {
        Behaviours::new(|_ctx| async { Ok(1) })
    }

    #[test]
    fn test_control_is_registered_under_reserved_name() {
        let behaviours = registry();
        assert_eq!(behaviours.control().name(), CONTROL);
        assert!(behaviours.control().is_control());
        assert_eq!(behaviours.len(), 1);
        assert!(!behaviours.is_empty());
    }

    #[test]
    fn test_candidate_reserved_name_rejected() {
        let err = registry()
            .candidate(CONTROL, |_ctx| async { Ok(2) })
            .unwrap_err();
        assert!(matches!(err, Error::ReservedName));
    }

    #[test]
    fn test_candidate_empty_name_rejected() {
        let err = registry()
            .candidate("  ", |_ctx| async { Ok(2) })
            .unwrap_err();
        assert!(matches!(err, Error::EmptyBehaviourName));
    }

    #[test]
    fn test_candidate_duplicate_rejected() {
        let err = registry()
            .candidate("a", |_ctx| async { Ok(2) })
            .unwrap()
            .candidate("a", |_ctx| async { Ok(3) })
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateBehaviour(name) if name == "a"));
    }

    #[test]
    fn test_iter_yields_control_first() {
        let behaviours = registry()
            .candidate("b", |_ctx| async { Ok(2) })
            .unwrap()
            .candidate("a", |_ctx| async { Ok(3) })
            .unwrap();

        let names: Vec<&str> = behaviours.iter().map(Behaviour::name).collect();
        assert_eq!(names, vec![CONTROL, "b", "a"]);
        assert_eq!(behaviours.get("a").map(Behaviour::role), Some(Role::Candidate));
        assert!(behaviours.get("missing").is_none());
    }

    #[tokio::test]
    async fn test_call_passes_context() {
        let behaviours: Behaviours<i32, String> = Behaviours::new(|ctx: Context| async move {
            ctx.value::<i32>("n").copied().ok_or_else(|| "missing".to_string())
        });

        let ctx = Context::new().with_value("n", 9_i32);
        assert_eq!(behaviours.control().call(ctx).await, Ok(9));
        assert_eq!(
            behaviours.control().call(Context::new()).await,
            Err("missing".to_string())
        );
    }
}
